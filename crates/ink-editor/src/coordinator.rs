//! Mutation coordinator: scene signals → ledger + history, and history
//! entries → scene replays.
//!
//! The canvas calls [`MutationCoordinator::process`] right after every
//! scene mutation. Undo and redo replay an entry with history capture
//! suppressed, so the signals the replay raises are dropped.

use crate::history::{Change, ChangeKind, History, HistoryEntry};
use crate::ledger;
use ink_core::id::ObjectId;
use ink_core::model::EraserMask;
use ink_core::scene::{SceneEvent, SceneGraph};
use ink_core::snapshot::ObjectSnapshot;
use ink_core::transform::bake_into;
use kurbo::Affine;

#[derive(Debug, Default)]
pub struct MutationCoordinator {
    /// The erasable background image, versioned outside the ledger.
    background: Option<ObjectId>,
    /// Eraser mask of the background as of its last recorded stroke.
    last_eraser: Option<EraserMask>,
}

impl MutationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn background(&self) -> Option<ObjectId> {
        self.background
    }

    /// Track `id` as the background image with its current mask as the
    /// baseline.
    pub fn set_background(&mut self, id: Option<ObjectId>, eraser: Option<EraserMask>) {
        self.background = id;
        self.last_eraser = eraser;
    }

    /// Drain pending scene signals into the ledger and history.
    pub fn process(&mut self, scene: &mut SceneGraph, history: &mut History) {
        let events = scene.drain_events();
        if history.is_ignoring() {
            if !events.is_empty() {
                log::trace!("coordinator: dropped {} replay signals", events.len());
            }
            return;
        }
        for event in events {
            match event {
                SceneEvent::Added(id) => self.object_added(scene, history, id),
                SceneEvent::Modified { id, transform } => {
                    self.object_modified(scene, history, id, transform)
                }
                SceneEvent::Removed(id) => self.object_removed(scene, id),
                SceneEvent::ErasingEnd { targets } => self.erasing_end(scene, history, &targets),
            }
        }
    }

    fn object_added(&mut self, scene: &mut SceneGraph, history: &mut History, id: ObjectId) {
        if Some(id) == self.background {
            return;
        }
        let Some(obj) = scene.get_mut(id) else {
            log::debug!("coordinator: added {id} is not resident");
            return;
        };
        let snapshot = ledger::on_committed(obj);
        history.keep(Change::new(
            id,
            ChangeKind::Added,
            snapshot.clone(),
            snapshot,
        ));
    }

    fn object_modified(
        &mut self,
        scene: &mut SceneGraph,
        history: &mut History,
        id: ObjectId,
        transform: Option<Affine>,
    ) {
        let Some(obj) = scene.get(id) else {
            log::debug!("coordinator: modified {id} is not resident");
            return;
        };
        let members = scene.members(id);
        if obj.version == 0 && !members.is_empty() {
            // Uncommitted container: record each member in canvas space.
            let matrix = scene.world_matrix(id);
            history.atomic_start();
            for member in members {
                self.object_modified(scene, history, member, Some(matrix));
            }
            history.atomic_end();
            return;
        }
        if let Some(obj) = scene.get_mut(id) {
            let change = ledger::on_modified(obj, transform);
            history.keep(change);
        }
    }

    fn object_removed(&mut self, scene: &mut SceneGraph, id: ObjectId) {
        if let Some(obj) = scene.get_mut(id) {
            ledger::on_removed(obj);
        }
    }

    fn erasing_end(&mut self, scene: &mut SceneGraph, history: &mut History, targets: &[ObjectId]) {
        if targets.is_empty() {
            return;
        }
        history.atomic_start();
        for &target in targets {
            if Some(target) == self.background {
                let Some(obj) = scene.get(target) else {
                    continue;
                };
                let mut before = obj.state.clone();
                before.eraser = self.last_eraser.clone();
                history.keep(Change::new(
                    target,
                    ChangeKind::Erased,
                    ObjectSnapshot::of(before),
                    obj.snapshot(),
                ));
                self.last_eraser = obj.state.eraser.clone();
            } else {
                self.object_modified(scene, history, target, None);
            }
        }
        history.atomic_end();
    }

    // ─── Replay ──────────────────────────────────────────────────────────

    /// Revert the newest history entry. Returns `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self, scene: &mut SceneGraph, history: &mut History) -> bool {
        let Some(entry) = history.undo() else {
            return false;
        };
        let _guard = history.suppress();
        for change in entry.changes() {
            self.undo_change(scene, change);
        }
        self.process(scene, history);
        true
    }

    /// Reapply the newest undone entry. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self, scene: &mut SceneGraph, history: &mut History) -> bool {
        let Some(entry) = history.redo() else {
            return false;
        };
        {
            let _guard = history.suppress();
            for change in entry.changes() {
                self.redo_change(scene, change);
            }
            self.process(scene, history);
        }
        history.recommit(entry);
        true
    }

    fn undo_change(&mut self, scene: &mut SceneGraph, change: &Change) {
        let id = change.object;
        let Some(obj) = scene.get(id) else {
            log::debug!("undo: {id} no longer exists, skipped");
            return;
        };

        if Some(id) == self.background {
            let eraser = change.previous.state.eraser.clone();
            if let Some(obj) = scene.get_mut(id) {
                obj.state.eraser = eraser.clone();
            }
            self.last_eraser = eraser;
        } else if obj.removed {
            // Reinsert; a former group member comes back standalone.
            if let Some(group) = obj.group {
                let matrix = if scene.contains(group) {
                    scene.world_matrix(group)
                } else {
                    Affine::IDENTITY
                };
                scene.detach_from_parent(id);
                if let Some(obj) = scene.get_mut(id) {
                    obj.state.placement = bake_into(&obj.state.placement, matrix);
                    obj.group = None;
                }
            }
            scene.attach(id);
            if let Some(obj) = scene.get_mut(id) {
                obj.version = obj.version.saturating_sub(1);
                obj.removed = false;
            }
        } else if obj.version <= 1 {
            scene.remove(id);
            if let Some(obj) = scene.get_mut(id) {
                obj.version = 0;
            }
        } else if let Some(obj) = scene.get_mut(id) {
            obj.version -= 1;
            obj.state = change.previous.state.clone();
            obj.original_state = Some(change.previous.clone());
        }
    }

    fn redo_change(&mut self, scene: &mut SceneGraph, change: &Change) {
        let id = change.object;
        let Some(obj) = scene.get(id) else {
            log::debug!("redo: {id} no longer exists, skipped");
            return;
        };

        if Some(id) == self.background {
            let eraser = change.current.state.eraser.clone();
            if let Some(obj) = scene.get_mut(id) {
                obj.state.eraser = eraser.clone();
            }
            self.last_eraser = eraser;
        } else if change.kind == ChangeKind::Removed {
            if let Some(obj) = scene.get_mut(id) {
                obj.removed = true;
                obj.version += 1;
            }
            scene.remove(id);
        } else if obj.version == 0 {
            if let Some(obj) = scene.get_mut(id) {
                obj.version = 1;
                obj.state = change.current.state.clone();
                obj.original_state = Some(change.current.clone());
            }
            scene.attach(id);
        } else if let Some(obj) = scene.get_mut(id) {
            obj.version += 1;
            obj.state = change.current.state.clone();
            obj.original_state = Some(change.current.clone());
        }
    }
}

/// Keep a soft removal for each object, then detach it.
/// Wrapped in one atomic group by the caller.
pub(crate) fn soft_remove(
    coordinator: &mut MutationCoordinator,
    scene: &mut SceneGraph,
    history: &mut History,
    id: ObjectId,
) {
    let Some(obj) = scene.get_mut(id) else {
        return;
    };
    obj.removed = true;
    let snapshot = obj.snapshot();
    obj.original_state = Some(snapshot.clone());
    history.keep(HistoryEntry::Simple(Change::new(
        id,
        ChangeKind::Removed,
        snapshot.clone(),
        snapshot,
    )));
    scene.remove(id);
    coordinator.process(scene, history);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ink_core::model::{EraserStroke, ObjectState, Placement, SceneObject, ShapeKind, ShapeStyle};
    use pretty_assertions::assert_eq;

    fn rect(name: &str, left: f64) -> SceneObject {
        SceneObject::new(
            ObjectId::intern(name),
            ObjectState::new(
                ShapeKind::Rect {
                    width: 20.0,
                    height: 20.0,
                },
                Placement::at(left, 0.0),
                ShapeStyle::default(),
            ),
        )
    }

    fn setup() -> (MutationCoordinator, SceneGraph, History) {
        (MutationCoordinator::new(), SceneGraph::new(), History::new(25))
    }

    #[test]
    fn added_signal_commits_and_keeps() {
        let (mut coord, mut scene, mut history) = setup();
        let id = scene.add(rect("coord_add", 0.0));
        coord.process(&mut scene, &mut history);
        assert_eq!(scene.get(id).unwrap().version, 1);
        let entry = history.current().unwrap();
        assert_eq!(entry.changes()[0].kind, ChangeKind::Added);
        assert_eq!(entry.changes()[0].previous, entry.changes()[0].current);
    }

    #[test]
    fn rectangle_create_move_undo_redo() {
        let (mut coord, mut scene, mut history) = setup();
        let id = scene.add(rect("coord_scenario", 10.0));
        coord.process(&mut scene, &mut history);

        scene.translate(id, 50.0, 0.0);
        scene.modified(id, None);
        coord.process(&mut scene, &mut history);
        assert_eq!(scene.get(id).unwrap().version, 2);

        assert!(coord.undo(&mut scene, &mut history));
        let obj = scene.get(id).unwrap();
        assert_eq!(obj.version, 1);
        assert_eq!(obj.state.placement.left, 10.0);

        assert!(coord.undo(&mut scene, &mut history));
        assert!(!scene.is_attached(id));
        assert_eq!(scene.get(id).unwrap().version, 0);
        assert!(!coord.undo(&mut scene, &mut history));

        assert!(coord.redo(&mut scene, &mut history));
        assert!(coord.redo(&mut scene, &mut history));
        let obj = scene.get(id).unwrap();
        assert!(scene.is_attached(id));
        assert_eq!(obj.version, 2);
        assert_eq!(obj.state.placement.left, 60.0);
        assert!(!coord.redo(&mut scene, &mut history));
        assert_eq!(history.undo_len(), 2);
    }

    #[test]
    fn selection_modification_fans_out_atomically() {
        let (mut coord, mut scene, mut history) = setup();
        let a = scene.add(rect("coord_fan_a", 0.0));
        let b = scene.add(rect("coord_fan_b", 100.0));
        coord.process(&mut scene, &mut history);

        let container = scene.set_active(&[a, b]).unwrap();
        scene.translate(container, 0.0, 30.0);
        scene.modified(container, None);
        coord.process(&mut scene, &mut history);

        let entry = history.current().unwrap().clone();
        assert_eq!(entry.changes().len(), 2);
        assert_eq!(entry.changes()[1].current.state.placement.left, 100.0);
        assert_eq!(entry.changes()[1].current.state.placement.top, 30.0);
        assert_eq!(scene.get(a).unwrap().version, 2);

        scene.discard_active();
        coord.undo(&mut scene, &mut history);
        assert_eq!(scene.get(a).unwrap().state.placement.top, 0.0);
        assert_eq!(scene.get(b).unwrap().state.placement.top, 0.0);
    }

    #[test]
    fn soft_removal_undoes_back_into_scene() {
        let (mut coord, mut scene, mut history) = setup();
        let id = scene.add(rect("coord_soft", 0.0));
        coord.process(&mut scene, &mut history);

        history.atomic_start();
        soft_remove(&mut coord, &mut scene, &mut history, id);
        history.atomic_end();
        assert_eq!(scene.get(id).unwrap().version, 2);
        assert!(!scene.is_attached(id));

        coord.undo(&mut scene, &mut history);
        let obj = scene.get(id).unwrap();
        assert!(scene.is_attached(id));
        assert!(!obj.removed);
        assert_eq!(obj.version, 1);

        coord.redo(&mut scene, &mut history);
        assert!(!scene.is_attached(id));
        assert!(scene.get(id).unwrap().removed);
    }

    #[test]
    fn background_erasure_restores_previous_mask() {
        let (mut coord, mut scene, mut history) = setup();
        let bg = {
            let _guard = history.suppress();
            let id = scene.add(rect("coord_bg", 0.0));
            coord.process(&mut scene, &mut history);
            id
        };
        coord.set_background(Some(bg), None);

        let stroke = EraserStroke {
            points: vec![(1.0, 1.0)],
            width: 4.0,
        };
        scene.get_mut(bg).unwrap().state.eraser = Some(EraserMask {
            strokes: smallvec::smallvec![stroke],
        });
        scene.erasing_end(vec![bg]);
        coord.process(&mut scene, &mut history);
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.current().unwrap().changes()[0].kind, ChangeKind::Erased);

        coord.undo(&mut scene, &mut history);
        assert!(scene.get(bg).unwrap().state.eraser.is_none());
        coord.redo(&mut scene, &mut history);
        assert!(scene.get(bg).unwrap().state.eraser.is_some());
    }

    #[test]
    fn replay_skips_missing_objects() {
        let (mut coord, mut scene, mut history) = setup();
        scene.add(rect("coord_gone", 0.0));
        coord.process(&mut scene, &mut history);
        scene.clear();
        assert!(coord.undo(&mut scene, &mut history));
        assert!(history.can_redo());
    }
}
