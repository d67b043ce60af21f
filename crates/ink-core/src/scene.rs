//! The scene graph: the store of drawable objects and their stacking order.
//!
//! Objects live as nodes of a `StableDiGraph`; edges run from a group to
//! each of its members. Top-level objects are listed in `stack` (bottom
//! first). An object that is detached from both the stack and its group
//! stays resident in the graph, so history can put it back later, until the
//! owner purges it.
//!
//! Every structural change is reported as a `SceneEvent` on an internal
//! queue. The owner drains the queue right after each mutation, which keeps
//! signal handling synchronous without callbacks into the owner.
//!
//! The active selection of several objects is a transient group container
//! (version 0, never in the stack). While selected, members carry
//! container-relative placements and a `group` reference to the container.

use crate::id::ObjectId;
use crate::model::{ObjectState, Placement, SceneObject, ShapeKind, ShapeStyle};
use crate::transform::{bake_into, placement_matrix};
use kurbo::{Affine, Rect};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use std::collections::HashMap;

/// Signals raised by scene mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    Added(ObjectId),
    /// An interaction finished changing the object in place. `transform` is
    /// the originating group matrix when the object was changed as part of a
    /// group.
    Modified {
        id: ObjectId,
        transform: Option<Affine>,
    },
    Removed(ObjectId),
    /// An eraser stroke finished; `targets` were masked by it.
    ErasingEnd {
        targets: Vec<ObjectId>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    /// All resident objects, attached or not.
    pub graph: StableDiGraph<SceneObject, ()>,
    id_index: HashMap<ObjectId, NodeIndex>,
    /// Top-level rendering order, bottom first.
    stack: Vec<ObjectId>,
    /// The active object: a single object or the selection container.
    active: Option<ObjectId>,
    /// Transient container for a multi-object selection.
    selection: Option<ObjectId>,
    events: Vec<SceneEvent>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Storage ─────────────────────────────────────────────────────────

    /// Make an object resident without attaching it. Replaces a resident
    /// object with the same ID.
    fn store(&mut self, object: SceneObject) -> NodeIndex {
        match self.id_index.get(&object.id) {
            Some(&idx) => {
                self.graph[idx] = object;
                idx
            }
            None => {
                let id = object.id;
                let idx = self.graph.add_node(object);
                self.id_index.insert(id, idx);
                idx
            }
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    /// Whether the object is resident (attached or not).
    pub fn contains(&self, id: ObjectId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Whether the object is part of the rendered scene.
    pub fn is_attached(&self, id: ObjectId) -> bool {
        if self.stack.contains(&id) {
            return true;
        }
        match self.parent(id) {
            Some(parent) if Some(parent) != self.selection => self.is_attached(parent),
            _ => false,
        }
    }

    /// Drop everything, including detached objects.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.id_index.clear();
        self.stack.clear();
        self.active = None;
        self.selection = None;
        self.events.clear();
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Add an object at the top of the stack and signal `Added`.
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id;
        self.store(object);
        self.stack.retain(|s| *s != id);
        self.stack.push(id);
        self.events.push(SceneEvent::Added(id));
        id
    }

    /// Make `member` resident and owned by `group`, in group-relative
    /// coordinates. The group must already be resident.
    pub fn adopt(&mut self, group: ObjectId, mut member: SceneObject) -> bool {
        let Some(&group_idx) = self.id_index.get(&group) else {
            return false;
        };
        member.group = Some(group);
        let idx = self.store(member);
        if self.graph.find_edge(group_idx, idx).is_none() {
            self.graph.add_edge(group_idx, idx, ());
        }
        true
    }

    /// Put a resident, detached object back on top of the stack and signal
    /// `Added`.
    pub fn attach(&mut self, id: ObjectId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.stack.retain(|s| *s != id);
        self.stack.push(id);
        self.events.push(SceneEvent::Added(id));
        true
    }

    /// Detach an object from the stack or from its owning group and signal
    /// `Removed`. The object stays resident; its `group` back-reference is
    /// kept unless it was only a member of the transient selection.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        if self.selection.is_some() && self.parent(id) == self.selection {
            self.release_member(id);
        }
        if self.active == Some(id) {
            self.active = None;
        }

        let removed = if let Some(pos) = self.stack.iter().position(|s| *s == id) {
            self.stack.remove(pos);
            true
        } else {
            self.detach_from_parent(id)
        };
        if removed {
            self.events.push(SceneEvent::Removed(id));
        }
        removed
    }

    /// Delete a detached object and its members from the graph for good.
    /// Attached objects are refused. Returns the purged IDs. No signal.
    pub fn purge(&mut self, id: ObjectId) -> Vec<ObjectId> {
        if !self.contains(id) || self.is_attached(id) || self.selection == Some(id) {
            return Vec::new();
        }
        let mut purged = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            pending.extend(self.members(next));
            if let Some(idx) = self.id_index.remove(&next) {
                self.graph.remove_node(idx);
                purged.push(next);
            }
        }
        purged
    }

    /// Remove the edge from the object's parent, if any. No signal.
    pub fn detach_from_parent(&mut self, id: ObjectId) -> bool {
        let Some(&idx) = self.id_index.get(&id) else {
            return false;
        };
        let parent_edge = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
            .and_then(|p| self.graph.find_edge(p, idx));
        match parent_edge {
            Some(edge) => {
                self.graph.remove_edge(edge);
                true
            }
            None => false,
        }
    }

    /// Signal that an interaction finished modifying `id`.
    pub fn modified(&mut self, id: ObjectId, transform: Option<Affine>) {
        self.events.push(SceneEvent::Modified { id, transform });
    }

    /// Signal the end of an eraser stroke.
    pub fn erasing_end(&mut self, targets: Vec<ObjectId>) {
        self.events.push(SceneEvent::ErasingEnd { targets });
    }

    /// Take all pending signals, oldest first.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// Move a top-level object to the bottom of the stack. No signal.
    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        let Some(pos) = self.stack.iter().position(|s| *s == id) else {
            return false;
        };
        self.stack.remove(pos);
        self.stack.insert(0, id);
        true
    }

    /// Move an object within its parent frame. Not a signal: callers raise
    /// `modified` once the gesture ends.
    pub fn translate(&mut self, id: ObjectId, dx: f64, dy: f64) {
        if let Some(obj) = self.get_mut(id) {
            obj.state.placement.left += dx;
            obj.state.placement.top += dy;
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Top-level objects, bottom first.
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> + '_ {
        self.stack.iter().filter_map(|id| self.get(*id))
    }

    pub fn object_ids(&self) -> &[ObjectId] {
        &self.stack
    }

    /// Number of top-level objects.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Number of objects held in the graph, attached or not.
    pub fn resident_len(&self) -> usize {
        self.graph.node_count()
    }

    /// Members of a group in insertion order.
    pub fn members(&self, id: ObjectId) -> Vec<ObjectId> {
        let Some(&idx) = self.id_index.get(&id) else {
            return Vec::new();
        };
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        children.sort();
        children.into_iter().map(|c| self.graph[c].id).collect()
    }

    /// The group currently owning `id`.
    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        let idx = *self.id_index.get(&id)?;
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
            .map(|p| self.graph[p].id)
    }

    /// Matrix mapping the object's local frame to the canvas.
    pub fn world_matrix(&self, id: ObjectId) -> Affine {
        let Some(obj) = self.get(id) else {
            return Affine::IDENTITY;
        };
        let local = placement_matrix(&obj.state.placement);
        match self.parent(id) {
            Some(parent) => self.world_matrix(parent) * local,
            None => local,
        }
    }

    /// Axis-aligned canvas-space bounds.
    pub fn world_bounds(&self, id: ObjectId) -> Option<Rect> {
        let obj = self.get(id)?;
        if obj.is_group() {
            return self
                .members(id)
                .into_iter()
                .filter_map(|m| self.world_bounds(m))
                .reduce(|a, b| a.union(b));
        }
        Some(
            self.world_matrix(id)
                .transform_rect_bbox(obj.state.shape.local_bounds()),
        )
    }

    /// The object's state with its placement expressed on the canvas when
    /// it is only held by the transient selection.
    pub fn standalone_state(&self, id: ObjectId) -> Option<ObjectState> {
        let obj = self.get(id)?;
        let mut state = obj.state.clone();
        if let Some(selection) = self.selection
            && self.parent(id) == Some(selection)
        {
            state.placement = bake_into(&state.placement, self.world_matrix(selection));
        }
        Some(state)
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    /// Whether `id` is the transient multi-selection container.
    pub fn is_selection(&self, id: ObjectId) -> bool {
        self.selection == Some(id)
    }

    /// The objects currently selected.
    pub fn selected(&self) -> Vec<ObjectId> {
        match (self.selection, self.active) {
            (Some(selection), _) => self.members(selection),
            (None, Some(active)) => vec![active],
            (None, None) => Vec::new(),
        }
    }

    /// Replace the selection. Only attached top-level objects are selectable.
    /// Returns the new active object.
    pub fn set_active(&mut self, ids: &[ObjectId]) -> Option<ObjectId> {
        self.discard_active();
        let mut picked: Vec<ObjectId> = Vec::new();
        for id in ids {
            if self.stack.contains(id) && !picked.contains(id) {
                picked.push(*id);
            }
        }

        match picked.as_slice() {
            [] => None,
            [single] => {
                self.active = Some(*single);
                self.active
            }
            many => {
                let bounds = many
                    .iter()
                    .filter_map(|id| self.world_bounds(*id))
                    .reduce(|a, b| a.union(b))
                    .unwrap_or(Rect::ZERO);
                let container = SceneObject::with_state(ObjectState::new(
                    ShapeKind::Group,
                    Placement::at(bounds.x0, bounds.y0),
                    ShapeStyle::default(),
                ));
                let container_id = container.id;
                self.store(container);
                // Keep members in stacking order.
                let mut ordered: Vec<ObjectId> = self
                    .stack
                    .iter()
                    .copied()
                    .filter(|id| picked.contains(id))
                    .collect();
                for id in ordered.drain(..) {
                    if let Some(mut member) = self.get(id).cloned() {
                        member.state.placement.left -= bounds.x0;
                        member.state.placement.top -= bounds.y0;
                        self.adopt(container_id, member);
                    }
                }
                self.selection = Some(container_id);
                self.active = Some(container_id);
                self.active
            }
        }
    }

    /// Drop the selection. Members of a selection container get their
    /// canvas placement back and the container is discarded.
    pub fn discard_active(&mut self) {
        self.active = None;
        let Some(selection) = self.selection.take() else {
            return;
        };
        let matrix = self.world_matrix(selection);
        for member in self.members(selection) {
            if let Some(obj) = self.get_mut(member) {
                obj.state.placement = bake_into(&obj.state.placement, matrix);
                obj.group = None;
            }
        }
        if let Some(idx) = self.id_index.remove(&selection) {
            self.graph.remove_node(idx);
        }
    }

    /// Take one member out of the selection container, restoring its canvas
    /// placement.
    fn release_member(&mut self, id: ObjectId) {
        let Some(selection) = self.selection else {
            return;
        };
        let matrix = self.world_matrix(selection);
        self.detach_from_parent(id);
        if let Some(obj) = self.get_mut(id) {
            obj.state.placement = bake_into(&obj.state.placement, matrix);
            obj.group = None;
        }
        if self.members(selection).is_empty() {
            self.selection = None;
            if self.active == Some(selection) {
                self.active = None;
            }
            if let Some(idx) = self.id_index.remove(&selection) {
                self.graph.remove_node(idx);
            }
        }
    }
}
