//! Object version ledger.
//!
//! Each object carries a monotonic `version` and the snapshot of its last
//! committed state (`original_state`). The functions here advance both and
//! return what the history needs to record.
//!
//! | version | meaning                               |
//! |---------|---------------------------------------|
//! | 0       | not committed (or undone past its add) |
//! | 1       | added, one committed state            |
//! | n > 1   | n − 1 committed modifications         |

use crate::history::{Change, ChangeKind};
use ink_core::model::SceneObject;
use ink_core::snapshot::ObjectSnapshot;
use ink_core::transform::bake_into;
use kurbo::Affine;

/// Stamp a freshly added object. Returns the committed snapshot.
pub fn on_committed(obj: &mut SceneObject) -> ObjectSnapshot {
    obj.version = 1;
    let snapshot = obj.snapshot();
    obj.original_state = Some(snapshot.clone());
    snapshot
}

/// Record an in-place modification.
///
/// `transform` is the world matrix of the group the object was modified
/// through; the committed snapshot is then expressed on the canvas.
pub fn on_modified(obj: &mut SceneObject, transform: Option<Affine>) -> Change {
    obj.version += 1;
    let previous = obj
        .original_state
        .take()
        .unwrap_or_else(|| obj.snapshot());
    let mut state = obj.state.clone();
    if let Some(group) = transform {
        state.placement = bake_into(&state.placement, group);
    }
    let current = ObjectSnapshot::of(state);
    obj.original_state = Some(current.clone());
    Change::new(obj.id, ChangeKind::Modified, previous, current)
}

/// Record a detach. A soft-removed object counts one more version; any
/// other removal discards an uncommitted object.
pub fn on_removed(obj: &mut SceneObject) {
    if obj.removed {
        obj.version += 1;
    } else {
        obj.version = 0;
    }
}
