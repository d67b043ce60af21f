//! Typed object snapshots.
//!
//! A snapshot is the committed state of one object. In memory it is a
//! typed `ObjectState`; on the wire (`__originalState` in scene documents)
//! it is a JSON string tagged with a format number so older payloads can
//! be rejected instead of silently misread.

use crate::error::SnapshotError;
use crate::model::ObjectState;
use serde::{Deserialize, Serialize};

/// Current snapshot wire format.
pub const SNAPSHOT_FORMAT: u32 = 1;

fn current_format() -> u32 {
    SNAPSHOT_FORMAT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    #[serde(rename = "__format", default = "current_format")]
    format: u32,
    #[serde(flatten)]
    pub state: ObjectState,
}

impl ObjectSnapshot {
    pub fn of(state: ObjectState) -> Self {
        Self {
            format: SNAPSHOT_FORMAT,
            state,
        }
    }

    pub fn format(&self) -> u32 {
        self.format
    }

    /// Encode as the wire string stored in `__originalState`.
    pub fn to_wire(&self) -> String {
        match serde_json::to_string(self) {
            Ok(s) => s,
            Err(e) => {
                // Only reachable with non-finite numbers in the state.
                log::warn!("snapshot encode failed: {e}");
                String::from("{}")
            }
        }
    }

    /// Decode a wire string.
    pub fn from_wire(wire: &str) -> Result<Self, SnapshotError> {
        let snapshot: ObjectSnapshot = serde_json::from_str(wire)?;
        if snapshot.format > SNAPSHOT_FORMAT {
            return Err(SnapshotError::UnsupportedFormat(snapshot.format));
        }
        Ok(snapshot)
    }
}

impl From<ObjectState> for ObjectSnapshot {
    fn from(state: ObjectState) -> Self {
        Self::of(state)
    }
}
