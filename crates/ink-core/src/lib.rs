pub mod document;
pub mod error;
pub mod hit;
pub mod id;
pub mod model;
pub mod scene;
pub mod snapshot;
pub mod transform;

pub use document::{
    DOCUMENT_VERSION, ObjectRecord, SceneDocument, export_document, import_document,
    parse_document, to_json,
};
pub use error::{SceneError, SnapshotError};
pub use id::ObjectId;
pub use model::*;
pub use scene::{SceneEvent, SceneGraph};
pub use snapshot::{ObjectSnapshot, SNAPSHOT_FORMAT};

// Re-export kurbo types so downstream crates share one geometry vocabulary
pub use kurbo::{Affine, Point, Rect};
