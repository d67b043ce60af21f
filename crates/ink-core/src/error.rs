use thiserror::Error;

/// Failure to decode an `__originalState` snapshot string.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported snapshot format {0}")]
    UnsupportedFormat(u32),
}

/// Failure to load or export a scene document.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("unsupported scene document version {0}")]
    UnsupportedVersion(u32),
}
