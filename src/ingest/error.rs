use std::path::PathBuf;

/// Failures inside an adapter. These never leave `SourceAdapter::poll`.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
