use std::path::PathBuf;

use thiserror::Error;

/// Fatal error classes of the analysis pipeline.
///
/// Parse misses, unreadable files and metric failures are never surfaced as
/// errors; they are downgraded to statistics counters and log warnings at
/// the component boundary where they occur.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("source directory not found/accessible: {0}")]
    SourceDirectoryMissing(PathBuf),

    #[error("export directory not found/accessible: {0}")]
    ExportDirectoryMissing(PathBuf),

    #[error("export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
