use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PqrstError>;

#[derive(Debug, Error)]
pub enum PqrstError {
    #[error("invalid filter configuration: {reason}")]
    InvalidFilterConfiguration { reason: String },

    #[error("record {id} not found (looked for {})", path.display())]
    RecordNotFound { id: String, path: PathBuf },

    #[error("record {id} is unreadable: {reason}")]
    RecordUnreadable { id: String, reason: String },

    /// Produced per cycle by the interval builder; logged and skipped, never fatal.
    #[error("cycle {cycle} could not be built: {reason}")]
    CycleBuildFailure { cycle: usize, reason: String },

    #[error("failed to write {}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PqrstError {
    pub(crate) fn invalid_filter(reason: impl Into<String>) -> Self {
        Self::InvalidFilterConfiguration {
            reason: reason.into(),
        }
    }
}
