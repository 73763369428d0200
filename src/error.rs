use thiserror::Error;

/// Errors surfaced by the content engine. The enum is `Clone` because the
/// outcome of a coalesced reconciliation is broadcast to every waiter, so the
/// underlying io errors are flattened into strings at the point of failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BlogError {
    /// Filesystem enumeration failed. Fatal to the whole reconciliation pass;
    /// the previous index stays authoritative.
    #[error("content scan failed: {0}")]
    Scan(String),

    /// One file's markup failed to parse. Isolated to that file.
    #[error("could not parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// A query matched no posts.
    #[error("no matching posts")]
    NotFound,
}

impl BlogError {
    pub fn scan(err: impl ToString) -> BlogError {
        BlogError::Scan(err.to_string())
    }

    pub fn parse(path: &std::path::Path, reason: impl ToString) -> BlogError {
        BlogError::Parse {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
