use thiserror::Error;

/// Failure taxonomy shared by every engine.
///
/// `NotFound` and `Corrupted` are deliberately distinct: the first means an
/// index/version/artifact is absent and the caller may treat it as "no
/// results", the second means something is on disk but cannot be trusted.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupted artifact: {0}")]
    Corrupted(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
