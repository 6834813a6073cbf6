//! Pipeline-level error types.

use thiserror::Error;

/// Errors raised while assembling a dispatcher.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A mandatory collaborator was never supplied to the builder.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

/// Result type for dispatcher setup.
pub type SetupResult<T> = Result<T, SetupError>;
