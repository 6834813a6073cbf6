//! Typed handler results.
//!
//! Every handler invocation produces exactly one [`ExecutionResult`], which
//! the outcome renderer consumes exactly once. The three variants map to the
//! three log-and-respond branches of the pipeline: success, an anticipated
//! user-visible failure, and an unexpected fault.

/// The cause attached to a [`ExecutionResult::Fault`].
pub type FaultCause = Box<dyn std::error::Error + Send + Sync>;

/// An anticipated, user-visible failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserError {
    /// The localized message shown to the invoker.
    pub message: String,
    /// Whether the response is visible only to the invoker.
    pub ephemeral: bool,
    /// Silent errors are logged but never answered — used when another path
    /// already delivered a result for the same trigger.
    pub silent: bool,
}

/// The result of one handler invocation.
#[derive(Debug)]
pub enum ExecutionResult {
    /// The handler completed; any user-visible output was delivered by the
    /// handler itself.
    Success,
    /// An anticipated business-rule failure.
    UserError(UserError),
    /// An unexpected defect: an escaped error, a panic, or a timeout.
    Fault(FaultCause),
}

impl ExecutionResult {
    /// A successful execution.
    pub fn success() -> Self {
        Self::Success
    }

    /// A visible user error.
    pub fn user_error(message: impl Into<String>) -> Self {
        Self::UserError(UserError {
            message: message.into(),
            ephemeral: false,
            silent: false,
        })
    }

    /// A user error shown only to the invoker.
    pub fn ephemeral_error(message: impl Into<String>) -> Self {
        Self::UserError(UserError {
            message: message.into(),
            ephemeral: true,
            silent: false,
        })
    }

    /// A user error that is logged but never answered.
    pub fn silent_error(message: impl Into<String>) -> Self {
        Self::UserError(UserError {
            message: message.into(),
            ephemeral: true,
            silent: true,
        })
    }

    /// An unexpected fault.
    pub fn fault(cause: impl Into<FaultCause>) -> Self {
        Self::Fault(cause.into())
    }

    /// Returns `true` for results that produce no response at all.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::UserError(e) if e.silent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_flags() {
        let ExecutionResult::UserError(plain) = ExecutionResult::user_error("nope") else {
            panic!("expected user error");
        };
        assert!(!plain.ephemeral);
        assert!(!plain.silent);

        let ExecutionResult::UserError(quiet) = ExecutionResult::silent_error("dup") else {
            panic!("expected user error");
        };
        assert!(quiet.silent);
        assert!(ExecutionResult::silent_error("dup").is_silent());
        assert!(!ExecutionResult::success().is_silent());
    }

    #[test]
    fn fault_preserves_the_cause() {
        let result = ExecutionResult::fault("backend exploded".to_string());
        let ExecutionResult::Fault(cause) = result else {
            panic!("expected fault");
        };
        assert_eq!(cause.to_string(), "backend exploded");
    }
}
