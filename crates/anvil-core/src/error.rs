//! Unified error types for the Anvil core contracts.
//!
//! This module provides standardized error types used across core components.
//! Pipeline-level errors (like setup errors) are defined in anvil-dispatch.

use thiserror::Error;

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors that can occur in persistence operations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The backing store could not be reached.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    /// A read or write against the store failed.
    #[error("storage operation failed: {0}")]
    Operation(String),

    /// A stored record could not be decoded.
    #[error("corrupt record for key '{key}': {reason}")]
    Corrupt {
        /// The record key that failed to decode.
        key: String,
        /// Reason for failure.
        reason: String,
    },
}

// =============================================================================
// Response Errors
// =============================================================================

/// Errors that can occur when delivering a response to the platform.
#[derive(Debug, Clone, Error)]
pub enum ResponseError {
    /// `respond_initial` was called on an interaction that already received
    /// its initial response. This is a caller error, not a platform fault.
    #[error("interaction {id} was already acknowledged")]
    AlreadyAcknowledged {
        /// The offending interaction ID.
        id: u64,
    },

    /// The platform rejected the outgoing payload.
    #[error("platform rejected the response ({code}): {message}")]
    Rejected {
        /// Platform-specific error code.
        code: i64,
        /// Platform-provided error message.
        message: String,
    },

    /// The connection to the platform is gone.
    #[error("connection to the platform is closed")]
    ConnectionClosed,

    /// Any other delivery failure.
    #[error("failed to deliver response: {0}")]
    Delivery(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for persistence operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for response delivery.
pub type ResponseResult<T> = Result<T, ResponseError>;
