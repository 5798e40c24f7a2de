//! Client error types

use shared::transport::TransportError;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure on the realtime channel
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Server refused the handshake
    #[error("Handshake refused: {0}")]
    Refused(String),

    /// Server denied a room request
    #[error("Room request denied: {0}")]
    Denied(String),

    /// Request timed out
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Realtime connection is gone
    #[error("Disconnected from server")]
    Disconnected,
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
