//! Client error types

use shared::ValidationError;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Draft failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Image upload failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Remote store write failed
    #[error("Write failed: {0}")]
    Write(String),

    /// Live subscription failed
    #[error("Subscription failed: {0}")]
    Subscription(String),

    /// Sign-in failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A mutation is already in flight
    #[error("Another submit is still in progress")]
    Busy,
}

impl ClientError {
    /// Message shown to the store admin
    ///
    /// Upload and write failures are not distinguished here; both surface as
    /// the same save failure. The full detail stays on the error for logs.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(e) => e.to_string(),
            ClientError::Upload(msg) | ClientError::Write(msg) => {
                format!("Failed to save product: {msg}")
            }
            ClientError::Subscription(_) => "Failed to load products".to_string(),
            ClientError::Auth(_) => "Invalid email or password".to_string(),
            ClientError::Busy => "Another submit is still in progress".to_string(),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
