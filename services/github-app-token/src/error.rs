//! Error types for credential issuance
//!
//! Every failure is terminal for the run. Each variant maps to its own
//! process exit code so pipeline steps can tell failures apart.

use thiserror::Error;

/// Errors that can occur while issuing GitHub App credentials
#[derive(Debug, Error)]
pub enum IssueError {
    /// Runtime configuration could not be used (API URL, HTTP client)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Neither app_id nor client_id was given
    #[error("Either app_id or client_id needs to be set")]
    MissingIdentity,

    /// Both app_id and client_id were given
    #[error("Only one of app_id or client_id should be set, not both (prefer client_id)")]
    AmbiguousIdentity,

    /// Repository selection options conflict or lack an installation
    #[error("Invalid repository selection: {0}")]
    InvalidSelection(String),

    /// Private key missing, ambiguous, unreadable or not an RSA key
    #[error("Key material error: {0}")]
    KeyMaterial(String),

    /// JWT construction or signing failed
    #[error("Failed to sign JWT: {0}")]
    SigningFailed(String),

    /// The JWT was not accepted by the self-identity endpoint
    #[error("JWT validation failed: {0}")]
    ValidationFailed(String),

    /// The installation token exchange failed
    #[error("Installation token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// A repository list entry is invalid or the list is too long
    #[error("Malformed repository list: {0}")]
    MalformedRepositorySpec(String),

    /// A permission item is not in `resource:permission` form
    #[error("Malformed permissions: {0}")]
    MalformedPermissionSpec(String),

    /// Writing a file or secret output failed
    #[error("Failed to write output: {0}")]
    OutputWrite(String),
}

impl IssueError {
    /// Process exit code for this error kind
    pub fn exit_code(&self) -> u8 {
        match self {
            IssueError::Config(_) => 1,
            IssueError::MissingIdentity => 2,
            IssueError::AmbiguousIdentity => 3,
            IssueError::InvalidSelection(_) => 4,
            IssueError::KeyMaterial(_) => 5,
            IssueError::SigningFailed(_) => 6,
            IssueError::ValidationFailed(_) => 7,
            IssueError::TokenExchangeFailed(_) => 8,
            IssueError::MalformedRepositorySpec(_) => 9,
            IssueError::MalformedPermissionSpec(_) => 10,
            IssueError::OutputWrite(_) => 11,
        }
    }
}
