//! Error kinds shared across the provisioning agent.

use thiserror::Error;

/// Errors surfaced by the storage session and access rule requester.
#[derive(Debug, Error)]
pub enum Error {
    /// Credential exchange or token/endpoint resolution failed. Fatal, never retried.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// An account or container operation returned a non-success upstream status.
    /// `status` is the upstream HTTP status, or 0 when no response was received.
    #[error("Storage request failed: {status} {reason}")]
    StorageRequestFailed { status: u16, reason: String },

    /// An ACL API call failed or returned non-success. Whether this is raised
    /// or only reported depends on the requester's [`FailurePolicy`].
    ///
    /// [`FailurePolicy`]: crate::access::FailurePolicy
    #[error("Access rule request failed: {0}")]
    AccessRuleRequestFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
