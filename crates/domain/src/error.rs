//! Domain error types.

use thiserror::Error;

/// Errors raised by the domain rules.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A production site entry could not be parsed.
    #[error("Invalid site configuration {entry:?}: {reason}")]
    InvalidSiteConfig { entry: String, reason: String },

    /// No configured site can take orders.
    #[error("No production site has capacity configured")]
    NoAvailableSite,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
