//! Saga error types.

use std::time::Duration;

use common::{CustomerRef, ItemId, OrderId, PartId, SiteId};
use document_store::StoreError;
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur while a participant handles a message or request.
///
/// None of these stop a consumer: the failing message is logged and
/// abandoned, and the next one is processed.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The request itself is invalid (surfaced to the caller of Order Intake).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The referenced customer does not exist.
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerRef),

    /// The referenced catalog item does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// An external call did not finish within its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Document store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// An inbound payload could not be decoded.
    #[error("Malformed message: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outbound payload could not be encoded.
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The message type is not handled on this channel.
    #[error("Unexpected message type for {service}")]
    UnexpectedMessage { service: &'static str },

    /// A message lacks a field its handler needs.
    #[error("Message is missing field '{0}'")]
    MissingField(&'static str),

    /// The order is not known to the service handling it.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The part is not known to the catalog.
    #[error("Part not found: {0}")]
    PartNotFound(PartId),

    /// The site has no load counter.
    #[error("Site not found: {0}")]
    SiteNotFound(SiteId),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl SagaError {
    /// Returns true for messages that are discarded as unprocessable.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            SagaError::Decode(_) | SagaError::UnexpectedMessage { .. } | SagaError::MissingField(_)
        )
    }

    /// Returns true for errors caused by the caller's request.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            SagaError::Validation(_) | SagaError::CustomerNotFound(_) | SagaError::ItemNotFound(_)
        )
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
