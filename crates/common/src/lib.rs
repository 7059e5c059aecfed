//! Identifiers shared by every order-fulfillment service.
//!
//! Services never share records, only these values travel between them.

pub mod types;

pub use types::{CustomerRef, ItemId, OrderId, PartId, SiteId};
