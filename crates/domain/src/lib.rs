//! Domain layer for the order-fulfillment saga.
//!
//! This crate holds the records every service persists and the pure rules
//! that operate on them:
//! - Order records of Order Intake and of the factories
//! - Order statuses and the factory stage machine
//! - Site load counters and site selection
//! - KPI snapshots and catalog records

pub mod catalog;
pub mod error;
pub mod factory;
pub mod kpi;
pub mod order;

pub use catalog::{Address, Customer, ManifestItem, Model, Part};
pub use error::DomainError;
pub use factory::{FactoryStatus, SiteConfig, select_site};
pub use kpi::KpiSnapshot;
pub use order::{FactoryOrder, FactoryStage, Order, OrderStatus, StageTransition};

/// A record type persisted in a document store.
pub trait Record {
    /// Name of the collection holding records of this type.
    const KIND: &'static str;
}
