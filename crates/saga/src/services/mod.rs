//! The saga participants.
//!
//! Intake, Delegation and the KPI Aggregator run at headquarters; every
//! production site runs its own Factory, Parts Sourcing, Assembly and
//! Shipping.

pub mod assembly;
pub mod delegation;
pub mod factory;
pub mod intake;
pub mod kpi;
pub mod parts;
pub mod shipping;

pub use assembly::Assembly;
pub use delegation::Delegation;
pub use factory::Factory;
pub use intake::OrderIntake;
pub use kpi::KpiAggregator;
pub use parts::PartsSourcing;
pub use shipping::Shipping;
