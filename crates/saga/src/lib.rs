//! Choreographed order-fulfillment saga.
//!
//! Services coordinate only through messages on the bus. Each participant
//! consumes one channel of one location and reacts by updating its own
//! records and publishing the next message:
//!
//! ```text
//! intake ─delegate─► delegation ─neworder─► factory ─orderpart─► part
//!                        ▲                   │  ▲                 │
//!                        │             orderupdate (partsdelivered)
//!                        │                   ▼  │
//!                        │              assembly / shipping
//!                        │                   │
//!                        └──── orderupdate ──┴──► intake (status mirror)
//! ```
//!
//! No participant holds the whole saga state and nothing is compensated:
//! a failed step is logged and the order stays at its last status.

pub mod bus;
pub mod deadline;
pub mod error;
pub mod ledger;
pub mod lookup;
pub mod messages;
pub mod producer;
pub mod runtime;
pub mod services;
pub mod simulation;
pub mod topology;

pub use bus::{InMemoryBus, MessageBus, Subscription};
pub use deadline::Deadlines;
pub use error::{Result, SagaError};
pub use ledger::LoadLedger;
pub use lookup::{
    Catalog, CustomerDirectory, OrderLookup, SharedStore, StoreCatalog, StoreCustomerDirectory,
    StoreOrderLookup,
};
pub use messages::ChannelMessage;
pub use producer::Producer;
pub use runtime::{Consumer, Handled, Participant, Shutdown, ShutdownSignal};
pub use services::{
    Assembly, Delegation, Factory, KpiAggregator, OrderIntake, PartsSourcing, Shipping,
};
pub use simulation::{
    AssemblyTime, FixedPartDelivery, PartDelivery, RandomPartDelivery, ScaledAssemblyTime,
};
pub use topology::{Channel, Route};
