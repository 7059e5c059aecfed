//! Order records, statuses and the factory stage machine.

mod record;
mod stage;
mod status;

pub use record::{FactoryOrder, Order, fields};
pub use stage::{FactoryStage, StageTransition};
pub use status::OrderStatus;
