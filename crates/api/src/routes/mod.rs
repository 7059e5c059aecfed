//! HTTP route handlers.

pub mod health;
pub mod kpi;
pub mod metrics;
pub mod orders;

use std::sync::Arc;

use common::SiteId;
use saga::{KpiAggregator, OrderIntake};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub intake: Arc<OrderIntake>,
    pub kpi: Arc<KpiAggregator>,
    pub headquarters: SiteId,
    pub sites: Vec<SiteId>,
}
