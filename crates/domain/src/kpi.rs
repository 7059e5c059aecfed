//! KPI snapshots kept by the KPI Aggregator.

use chrono::{DateTime, Utc};
use common::SiteId;
use serde::{Deserialize, Serialize};

use crate::Record;

/// Aggregated metrics of one site at one point in time.
///
/// Append-only: a snapshot is never changed after it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSnapshot {
    pub created: DateTime<Utc>,
    pub location: SiteId,
    pub incomplete_orders: u64,
    pub completed_orders: u64,
    pub total: u64,
    pub costs_of_parts: u64,
}

impl KpiSnapshot {
    /// Creates a snapshot captured now; `total` is derived from the two counts.
    pub fn capture(
        location: SiteId,
        completed_orders: u64,
        incomplete_orders: u64,
        costs_of_parts: u64,
    ) -> Self {
        Self {
            created: Utc::now(),
            location,
            incomplete_orders,
            completed_orders,
            total: completed_orders.saturating_add(incomplete_orders),
            costs_of_parts,
        }
    }
}

impl Record for KpiSnapshot {
    const KIND: &'static str = "kpi";
}
