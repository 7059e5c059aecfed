//! Message routing: one exchange per location, one routing key per service.

use common::SiteId;
use serde::{Deserialize, Serialize};

/// Logical inbound channel of a service, used as the routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Factory Orchestrator of a site.
    Factory,
    /// Parts Sourcing of a site.
    Part,
    /// Assembly of a site.
    Assembly,
    /// Shipping of a site.
    Shipping,
    /// Delegation at headquarters.
    Delegation,
    /// Order Intake at headquarters.
    Order,
    /// KPI Aggregator at headquarters.
    Kpi,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Factory => "factory",
            Channel::Part => "part",
            Channel::Assembly => "assembly",
            Channel::Shipping => "shipping",
            Channel::Delegation => "delegation",
            Channel::Order => "order",
            Channel::Kpi => "kpi",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exchange plus routing key: where a message is published to and where a
/// subscriber binds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    pub exchange: SiteId,
    pub channel: Channel,
}

impl Route {
    pub fn new(exchange: SiteId, channel: Channel) -> Self {
        Self { exchange, channel }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.exchange, self.channel)
    }
}
