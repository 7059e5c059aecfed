//! Production sites: configuration, load counters and site selection.

use std::cmp::Ordering;
use std::str::FromStr;

use common::SiteId;
use serde::{Deserialize, Serialize};

use crate::{DomainError, Record};

/// Static description of a production site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub id: SiteId,
    pub max_concurrent_orders: u32,
    /// Factor applied to a model's base assembly time at this site.
    pub assembly_multiplier: f64,
}

impl SiteConfig {
    pub fn new(
        id: impl Into<SiteId>,
        max_concurrent_orders: u32,
        assembly_multiplier: f64,
    ) -> Self {
        Self {
            id: id.into(),
            max_concurrent_orders,
            assembly_multiplier,
        }
    }

    /// Parses a comma separated list such as `usa:10:0.7,china:20:1.2`.
    pub fn parse_list(list: &str) -> Result<Vec<SiteConfig>, DomainError> {
        let sites = list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::parse::<SiteConfig>)
            .collect::<Result<Vec<SiteConfig>, _>>()?;

        if sites.is_empty() {
            return Err(DomainError::InvalidSiteConfig {
                entry: list.to_string(),
                reason: "no production sites configured".into(),
            });
        }
        for (index, site) in sites.iter().enumerate() {
            if sites[..index].iter().any(|other| other.id == site.id) {
                return Err(DomainError::InvalidSiteConfig {
                    entry: site.id.to_string(),
                    reason: "site listed twice".into(),
                });
            }
        }
        Ok(sites)
    }
}

impl FromStr for SiteConfig {
    type Err = DomainError;

    /// Parses `name:max_concurrent_orders[:assembly_multiplier]`.
    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| DomainError::InvalidSiteConfig {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = entry.split(':');
        let name = parts
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| invalid("missing site name"))?;
        let max_concurrent_orders = parts
            .next()
            .ok_or_else(|| invalid("missing max concurrent orders"))?
            .trim()
            .parse::<u32>()
            .map_err(|_| invalid("max concurrent orders is not a number"))?;
        let assembly_multiplier = match parts.next() {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|m| m.is_finite() && *m >= 0.0)
                .ok_or_else(|| invalid("assembly multiplier is not a non-negative number"))?,
            None => 1.0,
        };
        if parts.next().is_some() {
            return Err(invalid("too many fields"));
        }

        Ok(SiteConfig::new(name, max_concurrent_orders, assembly_multiplier))
    }
}

/// Load counter of one production site.
///
/// Owned by Delegation. `current_load` counts in-flight orders and never
/// drops below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryStatus {
    pub location: SiteId,
    #[serde(rename = "currentLoad")]
    pub current_load: u32,
    #[serde(rename = "maxConcurrentOrders")]
    pub max_concurrent_orders: u32,
}

impl FactoryStatus {
    /// Creates an idle status record for a site.
    pub fn idle(location: SiteId, max_concurrent_orders: u32) -> Self {
        Self {
            location,
            current_load: 0,
            max_concurrent_orders,
        }
    }

    /// Returns `current_load / max_concurrent_orders`, for logging only.
    ///
    /// Site selection compares loads exactly with [`Self::compare_preference`].
    pub fn relative_load(&self) -> f64 {
        if self.max_concurrent_orders == 0 {
            return f64::INFINITY;
        }
        f64::from(self.current_load) / f64::from(self.max_concurrent_orders)
    }

    /// Returns true if the site can be assigned orders at all.
    pub fn accepts_orders(&self) -> bool {
        self.max_concurrent_orders > 0
    }

    /// Orders sites by preference: lower relative load first, then larger capacity.
    ///
    /// Relative loads are compared exactly by cross-multiplying.
    pub fn compare_preference(&self, other: &FactoryStatus) -> Ordering {
        let mine = u64::from(self.current_load) * u64::from(other.max_concurrent_orders);
        let theirs = u64::from(other.current_load) * u64::from(self.max_concurrent_orders);
        mine.cmp(&theirs)
            .then_with(|| other.max_concurrent_orders.cmp(&self.max_concurrent_orders))
    }

    pub fn incremented(&self) -> Self {
        Self {
            current_load: self.current_load.saturating_add(1),
            ..self.clone()
        }
    }

    /// Returns the record with one order less in flight, never below zero.
    pub fn decremented(&self) -> Self {
        Self {
            current_load: self.current_load.saturating_sub(1),
            ..self.clone()
        }
    }
}

impl Record for FactoryStatus {
    const KIND: &'static str = "status";
}

/// Picks the preferred site from a snapshot of load counters.
///
/// Sites without capacity are skipped. Sites that are equal in both
/// relative load and capacity resolve to the one listed first.
pub fn select_site(statuses: &[FactoryStatus]) -> Option<&FactoryStatus> {
    statuses
        .iter()
        .filter(|status| status.accepts_orders())
        .min_by(|a, b| a.compare_preference(b))
}
