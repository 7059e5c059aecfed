//! Durations of the simulated production steps.

use std::time::Duration;

use common::PartId;
use domain::{ManifestItem, SiteConfig};

/// How long a part takes to be delivered.
pub trait PartDelivery: Send + Sync {
    fn delay(&self, part: PartId) -> Duration;
}

/// Delivery delay drawn uniformly from a window for every part.
#[derive(Debug, Clone, Copy)]
pub struct RandomPartDelivery {
    min: Duration,
    max: Duration,
}

impl RandomPartDelivery {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }
}

impl Default for RandomPartDelivery {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(1000))
    }
}

impl PartDelivery for RandomPartDelivery {
    fn delay(&self, _part: PartId) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(fastrand::u64(min..=max))
    }
}

/// Same delay for every part.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPartDelivery(pub Duration);

impl PartDelivery for FixedPartDelivery {
    fn delay(&self, _part: PartId) -> Duration {
        self.0
    }
}

/// How long one item takes to assemble at a site.
///
/// Must be deterministic for a given item and site.
pub trait AssemblyTime: Send + Sync {
    fn duration(&self, item: &ManifestItem, site: &SiteConfig) -> Duration;
}

/// Base assembly time of the model times the site multiplier, in units of
/// `unit`.
#[derive(Debug, Clone, Copy)]
pub struct ScaledAssemblyTime {
    unit: Duration,
}

impl ScaledAssemblyTime {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }
}

impl Default for ScaledAssemblyTime {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl AssemblyTime for ScaledAssemblyTime {
    fn duration(&self, item: &ManifestItem, site: &SiteConfig) -> Duration {
        let factor = f64::from(item.assembly_time) * site.assembly_multiplier;
        if !factor.is_finite() || factor <= 0.0 {
            return Duration::ZERO;
        }
        // Out-of-range products saturate at Duration::MAX
        Duration::try_from_secs_f64(self.unit.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }
}
