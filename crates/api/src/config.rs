//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use common::SiteId;
use domain::{DomainError, SiteConfig};
use saga::Deadlines;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

/// Server and saga configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `pretty` or `json`
/// - `HEADQUARTERS`: location of intake, delegation and kpi (default `london`)
/// - `SITES`: production sites as `name:max_concurrent_orders[:assembly_multiplier]`
/// - `DATABASE_URL`: PostgreSQL backs the stores when set
/// - `STORE_TIMEOUT_MS`, `STORE_INIT_TIMEOUT_MS`: call deadlines
/// - `KPI_INTERVAL_SECS`: KPI polling interval
/// - `ASSEMBLY_TIME_UNIT_MS`: length of one catalog assembly-time unit
/// - `PART_DELIVERY_MIN_MS`, `PART_DELIVERY_MAX_MS`: simulated delivery window
/// - `SHUTDOWN_GRACE_SECS`: drain window on shutdown
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub headquarters: SiteId,
    pub sites: Vec<SiteConfig>,
    pub database_url: Option<String>,
    pub store_timeout: Duration,
    pub store_init_timeout: Duration,
    pub kpi_interval: Duration,
    pub assembly_time_unit: Duration,
    pub part_delivery_min: Duration,
    pub part_delivery_max: Duration,
    pub shutdown_grace: Duration,
}

const DEFAULT_SITES: &str = "usa:10:0.7,china:20:1.2";

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// Fails only if `SITES` is malformed; other unparsable values fall back
    /// to their defaults.
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |name: &str| lookup(name).and_then(|value| value.parse::<u64>().ok());
        let millis = |name: &str, default: Duration| {
            parsed(name).map(Duration::from_millis).unwrap_or(default)
        };
        let secs = |name: &str, default: Duration| {
            parsed(name).map(Duration::from_secs).unwrap_or(default)
        };

        let sites = match lookup("SITES") {
            Some(list) => SiteConfig::parse_list(&list)?,
            None => defaults.sites.clone(),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|f| f.parse().ok())
                .unwrap_or(defaults.log_format),
            headquarters: lookup("HEADQUARTERS")
                .map(SiteId::new)
                .unwrap_or(defaults.headquarters),
            sites,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            store_timeout: millis("STORE_TIMEOUT_MS", defaults.store_timeout),
            store_init_timeout: millis("STORE_INIT_TIMEOUT_MS", defaults.store_init_timeout),
            kpi_interval: secs("KPI_INTERVAL_SECS", defaults.kpi_interval),
            assembly_time_unit: millis("ASSEMBLY_TIME_UNIT_MS", defaults.assembly_time_unit),
            part_delivery_min: millis("PART_DELIVERY_MIN_MS", defaults.part_delivery_min),
            part_delivery_max: millis("PART_DELIVERY_MAX_MS", defaults.part_delivery_max),
            shutdown_grace: secs("SHUTDOWN_GRACE_SECS", defaults.shutdown_grace),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn deadlines(&self) -> Deadlines {
        Deadlines {
            call: self.store_timeout,
            init: self.store_init_timeout,
        }
    }

    pub fn site_ids(&self) -> Vec<SiteId> {
        self.sites.iter().map(|site| site.id.clone()).collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            headquarters: SiteId::from("london"),
            sites: vec![SiteConfig::new("usa", 10, 0.7), SiteConfig::new("china", 20, 1.2)],
            database_url: None,
            store_timeout: Duration::from_secs(5),
            store_init_timeout: Duration::from_secs(30),
            kpi_interval: Duration::from_secs(90),
            assembly_time_unit: Duration::from_secs(1),
            part_delivery_min: Duration::from_millis(500),
            part_delivery_max: Duration::from_millis(1000),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}
