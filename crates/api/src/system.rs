//! In-process wiring of every saga participant.
//!
//! Headquarters runs Order Intake, Delegation and the KPI Aggregator; every
//! production site runs a Factory Orchestrator, Parts Sourcing, Assembly and
//! Shipping. Each service gets a store of its own. The catalog and the
//! customer directory are shared read models owned by neither.

use std::sync::Arc;
use std::time::Duration;

use common::SiteId;
use document_store::{InMemoryDocumentStore, PostgresDocumentStore};
use saga::{
    Assembly, Channel, Consumer, Delegation, Factory, InMemoryBus, KpiAggregator, LoadLedger,
    OrderIntake, Participant, PartsSourcing, Producer, RandomPartDelivery, Route,
    ScaledAssemblyTime, SharedStore, Shipping, Shutdown, StoreCatalog, StoreCustomerDirectory,
    StoreOrderLookup,
};
use sqlx::PgPool;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::StartupError;
use crate::routes::AppState;
use crate::seed;

/// Where service stores live.
#[derive(Clone)]
pub enum StoreBackend {
    /// Fresh in-memory store per service; nothing survives a restart.
    Memory,
    /// One PostgreSQL database, one namespace per service.
    Postgres(PgPool),
}

impl StoreBackend {
    /// Connects to PostgreSQL and runs migrations if a URL is configured.
    pub async fn connect(database_url: Option<&str>) -> Result<Self, StartupError> {
        let Some(url) = database_url else {
            tracing::info!("no DATABASE_URL set, using in-memory stores");
            return Ok(StoreBackend::Memory);
        };

        let pool = PgPool::connect(url).await?;
        PostgresDocumentStore::new(pool.clone(), "migrations")
            .run_migrations()
            .await?;
        tracing::info!("connected to PostgreSQL, migrations applied");
        Ok(StoreBackend::Postgres(pool))
    }

    /// Opens the store of one service.
    pub fn open(&self, namespace: &str) -> SharedStore {
        match self {
            StoreBackend::Memory => Arc::new(InMemoryDocumentStore::new()),
            StoreBackend::Postgres(pool) => {
                Arc::new(PostgresDocumentStore::new(pool.clone(), namespace))
            }
        }
    }
}

/// Every running participant plus the HTTP-facing state.
pub struct System {
    state: Arc<AppState>,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

impl System {
    /// Seeds the read models, subscribes every participant to its route and
    /// starts the consumers and the KPI poller.
    pub async fn start(
        config: &Config,
        backend: &StoreBackend,
        bus: InMemoryBus,
    ) -> Result<Self, StartupError> {
        let deadlines = config.deadlines();
        let producer = Producer::new(Arc::new(bus.clone()), deadlines.call);
        let hq = config.headquarters.clone();

        let catalog_store = backend.open("catalog");
        let directory_store = backend.open("customers");
        let seeded = seed::seed_catalog(catalog_store.as_ref()).await?
            + seed::seed_customers(directory_store.as_ref()).await?;
        tracing::info!(records = seeded, "demo catalog seeded");

        let catalog = Arc::new(StoreCatalog::new(catalog_store, deadlines.call));
        let customers = Arc::new(StoreCustomerDirectory::new(directory_store, deadlines.call));

        let intake_store = backend.open("intake");
        let intake = Arc::new(OrderIntake::new(
            intake_store.clone(),
            customers.clone(),
            catalog.clone(),
            producer.clone(),
            hq.clone(),
            deadlines.call,
        ));

        let ledger = LoadLedger::new(backend.open("delegation"), deadlines);
        let delegation = Arc::new(Delegation::new(ledger, producer.clone(), config.sites.clone()));
        delegation.init().await?;

        let kpi = Arc::new(KpiAggregator::new(
            config.site_ids(),
            backend.open("kpi"),
            producer.clone(),
            deadlines.call,
        ));

        let mut system = Self {
            state: Arc::new(AppState {
                intake: intake.clone(),
                kpi: kpi.clone(),
                headquarters: hq.clone(),
                sites: config.site_ids(),
            }),
            shutdown: Shutdown::new(),
            tasks: Vec::new(),
        };
        let grace = config.shutdown_grace;
        system.consume(&bus, intake, &hq, Channel::Order, grace).await;
        system.consume(&bus, delegation, &hq, Channel::Delegation, grace).await;
        system.consume(&bus, kpi.clone(), &hq, Channel::Kpi, grace).await;

        let delivery = Arc::new(RandomPartDelivery::new(
            config.part_delivery_min,
            config.part_delivery_max,
        ));
        let timing = Arc::new(ScaledAssemblyTime::new(config.assembly_time_unit));
        let orders = Arc::new(StoreOrderLookup::new(intake_store, deadlines.call));

        for site in &config.sites {
            let id = site.id.clone();
            let factory = Factory::new(
                id.clone(),
                hq.clone(),
                backend.open(&format!("factory-{id}")),
                producer.clone(),
                deadlines.call,
            );
            let parts =
                PartsSourcing::new(id.clone(), catalog.clone(), delivery.clone(), producer.clone());
            let assembly = Assembly::new(site.clone(), timing.clone(), producer.clone());
            let shipping =
                Shipping::new(id.clone(), customers.clone(), orders.clone(), producer.clone());

            system.consume(&bus, Arc::new(factory), &id, Channel::Factory, grace).await;
            system.consume(&bus, Arc::new(parts), &id, Channel::Part, grace).await;
            system.consume(&bus, Arc::new(assembly), &id, Channel::Assembly, grace).await;
            system.consume(&bus, Arc::new(shipping), &id, Channel::Shipping, grace).await;
            tracing::info!(site = %id, max = site.max_concurrent_orders, "production site started");
        }

        system
            .tasks
            .push(kpi.spawn_poller(config.kpi_interval, system.shutdown.signal()));
        tracing::info!(headquarters = %hq, consumers = system.tasks.len() - 1, "saga started");
        Ok(system)
    }

    async fn consume<P: Participant>(
        &mut self,
        bus: &InMemoryBus,
        participant: Arc<P>,
        exchange: &SiteId,
        channel: Channel,
        grace: Duration,
    ) {
        let subscription = bus.subscribe(Route::new(exchange.clone(), channel)).await;
        let consumer = Consumer::new(participant, subscription, self.shutdown.signal(), grace);
        self.tasks.push(consumer.spawn());
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Stops every consumer and waits up to `grace` for them to finish.
    pub async fn stop(self, grace: Duration) {
        self.shutdown.trigger();
        let tasks = self.tasks;
        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();

        let joined = tokio::time::timeout(grace, async {
            for task in tasks {
                if let Err(e) = task.await {
                    tracing::error!(error = %e, "saga task failed");
                }
            }
        })
        .await;

        if joined.is_err() {
            tracing::warn!(?grace, "saga did not stop within grace period, aborting");
            for abort in aborts {
                abort.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> Config {
        Config {
            assembly_time_unit: Duration::ZERO,
            part_delivery_min: Duration::ZERO,
            part_delivery_max: Duration::ZERO,
            shutdown_grace: Duration::from_secs(1),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_every_route_is_bound() {
        let config = quick_config();
        let bus = InMemoryBus::new();
        let system = System::start(&config, &StoreBackend::Memory, bus.clone())
            .await
            .unwrap();

        for channel in [Channel::Order, Channel::Delegation, Channel::Kpi] {
            let route = Route::new(config.headquarters.clone(), channel);
            assert_eq!(bus.binding_count(&route).await, 1, "{route}");
        }
        for site in config.site_ids() {
            for channel in [Channel::Factory, Channel::Part, Channel::Assembly, Channel::Shipping] {
                let route = Route::new(site.clone(), channel);
                assert_eq!(bus.binding_count(&route).await, 1, "{route}");
            }
        }

        system.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_stop_releases_every_binding() {
        let config = quick_config();
        let bus = InMemoryBus::new();
        let system = System::start(&config, &StoreBackend::Memory, bus.clone())
            .await
            .unwrap();

        system.stop(Duration::from_secs(1)).await;

        let route = Route::new(config.headquarters.clone(), Channel::Order);
        assert_eq!(bus.binding_count(&route).await, 0);
    }
}
