//! KPI Aggregator: polls the sites for metrics and keeps the answers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::SiteId;
use document_store::{DocumentStoreExt, Filter, ListOptions};
use domain::{KpiSnapshot, Record};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::deadline::bounded;
use crate::error::SagaError;
use crate::lookup::SharedStore;
use crate::messages::{FactoryMessage, KpiChannelMessage, KpiMessage, KpiRequest};
use crate::producer::Producer;
use crate::runtime::{Handled, Participant, ShutdownSignal};
use crate::Result;

/// KPI Aggregator at headquarters.
pub struct KpiAggregator {
    sites: Vec<SiteId>,
    store: SharedStore,
    producer: Producer,
    deadline: Duration,
}

impl KpiAggregator {
    pub fn new(
        sites: Vec<SiteId>,
        store: SharedStore,
        producer: Producer,
        deadline: Duration,
    ) -> Self {
        Self {
            sites,
            store,
            producer,
            deadline,
        }
    }

    /// Asks every site for its metrics. A site that cannot be reached is
    /// skipped; answers arrive later on the KPI channel.
    pub async fn request_all(&self) {
        for site in &self.sites {
            let request = FactoryMessage::KpiRequest(KpiRequest::now());
            if let Err(e) = self.producer.send(site, &request).await {
                tracing::error!(%site, error = %e, "failed to request kpi");
            }
        }
        tracing::debug!(sites = self.sites.len(), "kpi requested");
    }

    /// Requests metrics every `interval` until shutdown.
    ///
    /// The first request goes out one interval after start.
    pub fn spawn_poller(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: ShutdownSignal,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(?interval, "kpi poller started");

            loop {
                tokio::select! {
                    _ = shutdown.triggered() => break,
                    _ = ticker.tick() => self.request_all().await,
                }
            }
            tracing::info!("kpi poller stopped");
        })
    }

    #[tracing::instrument(skip(self, report), fields(site = %report.location))]
    async fn record(&self, report: KpiMessage) -> Result<()> {
        let snapshot = KpiSnapshot::capture(
            report.location,
            report.completed_orders,
            report.incomplete_orders,
            report.costs_of_parts,
        );
        bounded(
            self.deadline,
            "insert kpi snapshot",
            self.store.insert(KpiSnapshot::KIND, &snapshot),
        )
        .await?;

        metrics::counter!("kpi_snapshots_recorded_total").increment(1);
        tracing::info!(
            total = snapshot.total,
            completed = snapshot.completed_orders,
            "kpi snapshot recorded"
        );
        Ok(())
    }

    /// The most recent snapshot of every configured site that has one.
    pub async fn latest_per_site(&self) -> Result<Vec<KpiSnapshot>> {
        let mut snapshots = Vec::with_capacity(self.sites.len());
        for site in &self.sites {
            if let Some(snapshot) = self.latest(site).await? {
                snapshots.push(snapshot);
            }
        }
        Ok(snapshots)
    }

    pub async fn latest(&self, site: &SiteId) -> Result<Option<KpiSnapshot>> {
        Ok(self.last_n(site, 1).await?.into_iter().next())
    }

    /// Up to `n` snapshots of `site`, newest first.
    pub async fn last_n(&self, site: &SiteId, n: usize) -> Result<Vec<KpiSnapshot>> {
        bounded(
            self.deadline,
            "list kpi snapshots",
            self.store.find_all(
                KpiSnapshot::KIND,
                &Filter::by("location", site.as_str()),
                ListOptions::latest(n),
            ),
        )
        .await
    }
}

#[async_trait]
impl Participant for KpiAggregator {
    type Message = KpiChannelMessage;

    fn name(&self) -> &'static str {
        "kpi"
    }

    async fn handle(&self, message: KpiChannelMessage) -> Result<Handled> {
        match message {
            KpiChannelMessage::KpiUpdate(report) => self.record(report).await?,
            KpiChannelMessage::Unknown => {
                return Err(SagaError::UnexpectedMessage {
                    service: self.name(),
                });
            }
        }
        Ok(Handled::Done)
    }
}
