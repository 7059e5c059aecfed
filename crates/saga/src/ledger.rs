//! Best-effort load counters of the production sites.
//!
//! Every operation is an independent read or write against the store. An
//! increment writes back the value that was read when the site was chosen,
//! so concurrent delegations can lose updates; the counters approximate the
//! load, they do not enforce capacity.

use common::SiteId;
use document_store::{DocumentStoreExt, Filter};
use domain::{FactoryStatus, Record, SiteConfig};
use serde_json::json;

use crate::deadline::{Deadlines, bounded};
use crate::error::SagaError;
use crate::lookup::SharedStore;
use crate::Result;

const LOCATION: &str = "location";
const CURRENT_LOAD: &str = "currentLoad";

/// Load counters owned by Delegation.
#[derive(Clone)]
pub struct LoadLedger {
    store: SharedStore,
    deadlines: Deadlines,
}

impl LoadLedger {
    pub fn new(store: SharedStore, deadlines: Deadlines) -> Self {
        Self { store, deadlines }
    }

    /// Replaces every counter with an idle record per configured site.
    #[tracing::instrument(skip_all, fields(sites = sites.len()))]
    pub async fn reset(&self, sites: &[SiteConfig]) -> Result<()> {
        bounded(self.deadlines.init, "reset load counters", async {
            self.store.clear(FactoryStatus::KIND).await?;
            for site in sites {
                let status = FactoryStatus::idle(site.id.clone(), site.max_concurrent_orders);
                self.store.insert(FactoryStatus::KIND, &status).await?;
            }
            Ok::<_, SagaError>(())
        })
        .await?;
        tracing::info!("load counters reset");
        Ok(())
    }

    /// Reads the counter of one site.
    pub async fn read(&self, site: &SiteId) -> Result<FactoryStatus> {
        let status: Option<FactoryStatus> = bounded(
            self.deadlines.call,
            "read load counter",
            self.store
                .find_one(FactoryStatus::KIND, &Filter::by(LOCATION, site.as_str())),
        )
        .await?;
        status.ok_or_else(|| SagaError::SiteNotFound(site.clone()))
    }

    /// Reads every site's counter, one read per site.
    pub async fn snapshot(&self, sites: &[SiteId]) -> Result<Vec<FactoryStatus>> {
        let mut statuses = Vec::with_capacity(sites.len());
        for site in sites {
            statuses.push(self.read(site).await?);
        }
        Ok(statuses)
    }

    /// Persists `observed` plus one order.
    pub async fn increment(&self, observed: &FactoryStatus) -> Result<FactoryStatus> {
        let next = observed.incremented();
        self.write(&next).await?;
        Ok(next)
    }

    /// Persists the current value minus one order, never below zero.
    pub async fn decrement(&self, site: &SiteId) -> Result<FactoryStatus> {
        let next = self.read(site).await?.decremented();
        self.write(&next).await?;
        Ok(next)
    }

    async fn write(&self, status: &FactoryStatus) -> Result<()> {
        let updated = bounded(
            self.deadlines.call,
            "write load counter",
            self.store.set_field(
                FactoryStatus::KIND,
                &Filter::by(LOCATION, status.location.as_str()),
                CURRENT_LOAD,
                json!(status.current_load),
            ),
        )
        .await?;
        if updated == 0 {
            return Err(SagaError::SiteNotFound(status.location.clone()));
        }
        tracing::debug!(
            site = %status.location,
            load = status.current_load,
            "load counter written"
        );
        Ok(())
    }
}
