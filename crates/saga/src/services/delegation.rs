//! Delegation: routes orders to the least loaded production site.

use async_trait::async_trait;
use common::SiteId;
use domain::{DomainError, OrderStatus, SiteConfig, select_site};

use crate::error::SagaError;
use crate::ledger::LoadLedger;
use crate::messages::{DelegationMessage, FactoryMessage, OrderMessage};
use crate::producer::Producer;
use crate::runtime::{Handled, Participant};
use crate::Result;

/// Delegation at headquarters.
pub struct Delegation {
    ledger: LoadLedger,
    producer: Producer,
    sites: Vec<SiteConfig>,
    site_ids: Vec<SiteId>,
}

impl Delegation {
    pub fn new(ledger: LoadLedger, producer: Producer, sites: Vec<SiteConfig>) -> Self {
        let site_ids = sites.iter().map(|site| site.id.clone()).collect();
        Self {
            ledger,
            producer,
            sites,
            site_ids,
        }
    }

    /// Resets every site's load to zero. Must run before consuming.
    pub async fn init(&self) -> Result<()> {
        self.ledger.reset(&self.sites).await
    }

    /// Picks a site for the order, counts it there and forwards it.
    #[tracing::instrument(skip(self, request), fields(order = %request.order_id))]
    async fn delegate(&self, request: OrderMessage) -> Result<()> {
        let statuses = self.ledger.snapshot(&self.site_ids).await?;
        for status in &statuses {
            tracing::debug!(
                site = %status.location,
                load = status.current_load,
                max = status.max_concurrent_orders,
                relative_load = status.relative_load(),
                "site load"
            );
        }
        let chosen = select_site(&statuses).ok_or(DomainError::NoAvailableSite)?;
        let site = chosen.location.clone();
        let relative_load = chosen.relative_load();

        self.ledger.increment(chosen).await?;
        self.producer
            .send(&site, &FactoryMessage::Routed(request.restamped()))
            .await?;

        metrics::counter!("orders_delegated_total", "site" => site.to_string()).increment(1);
        tracing::info!(%site, relative_load, "order delegated");
        Ok(())
    }

    /// Releases one unit of load when a site reports an order as done.
    #[tracing::instrument(skip(self, update), fields(order = %update.order_id))]
    async fn release(&self, update: OrderMessage) -> Result<()> {
        if update.require_status()? != &OrderStatus::Complete {
            tracing::debug!("status update ignored");
            return Ok(());
        }
        let site = update.location.ok_or(SagaError::MissingField("location"))?;

        let status = self.ledger.decrement(&site).await?;
        tracing::info!(%site, load = status.current_load, "order released");
        Ok(())
    }
}

#[async_trait]
impl Participant for Delegation {
    type Message = DelegationMessage;

    fn name(&self) -> &'static str {
        "delegation"
    }

    async fn handle(&self, message: DelegationMessage) -> Result<Handled> {
        match message {
            DelegationMessage::Delegate(request) => self.delegate(request).await?,
            DelegationMessage::OrderUpdate(update) => self.release(update).await?,
            DelegationMessage::Unknown => {
                return Err(SagaError::UnexpectedMessage {
                    service: self.name(),
                });
            }
        }
        Ok(Handled::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{InMemoryBus, Subscription};
    use crate::deadline::Deadlines;
    use crate::messages::decode;
    use crate::topology::{Channel, Route};
    use common::{CustomerRef, OrderId};
    use document_store::InMemoryDocumentStore;
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        delegation: Delegation,
        ledger: LoadLedger,
        usa: Subscription,
        china: Subscription,
    }

    async fn fixture(sites: Vec<SiteConfig>) -> Fixture {
        let bus = InMemoryBus::new();
        let usa = bus
            .subscribe(Route::new(SiteId::from("usa"), Channel::Factory))
            .await;
        let china = bus
            .subscribe(Route::new(SiteId::from("china"), Channel::Factory))
            .await;
        let ledger = LoadLedger::new(Arc::new(InMemoryDocumentStore::new()), Deadlines::default());
        let delegation = Delegation::new(
            ledger.clone(),
            Producer::new(Arc::new(bus), Duration::from_secs(1)),
            sites,
        );
        delegation.init().await.unwrap();
        Fixture {
            delegation,
            ledger,
            usa,
            china,
        }
    }

    fn default_sites() -> Vec<SiteConfig> {
        vec![SiteConfig::new("usa", 10, 0.7), SiteConfig::new("china", 20, 1.2)]
    }

    fn request() -> OrderMessage {
        OrderMessage::new(OrderId::new())
            .with_customer(CustomerRef::from("c-1"))
            .with_status(OrderStatus::Processing)
    }

    async fn set_load(ledger: &LoadLedger, site: &str, load: u32) {
        let mut status = ledger.read(&SiteId::from(site)).await.unwrap();
        status.current_load = load.saturating_sub(1);
        ledger.increment(&status).await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_sites_prefer_larger_capacity() {
        let mut fixture = fixture(default_sites()).await;
        let order = request();
        fixture
            .delegation
            .handle(DelegationMessage::Delegate(order.clone()))
            .await
            .unwrap();

        let body = fixture.china.try_receive().unwrap();
        let FactoryMessage::Routed(routed) = decode::<FactoryMessage>(&body).unwrap() else {
            panic!("expected a routed order");
        };
        assert_eq!(routed.order_id, order.order_id);
        assert_eq!(routed.customer, order.customer);
        assert!(fixture.usa.try_receive().is_none());

        let china = fixture.ledger.read(&SiteId::from("china")).await.unwrap();
        assert_eq!(china.current_load, 1);
    }

    #[tokio::test]
    async fn test_identical_sites_resolve_to_first_listed() {
        let mut fixture = fixture(vec![
            SiteConfig::new("usa", 10, 1.0),
            SiteConfig::new("china", 10, 1.0),
        ])
        .await;
        fixture
            .delegation
            .handle(DelegationMessage::Delegate(request()))
            .await
            .unwrap();

        assert!(fixture.usa.try_receive().is_some());
        assert!(fixture.china.try_receive().is_none());
    }

    #[tokio::test]
    async fn test_lower_relative_load_wins() {
        let mut fixture = fixture(default_sites()).await;
        set_load(&fixture.ledger, "usa", 5).await;
        set_load(&fixture.ledger, "china", 12).await;

        fixture
            .delegation
            .handle(DelegationMessage::Delegate(request()))
            .await
            .unwrap();

        assert!(fixture.usa.try_receive().is_some());
        assert!(fixture.china.try_receive().is_none());
    }

    #[tokio::test]
    async fn test_equal_relative_load_prefers_larger_site() {
        let mut fixture = fixture(default_sites()).await;
        set_load(&fixture.ledger, "usa", 6).await;
        set_load(&fixture.ledger, "china", 12).await;

        fixture
            .delegation
            .handle(DelegationMessage::Delegate(request()))
            .await
            .unwrap();

        assert!(fixture.china.try_receive().is_some());
        assert!(fixture.usa.try_receive().is_none());
    }

    #[tokio::test]
    async fn test_complete_report_releases_load() {
        let fixture = fixture(default_sites()).await;
        set_load(&fixture.ledger, "usa", 3).await;

        let update = OrderMessage::new(OrderId::new())
            .with_status(OrderStatus::Complete)
            .with_location(SiteId::from("usa"));
        fixture
            .delegation
            .handle(DelegationMessage::OrderUpdate(update))
            .await
            .unwrap();

        let usa = fixture.ledger.read(&SiteId::from("usa")).await.unwrap();
        assert_eq!(usa.current_load, 2);
    }

    #[tokio::test]
    async fn test_other_statuses_leave_load_untouched() {
        let fixture = fixture(default_sites()).await;
        set_load(&fixture.ledger, "usa", 3).await;

        let update = OrderMessage::new(OrderId::new())
            .with_status(OrderStatus::Production)
            .with_location(SiteId::from("usa"));
        fixture
            .delegation
            .handle(DelegationMessage::OrderUpdate(update))
            .await
            .unwrap();

        let usa = fixture.ledger.read(&SiteId::from("usa")).await.unwrap();
        assert_eq!(usa.current_load, 3);
    }

    #[tokio::test]
    async fn test_release_without_location_is_rejected() {
        let fixture = fixture(default_sites()).await;
        let update = OrderMessage::new(OrderId::new()).with_status(OrderStatus::Complete);
        let result = fixture
            .delegation
            .handle(DelegationMessage::OrderUpdate(update))
            .await;
        assert!(matches!(result, Err(SagaError::MissingField("location"))));
    }

    #[tokio::test]
    async fn test_no_site_with_capacity() {
        let fixture = fixture(vec![SiteConfig::new("usa", 0, 1.0)]).await;
        let result = fixture
            .delegation
            .handle(DelegationMessage::Delegate(request()))
            .await;
        assert!(matches!(
            result,
            Err(SagaError::Domain(DomainError::NoAvailableSite))
        ));
    }
}
