//! Parts Sourcing: prices and delivers the parts of an order.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use common::{PartId, SiteId};
use domain::OrderStatus;

use crate::error::SagaError;
use crate::lookup::Catalog;
use crate::messages::{FactoryMessage, OrderMessage, PartMessage, PartsMessage};
use crate::producer::Producer;
use crate::runtime::{Handled, Participant};
use crate::simulation::PartDelivery;
use crate::Result;

/// Parts Sourcing of one production site.
pub struct PartsSourcing {
    site: SiteId,
    catalog: Arc<dyn Catalog>,
    delivery: Arc<dyn PartDelivery>,
    producer: Producer,
}

impl PartsSourcing {
    pub fn new(
        site: SiteId,
        catalog: Arc<dyn Catalog>,
        delivery: Arc<dyn PartDelivery>,
        producer: Producer,
    ) -> Self {
        Self {
            site,
            catalog,
            delivery,
            producer,
        }
    }

    /// Prices every part up front, then waits for the deliveries in the
    /// background and reports the total cost.
    ///
    /// An unknown part aborts the order before anything is reported.
    #[tracing::instrument(
        skip(self, request),
        fields(site = %self.site, order = %request.order_id)
    )]
    async fn source(&self, request: OrderMessage) -> Result<Handled> {
        let parts: Vec<PartId> = request
            .items
            .iter()
            .flat_map(|item| item.parts.iter().copied())
            .collect();

        let mut costs: u64 = 0;
        let mut delays = Vec::with_capacity(parts.len());
        for part in parts {
            let found = self
                .catalog
                .part(part)
                .await?
                .ok_or(SagaError::PartNotFound(part))?;
            costs = costs.saturating_add(found.price);
            delays.push(self.delivery.delay(part));
        }
        tracing::info!(parts = delays.len(), costs, "parts ordered");

        let producer = self.producer.clone();
        let site = self.site.clone();
        let order_id = request.order_id;
        Ok(Handled::Spawned(Box::pin(async move {
            let started = Instant::now();
            for delay in delays {
                tokio::time::sleep(delay).await;
            }
            metrics::histogram!("parts_sourcing_duration_seconds")
                .record(started.elapsed().as_secs_f64());

            let delivered = OrderMessage::new(order_id)
                .with_status(OrderStatus::PartsDelivered)
                .with_location(site.clone())
                .with_costs(costs);
            producer
                .send(&site, &FactoryMessage::OrderUpdate(delivered))
                .await?;
            tracing::info!(order = %order_id, costs, "parts delivered");
            Ok::<_, SagaError>(())
        })))
    }

    #[tracing::instrument(skip(self, update), fields(part = %update.part))]
    async fn update_price(&self, update: PartMessage) -> Result<()> {
        if !self.catalog.set_part_price(update.part, update.price).await? {
            return Err(SagaError::PartNotFound(update.part));
        }
        tracing::info!(price = update.price, "part price updated");
        Ok(())
    }
}

#[async_trait]
impl Participant for PartsSourcing {
    type Message = PartsMessage;

    fn name(&self) -> &'static str {
        "part"
    }

    async fn handle(&self, message: PartsMessage) -> Result<Handled> {
        match message {
            PartsMessage::OrderParts(request) => self.source(request).await,
            PartsMessage::UpdatePart(update) => {
                self.update_price(update).await?;
                Ok(Handled::Done)
            }
            PartsMessage::Unknown => Err(SagaError::UnexpectedMessage {
                service: self.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{InMemoryBus, Subscription};
    use crate::lookup::{SharedStore, StoreCatalog};
    use crate::messages::decode;
    use crate::simulation::FixedPartDelivery;
    use crate::topology::{Channel, Route};
    use chrono::Utc;
    use common::{ItemId, OrderId};
    use document_store::{DocumentStoreExt, InMemoryDocumentStore};
    use domain::{ManifestItem, Part, Record};
    use std::time::Duration;

    async fn fixture() -> (PartsSourcing, Subscription, Arc<StoreCatalog>) {
        let store: SharedStore = Arc::new(InMemoryDocumentStore::new());
        for (id, price) in [(1, 50), (2, 30)] {
            store.insert(Part::KIND, &Part::new(id, price)).await.unwrap();
        }
        let catalog = Arc::new(StoreCatalog::new(store, Duration::from_secs(1)));

        let bus = InMemoryBus::new();
        let factory = bus
            .subscribe(Route::new(SiteId::from("usa"), Channel::Factory))
            .await;
        let parts = PartsSourcing::new(
            SiteId::from("usa"),
            catalog.clone(),
            Arc::new(FixedPartDelivery(Duration::ZERO)),
            Producer::new(Arc::new(bus), Duration::from_secs(1)),
        );
        (parts, factory, catalog)
    }

    fn item(id: u32, parts: &[u32]) -> ManifestItem {
        ManifestItem {
            item_id: ItemId::new(id),
            parts: parts.iter().copied().map(PartId::new).collect(),
            assembly_time: 5,
        }
    }

    async fn run(handled: Handled) {
        match handled {
            Handled::Spawned(step) => step.await.unwrap(),
            Handled::Done => panic!("expected a background step"),
        }
    }

    #[tokio::test]
    async fn test_costs_are_summed_over_all_items() {
        let (parts, mut factory, _) = fixture().await;
        let order_id = OrderId::new();
        let request = OrderMessage::new(order_id).with_items(vec![item(1, &[1]), item(2, &[2])]);

        run(parts.handle(PartsMessage::OrderParts(request)).await.unwrap()).await;

        let FactoryMessage::OrderUpdate(delivered) =
            decode::<FactoryMessage>(&factory.receive().await.unwrap()).unwrap()
        else {
            panic!("expected an order update");
        };
        assert_eq!(delivered.order_id, order_id);
        assert_eq!(delivered.status, Some(OrderStatus::PartsDelivered));
        assert_eq!(delivered.costs_of_parts, 80);
    }

    #[tokio::test]
    async fn test_unknown_part_aborts_sourcing() {
        let (parts, mut factory, _) = fixture().await;
        let request = OrderMessage::new(OrderId::new()).with_items(vec![item(1, &[1, 99])]);

        let result = parts.handle(PartsMessage::OrderParts(request)).await;

        assert!(matches!(result, Err(SagaError::PartNotFound(id)) if id == PartId::new(99)));
        assert!(factory.try_receive().is_none());
    }

    #[tokio::test]
    async fn test_price_update_applies_to_later_orders() {
        let (parts, mut factory, catalog) = fixture().await;
        let update = PartMessage {
            timestamp: Utc::now(),
            part: PartId::new(1),
            price: 70,
        };
        parts.handle(PartsMessage::UpdatePart(update)).await.unwrap();
        assert_eq!(catalog.part(PartId::new(1)).await.unwrap().unwrap().price, 70);

        let request = OrderMessage::new(OrderId::new()).with_items(vec![item(1, &[1, 2])]);
        run(parts.handle(PartsMessage::OrderParts(request)).await.unwrap()).await;

        let FactoryMessage::OrderUpdate(delivered) =
            decode::<FactoryMessage>(&factory.receive().await.unwrap()).unwrap()
        else {
            panic!("expected an order update");
        };
        assert_eq!(delivered.costs_of_parts, 100);
    }

    #[tokio::test]
    async fn test_price_update_for_unknown_part() {
        let (parts, _, _) = fixture().await;
        let update = PartMessage {
            timestamp: Utc::now(),
            part: PartId::new(42),
            price: 1,
        };
        let result = parts.handle(PartsMessage::UpdatePart(update)).await;
        assert!(matches!(result, Err(SagaError::PartNotFound(_))));
    }
}
