//! Assembly: builds the items of an order at one site.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use domain::{OrderStatus, SiteConfig};

use crate::error::SagaError;
use crate::messages::{AssemblyMessage, FactoryMessage, OrderMessage};
use crate::producer::Producer;
use crate::runtime::{Handled, Participant};
use crate::simulation::AssemblyTime;
use crate::Result;

/// Assembly line of one production site.
pub struct Assembly {
    site: SiteConfig,
    timing: Arc<dyn AssemblyTime>,
    producer: Producer,
}

impl Assembly {
    pub fn new(site: SiteConfig, timing: Arc<dyn AssemblyTime>, producer: Producer) -> Self {
        Self {
            site,
            timing,
            producer,
        }
    }

    /// Total time to build every item of the request, one after the other.
    fn production_time(&self, request: &OrderMessage) -> Duration {
        request
            .items
            .iter()
            .map(|item| self.timing.duration(item, &self.site))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    #[tracing::instrument(
        skip(self, request),
        fields(site = %self.site.id, order = %request.order_id)
    )]
    fn assemble(&self, request: OrderMessage) -> Handled {
        let duration = self.production_time(&request);
        tracing::info!(items = request.items.len(), ?duration, "production started");

        let producer = self.producer.clone();
        let site = self.site.id.clone();
        let order_id = request.order_id;
        Handled::Spawned(Box::pin(async move {
            let started = Instant::now();
            tokio::time::sleep(duration).await;
            metrics::histogram!("assembly_duration_seconds")
                .record(started.elapsed().as_secs_f64());

            let finished = OrderMessage::new(order_id)
                .with_status(OrderStatus::Complete)
                .with_location(site.clone());
            producer
                .send(&site, &FactoryMessage::OrderUpdate(finished))
                .await?;
            tracing::info!(order = %order_id, "production finished");
            Ok::<_, SagaError>(())
        }))
    }
}

#[async_trait]
impl Participant for Assembly {
    type Message = AssemblyMessage;

    fn name(&self) -> &'static str {
        "assembly"
    }

    async fn handle(&self, message: AssemblyMessage) -> Result<Handled> {
        match message {
            AssemblyMessage::Assemble(request) => Ok(self.assemble(request)),
            AssemblyMessage::Unknown => Err(SagaError::UnexpectedMessage {
                service: self.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryBus;
    use crate::messages::decode;
    use crate::simulation::ScaledAssemblyTime;
    use crate::topology::{Channel, Route};
    use common::{ItemId, OrderId, PartId, SiteId};
    use domain::ManifestItem;

    fn item(assembly_time: u32) -> ManifestItem {
        ManifestItem {
            item_id: ItemId::new(1),
            parts: vec![PartId::new(1)],
            assembly_time,
        }
    }

    fn assembly(bus: &InMemoryBus, site: SiteConfig, unit: Duration) -> Assembly {
        Assembly::new(
            site,
            Arc::new(ScaledAssemblyTime::new(unit)),
            Producer::new(Arc::new(bus.clone()), Duration::from_secs(1)),
        )
    }

    #[test]
    fn test_production_time_sums_items() {
        let bus = InMemoryBus::new();
        let unit = Duration::from_secs(1);
        let fast = assembly(&bus, SiteConfig::new("fast", 10, 0.5), unit);
        let slow = assembly(&bus, SiteConfig::new("slow", 20, 2.0), unit);
        let request = OrderMessage::new(OrderId::new()).with_items(vec![item(10), item(20)]);

        assert_eq!(fast.production_time(&request), Duration::from_secs(15));
        assert_eq!(slow.production_time(&request), Duration::from_secs(60));
    }

    #[test]
    fn test_production_time_saturates_instead_of_overflowing() {
        let bus = InMemoryBus::new();
        let site = SiteConfig::new("slow", 10, 1.0e9);
        let slow = assembly(&bus, site, Duration::from_secs(u64::MAX / 4));
        let items = vec![item(u32::MAX), item(u32::MAX)];
        let request = OrderMessage::new(OrderId::new()).with_items(items);

        assert_eq!(slow.production_time(&request), Duration::MAX);
    }

    #[tokio::test]
    async fn test_completion_is_reported_to_own_factory() {
        let bus = InMemoryBus::new();
        let mut factory = bus
            .subscribe(Route::new(SiteId::from("usa"), Channel::Factory))
            .await;
        let assembly = assembly(
            &bus,
            SiteConfig::new("usa", 10, 0.7),
            Duration::from_millis(1),
        );
        let order_id = OrderId::new();
        let request = OrderMessage::new(order_id).with_items(vec![item(10)]);

        let Handled::Spawned(step) = assembly
            .handle(AssemblyMessage::Assemble(request))
            .await
            .unwrap()
        else {
            panic!("expected a background step");
        };
        assert!(factory.try_receive().is_none());
        step.await.unwrap();

        let FactoryMessage::OrderUpdate(finished) =
            decode::<FactoryMessage>(&factory.receive().await.unwrap()).unwrap()
        else {
            panic!("expected an order update");
        };
        assert_eq!(finished.order_id, order_id);
        assert_eq!(finished.status, Some(OrderStatus::Complete));
        assert_eq!(finished.location, Some(SiteId::from("usa")));
    }
}
