//! Shipping: sends finished orders to their customers.

use std::sync::Arc;

use async_trait::async_trait;
use common::{CustomerRef, SiteId};
use domain::OrderStatus;

use crate::error::SagaError;
use crate::lookup::{CustomerDirectory, OrderLookup};
use crate::messages::{FactoryMessage, OrderMessage, ShippingMessage};
use crate::producer::Producer;
use crate::runtime::{Handled, Participant};
use crate::Result;

/// Shipping department of one production site.
pub struct Shipping {
    site: SiteId,
    customers: Arc<dyn CustomerDirectory>,
    orders: Arc<dyn OrderLookup>,
    producer: Producer,
}

impl Shipping {
    pub fn new(
        site: SiteId,
        customers: Arc<dyn CustomerDirectory>,
        orders: Arc<dyn OrderLookup>,
        producer: Producer,
    ) -> Self {
        Self {
            site,
            customers,
            orders,
            producer,
        }
    }

    /// Resolves the recipient and reports the order as shipped.
    ///
    /// If the order or its customer cannot be resolved nothing is reported
    /// and the order stays complete at the factory.
    #[tracing::instrument(
        skip(self, request),
        fields(site = %self.site, order = %request.order_id)
    )]
    async fn ship(&self, request: OrderMessage) -> Result<()> {
        let customer = self.recipient(&request).await?;
        let profile = self
            .customers
            .customer(&customer)
            .await?
            .ok_or_else(|| SagaError::CustomerNotFound(customer.clone()))?;
        tracing::info!(
            %customer,
            country = %profile.address.country,
            city = %profile.address.city,
            "order shipped"
        );

        let shipped = OrderMessage::new(request.order_id)
            .with_status(OrderStatus::Shipped)
            .with_location(self.site.clone());
        self.producer
            .send(&self.site, &FactoryMessage::OrderUpdate(shipped))
            .await
    }

    async fn recipient(&self, request: &OrderMessage) -> Result<CustomerRef> {
        if let Some(customer) = &request.customer
            && !customer.is_empty()
        {
            return Ok(customer.clone());
        }
        let order = self
            .orders
            .order(request.order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(request.order_id))?;
        Ok(order.customer)
    }
}

#[async_trait]
impl Participant for Shipping {
    type Message = ShippingMessage;

    fn name(&self) -> &'static str {
        "shipping"
    }

    async fn handle(&self, message: ShippingMessage) -> Result<Handled> {
        match message {
            ShippingMessage::Ship(request) => self.ship(request).await?,
            ShippingMessage::Unknown => {
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
    use crate::lookup::{SharedStore, StoreCustomerDirectory, StoreOrderLookup};
    use crate::messages::decode;
    use crate::topology::{Channel, Route};
    use common::{ItemId, OrderId};
    use document_store::{DocumentStoreExt, InMemoryDocumentStore};
    use domain::{Address, Customer, Order, Record};
    use std::time::Duration;

    const DEADLINE: Duration = Duration::from_secs(1);

    struct Fixture {
        shipping: Shipping,
        intake: SharedStore,
        factory: Subscription,
    }

    async fn fixture() -> Fixture {
        let directory: SharedStore = Arc::new(InMemoryDocumentStore::new());
        let address = Address {
            country: "Germany".into(),
            city: "Berlin".into(),
            zip_code: "10115".into(),
            address: "Invalidenstraße 1".into(),
        };
        directory
            .insert(Customer::KIND, &Customer::new("c-1", "Ada", "Lovelace", address))
            .await
            .unwrap();
        let intake: SharedStore = Arc::new(InMemoryDocumentStore::new());

        let bus = InMemoryBus::new();
        let factory = bus
            .subscribe(Route::new(SiteId::from("china"), Channel::Factory))
            .await;
        let shipping = Shipping::new(
            SiteId::from("china"),
            Arc::new(StoreCustomerDirectory::new(directory, DEADLINE)),
            Arc::new(StoreOrderLookup::new(intake.clone(), DEADLINE)),
            Producer::new(Arc::new(bus), DEADLINE),
        );
        Fixture {
            shipping,
            intake,
            factory,
        }
    }

    async fn shipped_order(factory: &mut Subscription) -> OrderMessage {
        let FactoryMessage::OrderUpdate(update) =
            decode::<FactoryMessage>(&factory.try_receive().unwrap()).unwrap()
        else {
            panic!("expected an order update");
        };
        update
    }

    #[tokio::test]
    async fn test_embedded_customer_is_shipped_to() {
        let mut fixture = fixture().await;
        let order_id = OrderId::new();
        let request = OrderMessage::new(order_id)
            .with_status(OrderStatus::Complete)
            .with_customer(CustomerRef::from("c-1"));

        fixture
            .shipping
            .handle(ShippingMessage::Ship(request))
            .await
            .unwrap();

        let update = shipped_order(&mut fixture.factory).await;
        assert_eq!(update.order_id, order_id);
        assert_eq!(update.status, Some(OrderStatus::Shipped));
        assert_eq!(update.location, Some(SiteId::from("china")));
    }

    #[tokio::test]
    async fn test_missing_customer_falls_back_to_order_lookup() {
        let mut fixture = fixture().await;
        let order = Order::new(CustomerRef::from("c-1"), vec![ItemId::new(1)]);
        fixture.intake.insert(Order::KIND, &order).await.unwrap();

        let request = OrderMessage::new(order.order_id).with_status(OrderStatus::Complete);
        fixture
            .shipping
            .handle(ShippingMessage::Ship(request))
            .await
            .unwrap();

        let update = shipped_order(&mut fixture.factory).await;
        assert_eq!(update.order_id, order.order_id);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_shipped() {
        let mut fixture = fixture().await;
        let request = OrderMessage::new(OrderId::new()).with_status(OrderStatus::Complete);

        let result = fixture.shipping.handle(ShippingMessage::Ship(request)).await;

        assert!(matches!(result, Err(SagaError::OrderNotFound(_))));
        assert!(fixture.factory.try_receive().is_none());
    }

    #[tokio::test]
    async fn test_unknown_customer_is_not_shipped() {
        let mut fixture = fixture().await;
        let request = OrderMessage::new(OrderId::new())
            .with_status(OrderStatus::Complete)
            .with_customer(CustomerRef::from("ghost"));

        let result = fixture.shipping.handle(ShippingMessage::Ship(request)).await;

        assert!(matches!(result, Err(SagaError::CustomerNotFound(_))));
        assert!(fixture.factory.try_receive().is_none());
    }
}
