//! Order Intake: accepts orders and mirrors their status.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerRef, ItemId, OrderId, SiteId};
use document_store::{DocumentStoreExt, Filter, ListOptions};
use domain::order::fields;
use domain::{ManifestItem, Order, OrderStatus, Record};
use serde_json::{Map, json};

use crate::deadline::bounded;
use crate::error::SagaError;
use crate::lookup::{Catalog, CustomerDirectory, SharedStore};
use crate::messages::{DelegationMessage, IntakeMessage, OrderMessage};
use crate::producer::Producer;
use crate::runtime::{Handled, Participant};
use crate::Result;

/// Order Intake at headquarters.
pub struct OrderIntake {
    store: SharedStore,
    customers: Arc<dyn CustomerDirectory>,
    catalog: Arc<dyn Catalog>,
    producer: Producer,
    headquarters: SiteId,
    deadline: Duration,
}

impl OrderIntake {
    pub fn new(
        store: SharedStore,
        customers: Arc<dyn CustomerDirectory>,
        catalog: Arc<dyn Catalog>,
        producer: Producer,
        headquarters: SiteId,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            customers,
            catalog,
            producer,
            headquarters,
            deadline,
        }
    }

    /// Validates and persists a new order, then asks Delegation for a site.
    ///
    /// Validation failures leave nothing behind. Once the record is stored
    /// the order is returned even if the delegation request cannot be sent.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn create_order(&self, customer: CustomerRef, items: Vec<ItemId>) -> Result<Order> {
        if customer.is_empty() {
            return Err(SagaError::Validation("customer reference is empty".into()));
        }
        if items.is_empty() {
            return Err(SagaError::Validation("order has no items".into()));
        }

        if self.customers.customer(&customer).await?.is_none() {
            return Err(SagaError::CustomerNotFound(customer));
        }
        let manifest = self.resolve_manifest(&items).await?;

        let order = Order::new(customer, items);
        bounded(
            self.deadline,
            "insert order",
            self.store.insert(Order::KIND, &order),
        )
        .await?;
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order = %order.order_id, "order created");

        let request = OrderMessage::new(order.order_id)
            .with_customer(order.customer.clone())
            .with_status(OrderStatus::Processing)
            .with_items(manifest);
        if let Err(e) = self
            .producer
            .send(&self.headquarters, &DelegationMessage::Delegate(request))
            .await
        {
            tracing::error!(order = %order.order_id, error = %e, "failed to request delegation");
        }

        Ok(order)
    }

    async fn resolve_manifest(&self, items: &[ItemId]) -> Result<Vec<ManifestItem>> {
        let mut manifest = Vec::with_capacity(items.len());
        for &item in items {
            let model = self
                .catalog
                .model(item)
                .await?
                .ok_or(SagaError::ItemNotFound(item))?;
            if model.parts.is_empty() {
                return Err(SagaError::Validation(format!(
                    "item {item} has no bill of materials"
                )));
            }
            manifest.push(model.manifest_item());
        }
        Ok(manifest)
    }

    /// Returns every order, oldest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        bounded(
            self.deadline,
            "list orders",
            self.store
                .find_all(Order::KIND, &Filter::all(), ListOptions::new()),
        )
        .await
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        bounded(
            self.deadline,
            "find order",
            self.store.find_one(Order::KIND, &order_filter(order_id)),
        )
        .await
    }

    /// Mirrors a status reported by a factory; the latest report wins.
    #[tracing::instrument(skip(self, message), fields(order = %message.order_id))]
    async fn mirror_status(&self, message: OrderMessage) -> Result<()> {
        let status = message.require_status()?;

        let mut update = Map::new();
        update.insert(fields::STATUS.into(), json!(status));
        update.insert(fields::LAST_UPDATE.into(), json!(Utc::now()));
        if message.costs_of_parts > 0 {
            update.insert(fields::COSTS_OF_PARTS.into(), json!(message.costs_of_parts));
        }

        let updated = bounded(
            self.deadline,
            "update order status",
            self.store
                .update_fields(Order::KIND, &order_filter(message.order_id), update),
        )
        .await?;
        if updated == 0 {
            return Err(SagaError::OrderNotFound(message.order_id));
        }

        tracing::info!(%status, "order status mirrored");
        Ok(())
    }
}

fn order_filter(order_id: OrderId) -> Filter {
    Filter::by(fields::ORDER_ID, order_id.to_string())
}

#[async_trait]
impl Participant for OrderIntake {
    type Message = IntakeMessage;

    fn name(&self) -> &'static str {
        "order"
    }

    async fn handle(&self, message: IntakeMessage) -> Result<Handled> {
        match message {
            IntakeMessage::OrderUpdate(update) => self.mirror_status(update).await?,
            IntakeMessage::Unknown => {
                return Err(SagaError::UnexpectedMessage {
                    service: self.name(),
                });
            }
        }
        Ok(Handled::Done)
    }
}
