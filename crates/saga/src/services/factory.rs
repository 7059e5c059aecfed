//! Factory Orchestrator: drives the orders routed to one site.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, SiteId};
use document_store::{Aggregation, DocumentStoreExt, Filter};
use domain::order::fields;
use domain::{FactoryOrder, FactoryStage, OrderStatus, Record, StageTransition};
use serde_json::{Map, json};

use crate::deadline::bounded;
use crate::error::SagaError;
use crate::lookup::SharedStore;
use crate::messages::{
    AssemblyMessage, DelegationMessage, FactoryMessage, IntakeMessage, KpiChannelMessage,
    KpiMessage, OrderMessage, PartsMessage, ShippingMessage,
};
use crate::producer::Producer;
use crate::runtime::{Handled, Participant};
use crate::Result;

/// Orchestrator of one production site.
pub struct Factory {
    site: SiteId,
    headquarters: SiteId,
    store: SharedStore,
    producer: Producer,
    deadline: Duration,
}

impl Factory {
    pub fn new(
        site: SiteId,
        headquarters: SiteId,
        store: SharedStore,
        producer: Producer,
        deadline: Duration,
    ) -> Self {
        Self {
            site,
            headquarters,
            store,
            producer,
            deadline,
        }
    }

    /// Returns the local record of an order.
    pub async fn order(&self, order_id: OrderId) -> Result<Option<FactoryOrder>> {
        bounded(
            self.deadline,
            "find factory order",
            self.store
                .find_one(FactoryOrder::KIND, &order_filter(order_id)),
        )
        .await
    }

    /// Creates the local record of a routed order and orders its parts.
    #[tracing::instrument(skip(self, routed), fields(site = %self.site, order = %routed.order_id))]
    async fn accept(&self, routed: OrderMessage) -> Result<()> {
        if let Some(existing) = self.order(routed.order_id).await? {
            if existing.stage == FactoryStage::WaitingForParts {
                tracing::info!("routed order replayed, ordering parts again");
                return self.order_parts(&existing).await;
            }
            tracing::info!(stage = %existing.stage, "routed order replayed, dropped");
            return Ok(());
        }

        let customer = routed.customer.ok_or(SagaError::MissingField("customer"))?;
        let order = FactoryOrder::routed(routed.order_id, customer, routed.items);
        bounded(
            self.deadline,
            "insert factory order",
            self.store.insert(FactoryOrder::KIND, &order),
        )
        .await?;
        tracing::info!("order accepted");

        self.order_parts(&order).await
    }

    /// Applies a status event to the local stage machine.
    #[tracing::instrument(skip(self, update), fields(site = %self.site, order = %update.order_id))]
    async fn advance(&self, update: OrderMessage) -> Result<()> {
        let status = update.require_status()?;
        let mut order = self
            .order(update.order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(update.order_id))?;

        match order.stage.apply(status) {
            StageTransition::Advance { from, to } => {
                if to == FactoryStage::Production {
                    order.costs_of_parts = update.costs_of_parts;
                }
                order.stage = to;
                self.persist_stage(&order).await?;

                metrics::counter!("factory_transitions_total", "status" => to.as_str())
                    .increment(1);
                tracing::info!(%from, %to, "order advanced");
                self.request_next_step(&order).await
            }
            StageTransition::Duplicate(FactoryStage::Shipped) => {
                tracing::info!("duplicate shipment report dropped");
                Ok(())
            }
            StageTransition::Duplicate(stage) => {
                tracing::info!(%stage, "duplicate status, requesting next step again");
                self.request_next_step(&order).await
            }
            StageTransition::OutOfOrder { current, requested } => {
                metrics::counter!("factory_transitions_rejected_total").increment(1);
                tracing::warn!(%current, %requested, "out-of-order status rejected");
                Ok(())
            }
            StageTransition::NotAStageEvent => {
                metrics::counter!("factory_transitions_rejected_total").increment(1);
                tracing::warn!(%status, "status does not drive the factory, dropped");
                Ok(())
            }
        }
    }

    async fn persist_stage(&self, order: &FactoryOrder) -> Result<()> {
        let mut update = Map::new();
        update.insert(fields::STATUS.into(), json!(order.stage));
        update.insert(fields::LAST_UPDATE.into(), json!(Utc::now()));
        if order.stage == FactoryStage::Production {
            update.insert(fields::COSTS_OF_PARTS.into(), json!(order.costs_of_parts));
        }

        let updated = bounded(
            self.deadline,
            "update factory order",
            self.store
                .update_fields(FactoryOrder::KIND, &order_filter(order.order_id), update),
        )
        .await?;
        if updated == 0 {
            return Err(SagaError::OrderNotFound(order.order_id));
        }
        Ok(())
    }

    /// Publishes the request that follows the order's current stage.
    async fn request_next_step(&self, order: &FactoryOrder) -> Result<()> {
        match order.stage {
            FactoryStage::WaitingForParts => self.order_parts(order).await,
            FactoryStage::Production => {
                let request = self.message(order).with_items(order.items.clone());
                self.producer
                    .send(&self.site, &AssemblyMessage::Assemble(request))
                    .await
            }
            FactoryStage::Complete => {
                let request = self.message(order).with_customer(order.customer.clone());
                self.producer
                    .send(&self.site, &ShippingMessage::Ship(request))
                    .await
            }
            FactoryStage::Shipped => {
                let release = OrderMessage::new(order.order_id)
                    .with_status(OrderStatus::Complete)
                    .with_location(self.site.clone());
                self.producer
                    .send(&self.headquarters, &DelegationMessage::OrderUpdate(release))
                    .await?;

                let mirror = self.message(order).with_costs(order.costs_of_parts);
                self.producer
                    .send(&self.headquarters, &IntakeMessage::OrderUpdate(mirror))
                    .await
            }
        }
    }

    async fn order_parts(&self, order: &FactoryOrder) -> Result<()> {
        let request = self.message(order).with_items(order.items.clone());
        self.producer
            .send(&self.site, &PartsMessage::OrderParts(request))
            .await
    }

    /// A status message about `order` originating from this site.
    fn message(&self, order: &FactoryOrder) -> OrderMessage {
        OrderMessage::new(order.order_id)
            .with_status(order.stage.status())
            .with_location(self.site.clone())
    }

    /// Aggregates the local orders and reports them to the KPI Aggregator.
    #[tracing::instrument(skip(self), fields(site = %self.site))]
    async fn report_kpi(&self) -> Result<()> {
        let aggregation = Aggregation::new()
            .count_where(fields::STATUS, FactoryStage::Shipped.as_str())
            .sum_of(fields::COSTS_OF_PARTS);
        let rows = bounded(
            self.deadline,
            "aggregate factory orders",
            self.store.aggregate(FactoryOrder::KIND, &aggregation),
        )
        .await?;
        let row = rows.into_iter().next().unwrap_or_default();

        let completed = row.matching;
        let report = KpiMessage {
            timestamp: Utc::now(),
            location: self.site.clone(),
            incomplete_orders: row.total.saturating_sub(completed),
            completed_orders: completed,
            total: row.total,
            costs_of_parts: row.sum,
        };
        self.producer
            .send(&self.headquarters, &KpiChannelMessage::KpiUpdate(report))
            .await?;
        tracing::debug!(total = row.total, completed, "kpi reported");
        Ok(())
    }
}

fn order_filter(order_id: OrderId) -> Filter {
    Filter::by(fields::ORDER_ID, order_id.to_string())
}

#[async_trait]
impl Participant for Factory {
    type Message = FactoryMessage;

    fn name(&self) -> &'static str {
        "factory"
    }

    async fn handle(&self, message: FactoryMessage) -> Result<Handled> {
        match message {
            FactoryMessage::Routed(routed) => self.accept(routed).await?,
            FactoryMessage::OrderUpdate(update) => self.advance(update).await?,
            FactoryMessage::KpiRequest(_) => self.report_kpi().await?,
            FactoryMessage::Unknown => {
                return Err(SagaError::UnexpectedMessage {
                    service: self.name(),
                });
            }
        }
        Ok(Handled::Done)
    }
}
