//! Wire messages.
//!
//! Every channel has its own closed set of messages, discriminated by the
//! `type` field. Payloads are plain JSON; empty fields are left out.
//! Decoding always produces an owned copy, nothing on the wire refers to
//! another service's records.

use chrono::{DateTime, Utc};
use common::{CustomerRef, OrderId, PartId, SiteId};
use domain::{ManifestItem, OrderStatus};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::SagaError;
use crate::topology::Channel;

/// An order state transition as exchanged between services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMessage {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "order")]
    pub order_id: OrderId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SiteId>,

    /// Only populated on the messages that start an order's journey.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ManifestItem>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub costs_of_parts: u64,
}

impl OrderMessage {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            timestamp: Utc::now(),
            order_id,
            customer: None,
            status: None,
            location: None,
            items: Vec::new(),
            costs_of_parts: 0,
        }
    }

    pub fn with_customer(mut self, customer: CustomerRef) -> Self {
        self.customer = Some(customer);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_location(mut self, location: SiteId) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_items(mut self, items: Vec<ManifestItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_costs(mut self, costs_of_parts: u64) -> Self {
        self.costs_of_parts = costs_of_parts;
        self
    }

    /// Returns the message with a fresh timestamp.
    pub fn restamped(mut self) -> Self {
        self.timestamp = Utc::now();
        self
    }

    pub fn require_status(&self) -> Result<&OrderStatus, SagaError> {
        self.status.as_ref().ok_or(SagaError::MissingField("status"))
    }
}

/// Aggregated metrics reported by a factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiMessage {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub location: SiteId,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub incomplete_orders: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub completed_orders: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub costs_of_parts: u64,
}

/// Request for a factory to report its metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiRequest {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl KpiRequest {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }
}

/// A catalog price change for one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartMessage {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub part: PartId,
    #[serde(default)]
    pub price: u64,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// A message type that belongs to exactly one inbound channel.
pub trait ChannelMessage: Serialize + DeserializeOwned + Send + 'static {
    /// The channel this message is routed to.
    const CHANNEL: Channel;
}

/// Messages consumed by Delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DelegationMessage {
    /// A new order that still needs a site.
    #[serde(rename = "delegate")]
    Delegate(OrderMessage),

    /// A site reports an order as done.
    #[serde(rename = "orderupdate")]
    OrderUpdate(OrderMessage),

    #[serde(other)]
    Unknown,
}

impl ChannelMessage for DelegationMessage {
    const CHANNEL: Channel = Channel::Delegation;
}

/// Messages consumed by a Factory Orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FactoryMessage {
    /// An order that Delegation routed to this site.
    #[serde(rename = "neworder")]
    Routed(OrderMessage),

    /// A step of this site reports progress.
    #[serde(rename = "orderupdate")]
    OrderUpdate(OrderMessage),

    /// The KPI Aggregator asks for metrics.
    #[serde(rename = "requestkpi")]
    KpiRequest(KpiRequest),

    #[serde(other)]
    Unknown,
}

impl ChannelMessage for FactoryMessage {
    const CHANNEL: Channel = Channel::Factory;
}

/// Messages consumed by Parts Sourcing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PartsMessage {
    /// Source every part of an order's items.
    #[serde(rename = "orderpart")]
    OrderParts(OrderMessage),

    /// Change the price of a part.
    #[serde(rename = "updatepart")]
    UpdatePart(PartMessage),

    #[serde(other)]
    Unknown,
}

impl ChannelMessage for PartsMessage {
    const CHANNEL: Channel = Channel::Part;
}

/// Messages consumed by Assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AssemblyMessage {
    /// Parts are in, assemble the order's items.
    #[serde(rename = "orderupdate")]
    Assemble(OrderMessage),

    #[serde(other)]
    Unknown,
}

impl ChannelMessage for AssemblyMessage {
    const CHANNEL: Channel = Channel::Assembly;
}

/// Messages consumed by Shipping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShippingMessage {
    /// Assembly is done, ship the order.
    #[serde(rename = "orderupdate")]
    Ship(OrderMessage),

    #[serde(other)]
    Unknown,
}

impl ChannelMessage for ShippingMessage {
    const CHANNEL: Channel = Channel::Shipping;
}

/// Messages consumed by Order Intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IntakeMessage {
    /// Status mirror update from the factory.
    #[serde(rename = "orderupdate")]
    OrderUpdate(OrderMessage),

    #[serde(other)]
    Unknown,
}

impl ChannelMessage for IntakeMessage {
    const CHANNEL: Channel = Channel::Order;
}

/// Messages consumed by the KPI Aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KpiChannelMessage {
    /// A factory's metrics.
    #[serde(rename = "kpiupdate")]
    KpiUpdate(KpiMessage),

    #[serde(other)]
    Unknown,
}

impl ChannelMessage for KpiChannelMessage {
    const CHANNEL: Channel = Channel::Kpi;
}

/// Encodes a message for the bus.
pub fn encode<M: ChannelMessage>(message: &M) -> Result<Vec<u8>, SagaError> {
    serde_json::to_vec(message).map_err(SagaError::Encode)
}

/// Decodes a message received from the bus.
pub fn decode<M: ChannelMessage>(body: &[u8]) -> Result<M, SagaError> {
    serde_json::from_slice(body).map_err(SagaError::Decode)
}
