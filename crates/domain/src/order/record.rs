//! The two physical order records.
//!
//! Order Intake owns an [`Order`]; the factory that the order was routed to
//! owns a [`FactoryOrder`]. They are never merged: each is created and
//! mutated only by its owning service in reaction to saga messages.

use chrono::{DateTime, Utc};
use common::{CustomerRef, ItemId, OrderId};
use serde::{Deserialize, Serialize};

use super::{FactoryStage, OrderStatus};
use crate::{ManifestItem, Record};

/// Field names shared by both order records, for store filters.
pub mod fields {
    pub const ORDER_ID: &str = "orderID";
    pub const STATUS: &str = "status";
    pub const LAST_UPDATE: &str = "lastUpdate";
    pub const COSTS_OF_PARTS: &str = "costsOfParts";
}

/// The order as held by Order Intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "orderID")]
    pub order_id: OrderId,
    pub created: DateTime<Utc>,
    pub customer: CustomerRef,
    pub status: OrderStatus,
    pub items: Vec<ItemId>,
    #[serde(rename = "lastUpdate")]
    pub last_update: DateTime<Utc>,
    #[serde(rename = "costsOfParts", default)]
    pub costs_of_parts: u64,
}

impl Order {
    /// Creates a freshly accepted order in `processing`.
    pub fn new(customer: CustomerRef, items: Vec<ItemId>) -> Self {
        let now = Utc::now();
        Self {
            order_id: OrderId::new(),
            created: now,
            customer,
            status: OrderStatus::Processing,
            items,
            last_update: now,
            costs_of_parts: 0,
        }
    }
}

impl Record for Order {
    const KIND: &'static str = "orders";
}

/// The order as held by the factory it was routed to.
///
/// Keeps the item manifest so later stages can be requested without
/// asking the catalog again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryOrder {
    #[serde(rename = "orderID")]
    pub order_id: OrderId,
    pub created: DateTime<Utc>,
    pub customer: CustomerRef,
    #[serde(rename = "status")]
    pub stage: FactoryStage,
    pub items: Vec<ManifestItem>,
    #[serde(rename = "lastUpdate")]
    pub last_update: DateTime<Utc>,
    #[serde(rename = "costsOfParts", default)]
    pub costs_of_parts: u64,
}

impl FactoryOrder {
    /// Creates the local record for a routed order.
    pub fn routed(order_id: OrderId, customer: CustomerRef, items: Vec<ManifestItem>) -> Self {
        let now = Utc::now();
        Self {
            order_id,
            created: now,
            customer,
            stage: FactoryStage::WaitingForParts,
            items,
            last_update: now,
            costs_of_parts: 0,
        }
    }
}

impl Record for FactoryOrder {
    const KIND: &'static str = "orders";
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::PartId;

    #[test]
    fn test_new_order_starts_processing() {
        let order = Order::new(CustomerRef::from("c-1"), vec![ItemId::new(1)]);
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.created, order.last_update);
        assert_eq!(order.costs_of_parts, 0);
    }

    #[test]
    fn test_order_field_names_match_store_filters() {
        let order = Order::new(CustomerRef::from("c-1"), vec![ItemId::new(1)]);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json[fields::ORDER_ID], order.order_id.to_string());
        assert_eq!(json[fields::STATUS], "processing");
        assert!(json.get(fields::LAST_UPDATE).is_some());
        assert_eq!(json[fields::COSTS_OF_PARTS], 0);
    }

    #[test]
    fn test_factory_order_stores_stage_as_status() {
        let order = FactoryOrder::routed(
            OrderId::new(),
            CustomerRef::from("c-1"),
            vec![ManifestItem {
                item_id: ItemId::new(1),
                parts: vec![PartId::new(1)],
                assembly_time: 10,
            }],
        );
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json[fields::STATUS], "waitingForParts");

        let back: FactoryOrder = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_missing_costs_default_to_zero() {
        let json = serde_json::json!({
            "orderID": OrderId::new(),
            "created": Utc::now(),
            "customer": "c-1",
            "status": "shipped",
            "items": [1, 2],
            "lastUpdate": Utc::now(),
        });
        let order: Order = serde_json::from_value(json).unwrap();
        assert_eq!(order.costs_of_parts, 0);
        assert_eq!(order.status, OrderStatus::Shipped);
    }
}
