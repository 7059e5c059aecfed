//! Catalog and customer records.
//!
//! These are owned by the catalog and customer directories; the saga only
//! reads them (and Parts Sourcing updates part prices).

use chrono::{DateTime, Utc};
use common::{CustomerRef, ItemId, PartId};
use serde::{Deserialize, Serialize};

use crate::Record;

/// One ordered item together with its bill of materials.
///
/// This is the manifest entry Order Intake resolves from the catalog and
/// that travels with `delegate`/`neworder`/`orderpart` messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestItem {
    #[serde(rename = "item")]
    pub item_id: ItemId,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<PartId>,

    /// Base assembly time in catalog units.
    #[serde(rename = "assemblytime", default, skip_serializing_if = "is_zero")]
    pub assembly_time: u32,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// A fridge model that customers can order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: ItemId,
    pub name: String,
    #[serde(rename = "assemblytime")]
    pub assembly_time: u32,
    pub parts: Vec<PartId>,
}

impl Model {
    pub fn new(id: u32, name: impl Into<String>, assembly_time: u32, parts: &[u32]) -> Self {
        Self {
            id: ItemId::new(id),
            name: name.into(),
            assembly_time,
            parts: parts.iter().copied().map(PartId::new).collect(),
        }
    }

    /// Returns the manifest entry for ordering one of this model.
    pub fn manifest_item(&self) -> ManifestItem {
        ManifestItem {
            item_id: self.id,
            parts: self.parts.clone(),
            assembly_time: self.assembly_time,
        }
    }
}

impl Record for Model {
    const KIND: &'static str = "models";
}

/// A component part with its current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub price: u64,
}

impl Part {
    pub fn new(id: u32, price: u64) -> Self {
        Self {
            id: PartId::new(id),
            price,
        }
    }
}

impl Record for Part {
    const KIND: &'static str = "parts";
}

/// Postal address of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub country: String,
    pub city: String,
    #[serde(rename = "zipCode")]
    pub zip_code: String,
    pub address: String,
}

/// A customer, including the shipping profile used by Shipping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerRef,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    #[serde(default)]
    pub address: Address,
    pub created: DateTime<Utc>,
}

impl Customer {
    pub fn new(
        id: impl Into<CustomerRef>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        address: Address,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            address,
            created: Utc::now(),
        }
    }
}

impl Record for Customer {
    const KIND: &'static str = "customers";
}
