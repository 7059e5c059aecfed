//! Lookups into records owned by other services.
//!
//! The saga reads customers, catalog entries and intake orders only through
//! these traits. The store-backed implementations read a store that the
//! owning directory service populates.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{CustomerRef, ItemId, OrderId, PartId};
use document_store::{DocumentStore, DocumentStoreExt, Filter};
use domain::order::fields;
use domain::{Customer, Model, Order, Part, Record};
use serde_json::json;

use crate::Result;
use crate::deadline::bounded;

/// A document store shared by the components of one service.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Existence and profile lookup for customers.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn customer(&self, id: &CustomerRef) -> Result<Option<Customer>>;
}

/// Models and parts with their current prices.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn model(&self, id: ItemId) -> Result<Option<Model>>;

    async fn part(&self, id: PartId) -> Result<Option<Part>>;

    /// Sets the price of a part. Returns false if the part is unknown.
    async fn set_part_price(&self, id: PartId, price: u64) -> Result<bool>;
}

/// Read access to Order Intake's records.
#[async_trait]
pub trait OrderLookup: Send + Sync {
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;
}

/// Customer directory backed by a document store.
#[derive(Clone)]
pub struct StoreCustomerDirectory {
    store: SharedStore,
    deadline: Duration,
}

impl StoreCustomerDirectory {
    pub fn new(store: SharedStore, deadline: Duration) -> Self {
        Self { store, deadline }
    }
}

#[async_trait]
impl CustomerDirectory for StoreCustomerDirectory {
    async fn customer(&self, id: &CustomerRef) -> Result<Option<Customer>> {
        bounded(
            self.deadline,
            "find customer",
            self.store
                .find_one(Customer::KIND, &Filter::by("id", id.as_str())),
        )
        .await
    }
}

/// Catalog backed by a document store.
#[derive(Clone)]
pub struct StoreCatalog {
    store: SharedStore,
    deadline: Duration,
}

impl StoreCatalog {
    pub fn new(store: SharedStore, deadline: Duration) -> Self {
        Self { store, deadline }
    }
}

#[async_trait]
impl Catalog for StoreCatalog {
    async fn model(&self, id: ItemId) -> Result<Option<Model>> {
        bounded(
            self.deadline,
            "find model",
            self.store
                .find_one(Model::KIND, &Filter::by("id", id.value())),
        )
        .await
    }

    async fn part(&self, id: PartId) -> Result<Option<Part>> {
        bounded(
            self.deadline,
            "find part",
            self.store
                .find_one(Part::KIND, &Filter::by("id", id.value())),
        )
        .await
    }

    async fn set_part_price(&self, id: PartId, price: u64) -> Result<bool> {
        let updated = bounded(
            self.deadline,
            "update part price",
            self.store.set_field(
                Part::KIND,
                &Filter::by("id", id.value()),
                "price",
                json!(price),
            ),
        )
        .await?;
        Ok(updated > 0)
    }
}

/// Order lookup backed by Order Intake's store.
#[derive(Clone)]
pub struct StoreOrderLookup {
    store: SharedStore,
    deadline: Duration,
}

impl StoreOrderLookup {
    pub fn new(store: SharedStore, deadline: Duration) -> Self {
        Self { store, deadline }
    }
}

#[async_trait]
impl OrderLookup for StoreOrderLookup {
    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        bounded(
            self.deadline,
            "find order",
            self.store
                .find_one(Order::KIND, &Filter::by(fields::ORDER_ID, id.to_string())),
        )
        .await
    }
}
