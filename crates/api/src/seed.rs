//! Demo catalog and customer loaded at startup.

use document_store::{DocumentStore, DocumentStoreExt, Filter, Result};
use domain::{Address, Customer, Model, Part, Record};
use serde::Serialize;

/// Customer that the demo catalog is ordered by.
pub const DEMO_CUSTOMER: &str = "demo";

pub fn parts() -> Vec<Part> {
    vec![
        Part::new(1, 139),
        Part::new(2, 53),
        Part::new(3, 18),
        Part::new(4, 223),
        Part::new(5, 140),
        Part::new(6, 98),
    ]
}

pub fn models() -> Vec<Model> {
    vec![
        Model::new(1, "UltraCool9000", 10, &[1, 3, 6]),
        Model::new(2, "IcyX", 7, &[1, 2, 5, 2, 4]),
        Model::new(3, "Chiller", 15, &[1, 3, 3, 2, 4]),
        Model::new(4, "CoolBoy", 8, &[1, 3, 5, 6]),
    ]
}

pub fn demo_customer() -> Customer {
    let address = Address {
        country: "United Kingdom".into(),
        city: "London".into(),
        zip_code: "EC1A 1BB".into(),
        address: "1 Fridge Lane".into(),
    };
    Customer::new(DEMO_CUSTOMER, "Demo", "Customer", address)
}

/// Loads the demo parts and models into the catalog store.
///
/// Records that already exist are left untouched, so restarting against a
/// persistent store keeps updated part prices.
pub async fn seed_catalog(catalog: &dyn DocumentStore) -> Result<usize> {
    let mut inserted = 0;
    for part in parts() {
        inserted += insert_missing(catalog, Part::KIND, part.id.value(), &part).await?;
    }
    for model in models() {
        inserted += insert_missing(catalog, Model::KIND, model.id.value(), &model).await?;
    }
    Ok(inserted)
}

/// Loads the demo customer into the customer directory.
pub async fn seed_customers(directory: &dyn DocumentStore) -> Result<usize> {
    let customer = demo_customer();
    let exists = directory
        .find(Customer::KIND, &Filter::by("id", customer.id.as_str()))
        .await?
        .is_some();
    if exists {
        return Ok(0);
    }
    directory.insert(Customer::KIND, &customer).await?;
    Ok(1)
}

async fn insert_missing<T>(
    store: &dyn DocumentStore,
    kind: &str,
    id: u32,
    record: &T,
) -> Result<usize>
where
    T: Serialize + Sync,
{
    if store.find(kind, &Filter::by("id", id)).await?.is_some() {
        return Ok(0);
    }
    store.insert(kind, record).await?;
    Ok(1)
}
