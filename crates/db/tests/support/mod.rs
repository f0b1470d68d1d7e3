#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;

use stockroom_core::domain::batch::{Batch, BatchId};
use stockroom_core::domain::customer::{Customer, CustomerId};
use stockroom_core::domain::variant::{Variant, VariantId};
use stockroom_db::repositories::{
    CatalogRepository, CustomerRepository, InventoryRepository, NewBatch, SqlCatalogRepository,
    SqlCustomerRepository, SqlInventoryRepository,
};
use stockroom_db::{connect_with_settings, migrations, DbPool};

pub const BUYER: CustomerId = CustomerId(1);
pub const OTHER_BUYER: CustomerId = CustomerId(2);

pub async fn memory_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30, 1_000)
        .await
        .expect("connect to in-memory database");
    prepare(&pool).await;
    pool
}

/// One connection, and `acquire` gives up after a second.
pub async fn single_connection_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 1, 1_000)
        .await
        .expect("connect to in-memory database");
    prepare(&pool).await;
    pool
}

/// File-backed pool so several connections share one database.
pub async fn file_pool(dir: &tempfile::TempDir, lock_timeout_ms: u64) -> DbPool {
    let url = format!("sqlite://{}", dir.path().join("stockroom.db").display());
    let pool = connect_with_settings(&url, 8, 30, lock_timeout_ms)
        .await
        .expect("connect to file database");
    prepare(&pool).await;
    pool
}

async fn prepare(pool: &DbPool) {
    migrations::run_pending(pool).await.expect("run migrations");
    let customers = SqlCustomerRepository::new(pool.clone());
    for (id, name) in [(BUYER, "Northside Pharmacy"), (OTHER_BUYER, "St. Mary Hospital")] {
        customers
            .save(&Customer { id, name: name.to_string(), customer_type: "pharmacy".to_string() })
            .await
            .expect("save customer");
    }
}

pub async fn add_variant(pool: &DbPool, id: i64, base_price: Decimal) -> VariantId {
    let variant = Variant {
        id: VariantId(id),
        sku: format!("SKU-{id}"),
        name: format!("Variant {id}"),
        base_price,
        unit_label: "box".to_string(),
    };
    SqlCatalogRepository::new(pool.clone()).save_variant(&variant).await.expect("save variant");
    variant.id
}

pub async fn add_batch(
    pool: &DbPool,
    variant: VariantId,
    lot: &str,
    expiry: &str,
    quantity: u32,
) -> BatchId {
    SqlInventoryRepository::new(pool.clone())
        .receive_batch(NewBatch {
            variant_id: variant,
            lot_number: lot.to_string(),
            expiry_date: NaiveDate::parse_from_str(expiry, "%Y-%m-%d").expect("expiry date"),
            quantity,
            unit_cost: Decimal::new(100, 2),
        })
        .await
        .expect("receive batch")
        .id
}

pub async fn batch(pool: &DbPool, id: BatchId) -> Batch {
    SqlInventoryRepository::new(pool.clone())
        .find_batch(id)
        .await
        .expect("find batch")
        .expect("batch exists")
}

pub async fn on_hand(pool: &DbPool, variant: VariantId) -> u64 {
    SqlInventoryRepository::new(pool.clone())
        .list_batches(variant)
        .await
        .expect("list batches")
        .iter()
        .map(|batch| u64::from(batch.quantity_on_hand))
        .sum()
}

pub fn price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
