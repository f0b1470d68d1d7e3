use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use stockroom_core::domain::batch::{Batch, BatchId};
use stockroom_core::domain::customer::{Customer, CustomerId};
use stockroom_core::domain::discount::{DiscountRule, DiscountRuleId};
use stockroom_core::domain::order::{OrderId, OrderReceipt};
use stockroom_core::domain::scope::Scope;
use stockroom_core::domain::variant::{Variant, VariantId};
use stockroom_core::errors::FulfillmentError;

pub mod catalog;
pub mod customer;
pub mod discount;
pub mod inventory;
pub mod order;

pub use catalog::SqlCatalogRepository;
pub use customer::SqlCustomerRepository;
pub use discount::SqlDiscountRepository;
pub use inventory::{NewBatch, SqlInventoryRepository};
pub use order::SqlOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("batch {batch_id} is referenced by {order_lines} order line(s) and cannot be deleted")]
    BatchReferenced { batch_id: BatchId, order_lines: i64 },
    #[error("lot `{lot_number}` of variant {variant_id} would exceed the on-hand limit")]
    QuantityOverflow { variant_id: VariantId, lot_number: String },
}

impl From<RepositoryError> for FulfillmentError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => classify_storage_error(error),
            other => FulfillmentError::Fatal(other.to_string()),
        }
    }
}

/// Maps storage failures onto the fulfillment taxonomy. Lock waits that ran
/// out (`SQLITE_BUSY`, `SQLITE_LOCKED` and their extended codes) and pool
/// acquisition timeouts are transient; everything else is fatal.
pub fn classify_storage_error(error: sqlx::Error) -> FulfillmentError {
    match &error {
        sqlx::Error::PoolTimedOut => FulfillmentError::TransientConflict {
            detail: "timed out waiting for a database connection".to_string(),
        },
        sqlx::Error::Database(database_error) => {
            let primary_code = database_error
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| code & 0xff);
            let locked = matches!(primary_code, Some(5 | 6))
                || database_error.message().contains("database is locked");

            if locked {
                FulfillmentError::TransientConflict { detail: database_error.message().to_string() }
            } else {
                FulfillmentError::Fatal(error.to_string())
            }
        }
        _ => FulfillmentError::Fatal(error.to_string()),
    }
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_variant(&self, id: VariantId) -> Result<Option<Variant>, RepositoryError>;
    async fn list_variants(&self) -> Result<Vec<Variant>, RepositoryError>;
    async fn save_variant(&self, variant: &Variant) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;
    async fn save(&self, customer: &Customer) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait DiscountRepository: Send + Sync {
    async fn list_rules(&self) -> Result<Vec<DiscountRule>, RepositoryError>;
    async fn add_rule(
        &self,
        variant: Scope<VariantId>,
        customer: Scope<CustomerId>,
        min_quantity: u32,
        discount_percent: Decimal,
    ) -> Result<DiscountRuleId, RepositoryError>;
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn find_batch(&self, id: BatchId) -> Result<Option<Batch>, RepositoryError>;
    async fn list_batches(&self, variant: VariantId) -> Result<Vec<Batch>, RepositoryError>;
    async fn receive_batch(&self, batch: NewBatch) -> Result<Batch, RepositoryError>;
    async fn delete_batch(&self, id: BatchId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_receipt(&self, id: OrderId) -> Result<Option<OrderReceipt>, RepositoryError>;
    async fn count_orders(&self) -> Result<i64, RepositoryError>;
}

pub(crate) fn decode_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    Decimal::from_str(raw.trim())
        .map_err(|e| RepositoryError::Decode(format!("{column} `{raw}` is not a decimal: {e}")))
}

pub(crate) fn decode_count(row: &SqliteRow, column: &str) -> Result<u32, RepositoryError> {
    let raw: i64 = row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    u32::try_from(raw)
        .map_err(|_| RepositoryError::Decode(format!("{column} `{raw}` is out of range")))
}

pub(crate) fn decode_date(row: &SqliteRow, column: &str) -> Result<NaiveDate, RepositoryError> {
    let raw: String = row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("{column} `{raw}` is not a date: {e}")))
}

pub(crate) fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn get_i64(row: &SqliteRow, column: &str) -> Result<i64, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn get_string(row: &SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}
