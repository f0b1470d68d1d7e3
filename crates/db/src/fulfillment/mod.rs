//! Stock fulfillment against shared storage.
//!
//! Every write path runs inside one `BEGIN IMMEDIATE` transaction, so writers
//! are serialized by the storage engine and each batch row is additionally
//! locked before its quantity is read. Transactions are handed down as
//! explicit `&mut SqliteConnection` arguments. A transient conflict replays the
//! whole unit of work from a fresh transaction; nothing read in a failed
//! attempt is carried into the next one.

mod allocator;
mod line;
mod price_list;

use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tracing::{info, warn};

use stockroom_core::config::FulfillmentConfig;
use stockroom_core::domain::batch::BatchId;
use stockroom_core::domain::cart::{normalize_cart, CartLine, CheckoutLine};
use stockroom_core::domain::customer::CustomerId;
use stockroom_core::domain::order::{OrderId, OrderReceipt};
use stockroom_core::domain::quantity::Quantity;
use stockroom_core::domain::variant::VariantId;
use stockroom_core::errors::{EntityKind, FulfillmentError};
use stockroom_core::retry::{run_with_conflict_retry, RetryPolicy};

use crate::repositories::catalog::find_variant;
use crate::repositories::customer::find_customer;
use crate::repositories::order::{insert_order, load_receipt};
use crate::repositories::{classify_storage_error, InventoryRepository, SqlInventoryRepository};
use crate::DbPool;

pub use price_list::PriceListEntry;

#[derive(Clone)]
pub struct FulfillmentService {
    pool: DbPool,
    retry: RetryPolicy,
}

impl FulfillmentService {
    pub fn new(pool: DbPool) -> Self {
        Self::with_retry_policy(pool, RetryPolicy::default())
    }

    pub fn with_retry_policy(pool: DbPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    pub fn from_config(pool: DbPool, config: &FulfillmentConfig) -> Self {
        Self::with_retry_policy(pool, config.retry_policy())
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Turns a cart into one `pending` order, all lines or none.
    ///
    /// Lines naming the same variant are merged and the cart is fulfilled in
    /// ascending variant order. Quantity, customer and variant problems are
    /// reported before a write transaction is opened. The existence checks run
    /// inside every attempt, so a pool timeout there is replayed as well.
    pub async fn checkout(
        &self,
        customer: CustomerId,
        cart: &[CartLine],
    ) -> Result<OrderReceipt, FulfillmentError> {
        let lines = normalize_cart(cart)?;
        let lines = lines.as_slice();
        let outcome = run_with_conflict_retry(self.retry, "checkout", move |attempt| {
            self.checkout_attempt(customer, lines, attempt)
        })
        .await;
        report("checkout", customer, &outcome);
        outcome
    }

    /// Single-line order through the same FEFO path as a one-line cart.
    pub async fn place_line_order(
        &self,
        customer: CustomerId,
        variant: VariantId,
        quantity: i64,
    ) -> Result<OrderReceipt, FulfillmentError> {
        let quantity = Quantity::new(quantity)?;
        let lines = [CheckoutLine { variant_id: variant, quantity }];
        let lines = lines.as_slice();
        let outcome = run_with_conflict_retry(self.retry, "line_order", move |attempt| {
            self.checkout_attempt(customer, lines, attempt)
        })
        .await;
        report("line_order", customer, &outcome);
        outcome
    }

    /// Sells from one named batch. The batch is not substituted when short.
    pub async fn place_batch_order(
        &self,
        customer: CustomerId,
        batch: BatchId,
        quantity: i64,
    ) -> Result<OrderReceipt, FulfillmentError> {
        let quantity = Quantity::new(quantity)?;
        let outcome = run_with_conflict_retry(self.retry, "batch_order", move |attempt| {
            self.batch_order_attempt(customer, batch, quantity, attempt)
        })
        .await;
        report("batch_order", customer, &outcome);
        outcome
    }

    pub async fn find_order(&self, order: OrderId) -> Result<OrderReceipt, FulfillmentError> {
        let mut conn = self.pool.acquire().await.map_err(classify_storage_error)?;
        load_receipt(&mut conn, order)
            .await?
            .ok_or_else(|| FulfillmentError::not_found(EntityKind::Order, order))
    }

    /// Catalog prices for `customer` (or list-wide rules only when `None`) at
    /// an assumed order quantity, with current stock per variant.
    pub async fn price_list(
        &self,
        customer: Option<CustomerId>,
        quantity: i64,
    ) -> Result<Vec<PriceListEntry>, FulfillmentError> {
        let quantity = price_list::assumed_quantity(quantity)?;
        if let Some(customer) = customer {
            self.ensure_customer(customer).await?;
        }
        let mut conn = self.pool.acquire().await.map_err(classify_storage_error)?;
        price_list::build_price_list(&mut conn, customer, quantity).await
    }

    async fn checkout_attempt(
        &self,
        customer: CustomerId,
        lines: &[CheckoutLine],
        attempt: u32,
    ) -> Result<OrderReceipt, FulfillmentError> {
        self.ensure_customer(customer).await?;
        for cart_line in lines {
            self.ensure_variant(cart_line.variant_id).await?;
        }
        let mut tx = begin_write(&self.pool).await?;

        let outcome = async {
            let order = insert_order(&mut tx, customer, Utc::now()).await?;
            let mut written = Vec::new();
            for cart_line in lines {
                let fulfilled =
                    line::fulfill_line(&mut tx, &order, cart_line.variant_id, cart_line.quantity)
                        .await?;
                written.extend(fulfilled);
            }
            Ok::<_, FulfillmentError>(OrderReceipt::new(order, written))
        }
        .await;

        finish(tx, outcome, attempt).await
    }

    async fn batch_order_attempt(
        &self,
        customer: CustomerId,
        batch: BatchId,
        quantity: Quantity,
        attempt: u32,
    ) -> Result<OrderReceipt, FulfillmentError> {
        self.ensure_customer(customer).await?;
        self.ensure_batch(batch).await?;
        let mut tx = begin_write(&self.pool).await?;

        let outcome = async {
            let order = insert_order(&mut tx, customer, Utc::now()).await?;
            let line = line::fulfill_from_batch(&mut tx, &order, batch, quantity).await?;
            Ok::<_, FulfillmentError>(OrderReceipt::new(order, vec![line]))
        }
        .await;

        finish(tx, outcome, attempt).await
    }

    async fn ensure_customer(&self, customer: CustomerId) -> Result<(), FulfillmentError> {
        let mut conn = self.pool.acquire().await.map_err(classify_storage_error)?;
        match find_customer(&mut conn, customer).await? {
            Some(_) => Ok(()),
            None => Err(FulfillmentError::not_found(EntityKind::Customer, customer)),
        }
    }

    async fn ensure_variant(&self, variant: VariantId) -> Result<(), FulfillmentError> {
        let mut conn = self.pool.acquire().await.map_err(classify_storage_error)?;
        match find_variant(&mut conn, variant).await? {
            Some(_) => Ok(()),
            None => Err(FulfillmentError::not_found(EntityKind::Variant, variant)),
        }
    }

    async fn ensure_batch(&self, batch: BatchId) -> Result<(), FulfillmentError> {
        match SqlInventoryRepository::new(self.pool.clone()).find_batch(batch).await? {
            Some(_) => Ok(()),
            None => Err(FulfillmentError::not_found(EntityKind::Batch, batch)),
        }
    }
}

/// Opens a write transaction that holds SQLite's reserved lock from the first
/// statement. Waiting past the busy timeout surfaces as a transient conflict.
async fn begin_write(pool: &DbPool) -> Result<Transaction<'static, Sqlite>, FulfillmentError> {
    pool.begin_with("BEGIN IMMEDIATE").await.map_err(classify_storage_error)
}

async fn finish<T>(
    tx: Transaction<'static, Sqlite>,
    outcome: Result<T, FulfillmentError>,
    attempt: u32,
) -> Result<T, FulfillmentError> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(classify_storage_error)?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                warn!(
                    event_name = "fulfillment.transaction.rollback_failed",
                    attempt,
                    error = %rollback_error,
                    "explicit rollback failed; connection is discarded"
                );
            }
            Err(error)
        }
    }
}

fn report(
    operation: &'static str,
    customer: CustomerId,
    outcome: &Result<OrderReceipt, FulfillmentError>,
) {
    match outcome {
        Ok(receipt) => info!(
            event_name = "fulfillment.order.committed",
            operation,
            customer_id = %customer,
            order_id = %receipt.order.id,
            order_lines = receipt.lines.len(),
            units = receipt.total_units(),
            grand_total = %receipt.grand_total,
            "order committed"
        ),
        Err(error) => warn!(
            event_name = "fulfillment.order.rejected",
            operation,
            customer_id = %customer,
            error_class = error.error_class(),
            error = %error,
            "order rejected; nothing was written"
        ),
    }
}
