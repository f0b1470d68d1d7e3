use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use stockroom_core::domain::batch::{Batch, BatchId};
use stockroom_core::domain::variant::VariantId;

use super::{
    decode_count, decode_date, decode_decimal, encode_date, get_i64, get_string,
    InventoryRepository, RepositoryError,
};
use crate::DbPool;

const BATCH_COLUMNS: &str =
    "batch_id, variant_id, lot_number, expiry_date, quantity_on_hand, unit_cost";

/// Goods received into stock. An existing `(variant, lot)` is topped up, as
/// long as the new on-hand total still fits in a `u32`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBatch {
    pub variant_id: VariantId,
    pub lot_number: String,
    pub expiry_date: NaiveDate,
    pub quantity: u32,
    pub unit_cost: Decimal,
}

/// Batches of `variant` with stock, soonest expiry first, ties by batch id.
pub(crate) async fn fefo_candidates(
    conn: &mut SqliteConnection,
    variant: VariantId,
) -> Result<Vec<BatchId>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT batch_id FROM inventory_batch
         WHERE variant_id = ? AND quantity_on_hand > 0
         ORDER BY expiry_date ASC, batch_id ASC",
    )
    .bind(variant.get())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(|row| get_i64(row, "batch_id").map(BatchId)).collect()
}

/// Takes the write lock on one batch row and returns its current on-hand
/// quantity, read under that lock. `None` when the batch does not exist.
pub(crate) async fn lock_batch(
    conn: &mut SqliteConnection,
    batch: BatchId,
) -> Result<Option<LockedBatch>, RepositoryError> {
    let row = sqlx::query(
        "UPDATE inventory_batch SET quantity_on_hand = quantity_on_hand
         WHERE batch_id = ?
         RETURNING batch_id, variant_id, quantity_on_hand",
    )
    .bind(batch.get())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|row| {
        Ok(LockedBatch {
            id: BatchId(get_i64(&row, "batch_id")?),
            variant_id: VariantId(get_i64(&row, "variant_id")?),
            on_hand: decode_count(&row, "quantity_on_hand")?,
        })
    })
    .transpose()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LockedBatch {
    pub id: BatchId,
    pub variant_id: VariantId,
    pub on_hand: u32,
}

/// Conditional decrement. Returns `false` if the row would go negative, which
/// can only happen if the lock discipline was bypassed.
pub(crate) async fn decrement(
    conn: &mut SqliteConnection,
    batch: BatchId,
    quantity: u32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE inventory_batch SET quantity_on_hand = quantity_on_hand - ?
         WHERE batch_id = ? AND quantity_on_hand >= ?",
    )
    .bind(i64::from(quantity))
    .bind(batch.get())
    .bind(i64::from(quantity))
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn stock_summary(
    conn: &mut SqliteConnection,
) -> Result<Vec<StockSummary>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT variant_id,
                COALESCE(SUM(quantity_on_hand), 0) AS total_on_hand,
                MIN(CASE WHEN quantity_on_hand > 0 THEN expiry_date END) AS earliest_expiry
         FROM inventory_batch
         GROUP BY variant_id",
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let earliest: Option<String> = sqlx::Row::try_get(row, "earliest_expiry")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let earliest_expiry = earliest
                .map(|raw| {
                    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                        RepositoryError::Decode(format!("earliest_expiry `{raw}`: {e}"))
                    })
                })
                .transpose()?;
            Ok(StockSummary {
                variant_id: VariantId(get_i64(row, "variant_id")?),
                total_on_hand: get_i64(row, "total_on_hand")?,
                earliest_expiry,
            })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StockSummary {
    pub variant_id: VariantId,
    pub total_on_hand: i64,
    pub earliest_expiry: Option<NaiveDate>,
}

fn batch_from_row(row: &SqliteRow) -> Result<Batch, RepositoryError> {
    Ok(Batch {
        id: BatchId(get_i64(row, "batch_id")?),
        variant_id: VariantId(get_i64(row, "variant_id")?),
        lot_number: get_string(row, "lot_number")?,
        expiry_date: decode_date(row, "expiry_date")?,
        quantity_on_hand: decode_count(row, "quantity_on_hand")?,
        unit_cost: decode_decimal(row, "unit_cost")?,
    })
}

/// Inventory-management collaborator surface: receiving and retiring lots.
pub struct SqlInventoryRepository {
    pool: DbPool,
}

impl SqlInventoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl InventoryRepository for SqlInventoryRepository {
    async fn find_batch(&self, id: BatchId) -> Result<Option<Batch>, RepositoryError> {
        let sql = format!("SELECT {BATCH_COLUMNS} FROM inventory_batch WHERE batch_id = ?");
        let row = sqlx::query(&sql).bind(id.get()).fetch_optional(&self.pool).await?;

        row.as_ref().map(batch_from_row).transpose()
    }

    async fn list_batches(&self, variant: VariantId) -> Result<Vec<Batch>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BATCH_COLUMNS} FROM inventory_batch
             WHERE variant_id = ?
             ORDER BY expiry_date ASC, batch_id ASC"
        ))
        .bind(variant.get())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(batch_from_row).collect()
    }

    async fn receive_batch(&self, batch: NewBatch) -> Result<Batch, RepositoryError> {
        let row = sqlx::query(&format!(
            "INSERT INTO inventory_batch
                (variant_id, lot_number, expiry_date, quantity_on_hand, unit_cost)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(variant_id, lot_number) DO UPDATE SET
                quantity_on_hand = quantity_on_hand + excluded.quantity_on_hand
             WHERE inventory_batch.quantity_on_hand + excluded.quantity_on_hand <= ?
             RETURNING {BATCH_COLUMNS}"
        ))
        .bind(batch.variant_id.get())
        .bind(&batch.lot_number)
        .bind(encode_date(batch.expiry_date))
        .bind(i64::from(batch.quantity))
        .bind(batch.unit_cost.to_string())
        .bind(i64::from(u32::MAX))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => batch_from_row(&row),
            None => Err(RepositoryError::QuantityOverflow {
                variant_id: batch.variant_id,
                lot_number: batch.lot_number,
            }),
        }
    }

    async fn delete_batch(&self, id: BatchId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT COUNT(*) AS order_lines FROM order_line WHERE batch_id = ?")
            .bind(id.get())
            .fetch_one(&mut *tx)
            .await?;
        let order_lines = get_i64(&row, "order_lines")?;
        if order_lines > 0 {
            return Err(RepositoryError::BatchReferenced { batch_id: id, order_lines });
        }

        sqlx::query("DELETE FROM inventory_batch WHERE batch_id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}
