use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use stockroom_core::domain::batch::BatchId;
use stockroom_core::domain::customer::CustomerId;
use stockroom_core::domain::order::{
    Order, OrderId, OrderLine, OrderLineId, OrderReceipt, OrderStatus,
};
use stockroom_core::domain::variant::VariantId;

use super::{decode_count, decode_decimal, get_i64, get_string, OrderRepository, RepositoryError};
use crate::DbPool;

/// Creates the order header in `pending` state.
pub(crate) async fn insert_order(
    conn: &mut SqliteConnection,
    customer: CustomerId,
    created_at: DateTime<Utc>,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query(
        "INSERT INTO customer_order (customer_id, created_at, status)
         VALUES (?, ?, ?)
         RETURNING order_id",
    )
    .bind(customer.get())
    .bind(created_at.to_rfc3339())
    .bind(OrderStatus::Pending.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(Order {
        id: OrderId(get_i64(&row, "order_id")?),
        customer_id: customer,
        created_at,
        status: OrderStatus::Pending,
    })
}

pub(crate) async fn insert_line(
    conn: &mut SqliteConnection,
    order_id: OrderId,
    batch_id: BatchId,
    variant_id: VariantId,
    quantity: u32,
    unit_sale_price: Decimal,
) -> Result<OrderLine, RepositoryError> {
    let row = sqlx::query(
        "INSERT INTO order_line (order_id, batch_id, quantity, unit_sale_price)
         VALUES (?, ?, ?, ?)
         RETURNING order_line_id",
    )
    .bind(order_id.get())
    .bind(batch_id.get())
    .bind(i64::from(quantity))
    .bind(unit_sale_price.to_string())
    .fetch_one(&mut *conn)
    .await?;

    Ok(OrderLine {
        id: OrderLineId(get_i64(&row, "order_line_id")?),
        order_id,
        batch_id,
        variant_id,
        quantity,
        unit_sale_price,
    })
}

pub(crate) async fn load_receipt(
    conn: &mut SqliteConnection,
    id: OrderId,
) -> Result<Option<OrderReceipt>, RepositoryError> {
    let header = sqlx::query(
        "SELECT order_id, customer_id, created_at, status FROM customer_order WHERE order_id = ?",
    )
    .bind(id.get())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(header) = header else {
        return Ok(None);
    };
    let order = order_from_row(&header)?;

    let rows = sqlx::query(
        "SELECT l.order_line_id, l.order_id, l.batch_id, b.variant_id, l.quantity, l.unit_sale_price
         FROM order_line l
         JOIN inventory_batch b ON b.batch_id = l.batch_id
         WHERE l.order_id = ?
         ORDER BY l.order_line_id ASC",
    )
    .bind(id.get())
    .fetch_all(&mut *conn)
    .await?;

    let lines = rows.iter().map(line_from_row).collect::<Result<Vec<_>, _>>()?;
    Ok(Some(OrderReceipt::new(order, lines)))
}

fn order_from_row(row: &SqliteRow) -> Result<Order, RepositoryError> {
    let created_raw = get_string(row, "created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_raw)
        .map_err(|e| RepositoryError::Decode(format!("created_at `{created_raw}`: {e}")))?
        .with_timezone(&Utc);
    let status_raw = get_string(row, "status")?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown order status `{status_raw}`")))?;

    Ok(Order {
        id: OrderId(get_i64(row, "order_id")?),
        customer_id: CustomerId(get_i64(row, "customer_id")?),
        created_at,
        status,
    })
}

fn line_from_row(row: &SqliteRow) -> Result<OrderLine, RepositoryError> {
    Ok(OrderLine {
        id: OrderLineId(get_i64(row, "order_line_id")?),
        order_id: OrderId(get_i64(row, "order_id")?),
        batch_id: BatchId(get_i64(row, "batch_id")?),
        variant_id: VariantId(get_i64(row, "variant_id")?),
        quantity: decode_count(row, "quantity")?,
        unit_sale_price: decode_decimal(row, "unit_sale_price")?,
    })
}

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn find_receipt(&self, id: OrderId) -> Result<Option<OrderReceipt>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_receipt(&mut conn, id).await
    }

    async fn count_orders(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS orders FROM customer_order")
            .fetch_one(&self.pool)
            .await?;
        get_i64(&row, "orders")
    }
}
