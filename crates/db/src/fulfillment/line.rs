use sqlx::SqliteConnection;
use tracing::debug;

use stockroom_core::domain::batch::BatchId;
use stockroom_core::domain::order::{LineStage, Order, OrderLine};
use stockroom_core::domain::quantity::Quantity;
use stockroom_core::domain::variant::{Variant, VariantId};
use stockroom_core::errors::{EntityKind, FulfillmentError};
use stockroom_core::pricing::{resolve_price, PriceQuote};

use super::allocator::allocate;
use crate::repositories::catalog::find_variant;
use crate::repositories::customer::find_customer;
use crate::repositories::discount::candidate_rules;
use crate::repositories::inventory::{decrement, lock_batch};
use crate::repositories::order::insert_line;

fn log_stage(order: &Order, variant: VariantId, stage: LineStage) {
    debug!(
        event_name = "fulfillment.line.stage",
        order_id = %order.id,
        customer_id = %order.customer_id,
        variant_id = %variant,
        stage = %stage,
        "line advanced"
    );
}

/// Fulfils one cart line against `order` inside the caller's transaction:
/// validate, allocate FEFO, price once on the total quantity, then decrement
/// and write one order line per allocated batch.
pub(crate) async fn fulfill_line(
    conn: &mut SqliteConnection,
    order: &Order,
    variant_id: VariantId,
    quantity: Quantity,
) -> Result<Vec<OrderLine>, FulfillmentError> {
    log_stage(order, variant_id, LineStage::Validating);
    let variant = load_line_parties(conn, order, variant_id).await?;

    log_stage(order, variant_id, LineStage::Allocating);
    let plan = allocate(conn, variant_id, quantity).await?;

    log_stage(order, variant_id, LineStage::Pricing);
    let quote = price(conn, &variant, order, quantity).await?;

    log_stage(order, variant_id, LineStage::Persisting);
    let mut lines = Vec::with_capacity(plan.allocations.len());
    for allocation in &plan.allocations {
        take_stock(conn, allocation.batch_id, allocation.quantity).await?;
        let line = insert_line(
            conn,
            order.id,
            allocation.batch_id,
            variant_id,
            allocation.quantity,
            quote.unit_price,
        )
        .await?;
        lines.push(line);
    }

    log_stage(order, variant_id, LineStage::Committed);
    Ok(lines)
}

/// Sells from one named batch only, without FEFO. Shortfall is measured
/// against that batch alone.
pub(crate) async fn fulfill_from_batch(
    conn: &mut SqliteConnection,
    order: &Order,
    batch_id: BatchId,
    quantity: Quantity,
) -> Result<OrderLine, FulfillmentError> {
    let locked = lock_batch(conn, batch_id)
        .await?
        .ok_or_else(|| FulfillmentError::not_found(EntityKind::Batch, batch_id))?;

    log_stage(order, locked.variant_id, LineStage::Validating);
    let variant = load_line_parties(conn, order, locked.variant_id).await?;

    log_stage(order, locked.variant_id, LineStage::Allocating);
    if locked.on_hand < quantity.get() {
        return Err(FulfillmentError::InsufficientStock {
            variant: locked.variant_id,
            requested: quantity.get(),
            shortfall: quantity.get() - locked.on_hand,
        });
    }

    log_stage(order, locked.variant_id, LineStage::Pricing);
    let quote = price(conn, &variant, order, quantity).await?;

    log_stage(order, locked.variant_id, LineStage::Persisting);
    take_stock(conn, batch_id, quantity.get()).await?;
    let line =
        insert_line(conn, order.id, batch_id, locked.variant_id, quantity.get(), quote.unit_price)
            .await?;

    log_stage(order, locked.variant_id, LineStage::Committed);
    Ok(line)
}

/// Re-reads the variant (for a fresh `base_price`) and the customer inside
/// the transaction.
async fn load_line_parties(
    conn: &mut SqliteConnection,
    order: &Order,
    variant_id: VariantId,
) -> Result<Variant, FulfillmentError> {
    if find_customer(conn, order.customer_id).await?.is_none() {
        return Err(FulfillmentError::not_found(EntityKind::Customer, order.customer_id));
    }
    find_variant(conn, variant_id)
        .await?
        .ok_or_else(|| FulfillmentError::not_found(EntityKind::Variant, variant_id))
}

async fn price(
    conn: &mut SqliteConnection,
    variant: &Variant,
    order: &Order,
    quantity: Quantity,
) -> Result<PriceQuote, FulfillmentError> {
    let rules = candidate_rules(conn, variant.id, Some(order.customer_id)).await?;
    let quote =
        resolve_price(variant.base_price, &rules, variant.id, Some(order.customer_id), quantity);
    debug!(
        event_name = "fulfillment.line.priced",
        order_id = %order.id,
        variant_id = %variant.id,
        quantity = quantity.get(),
        base_price = %quote.base_price,
        discount_percent = %quote.discount_percent,
        unit_price = %quote.unit_price,
        "line priced"
    );
    Ok(quote)
}

async fn take_stock(
    conn: &mut SqliteConnection,
    batch_id: BatchId,
    quantity: u32,
) -> Result<(), FulfillmentError> {
    if decrement(conn, batch_id, quantity).await? {
        Ok(())
    } else {
        Err(FulfillmentError::Fatal(format!(
            "batch {batch_id} could not be decremented by {quantity} after it was locked"
        )))
    }
}
