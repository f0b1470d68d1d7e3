use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::SqliteConnection;

use stockroom_core::domain::customer::CustomerId;
use stockroom_core::domain::quantity::Quantity;
use stockroom_core::domain::variant::VariantId;
use stockroom_core::errors::FulfillmentError;
use stockroom_core::pricing::resolve_price;

use crate::repositories::catalog::list_variants;
use crate::repositories::discount::all_rules;
use crate::repositories::inventory::stock_summary;

/// One catalog row as a given customer would be charged at a given quantity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceListEntry {
    pub variant_id: VariantId,
    pub sku: String,
    pub name: String,
    pub unit_label: String,
    pub base_price: Decimal,
    pub discount_percent: Decimal,
    pub unit_price: Decimal,
    pub total_on_hand: i64,
    pub earliest_expiry: Option<NaiveDate>,
}

pub(crate) async fn build_price_list(
    conn: &mut SqliteConnection,
    customer: Option<CustomerId>,
    quantity: Quantity,
) -> Result<Vec<PriceListEntry>, FulfillmentError> {
    let variants = list_variants(conn).await?;
    let rules = all_rules(conn).await?;
    let stock = stock_summary(conn).await?;

    Ok(variants
        .into_iter()
        .map(|variant| {
            let quote = resolve_price(variant.base_price, &rules, variant.id, customer, quantity);
            let summary = stock.iter().find(|summary| summary.variant_id == variant.id);
            PriceListEntry {
                variant_id: variant.id,
                sku: variant.sku,
                name: variant.name,
                unit_label: variant.unit_label,
                base_price: quote.base_price,
                discount_percent: quote.discount_percent,
                unit_price: quote.unit_price,
                total_on_hand: summary.map_or(0, |summary| summary.total_on_hand),
                earliest_expiry: summary.and_then(|summary| summary.earliest_expiry),
            }
        })
        .collect())
}

/// The assumed quantity of a price list is a display hint; anything below
/// one is read as a single unit.
pub(crate) fn assumed_quantity(requested: i64) -> Result<Quantity, FulfillmentError> {
    Quantity::new(requested.max(1))
}
