use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::row_id;
use super::variant::VariantId;

row_id!(BatchId);

/// A physical lot of one variant. `quantity_on_hand` never goes below zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub variant_id: VariantId,
    pub lot_number: String,
    pub expiry_date: NaiveDate,
    pub quantity_on_hand: u32,
    pub unit_cost: Decimal,
}
