use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::row_id;

row_id!(
    /// A sellable configuration of a product (package size, unit type).
    VariantId
);

/// Catalog view of a variant. `base_price` is the current list price; it is
/// read inside the fulfilling transaction and never cached across requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub sku: String,
    pub name: String,
    pub base_price: Decimal,
    pub unit_label: String,
}
