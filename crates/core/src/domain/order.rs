use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::batch::BatchId;
use super::customer::CustomerId;
use super::row_id;
use super::variant::VariantId;

row_id!(OrderId);
row_id!(OrderLineId);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processed,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Shipped => "shipped",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "processed" => Some(Self::Processed),
            "shipped" => Some(Self::Shipped),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
}

/// One allocated slice of a cart line. `unit_sale_price` is frozen at write time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub batch_id: BatchId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_sale_price: Decimal,
}

impl OrderLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_sale_price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub grand_total: Decimal,
}

impl OrderReceipt {
    pub fn new(order: Order, lines: Vec<OrderLine>) -> Self {
        let grand_total = lines.iter().map(OrderLine::line_total).sum();
        Self { order, lines, grand_total }
    }

    pub fn total_units(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

/// Progress of a single line through the fulfillment transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStage {
    Validating,
    Allocating,
    Pricing,
    Persisting,
    Committed,
}

impl LineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Allocating => "allocating",
            Self::Pricing => "pricing",
            Self::Persisting => "persisting",
            Self::Committed => "committed",
        }
    }
}

impl std::fmt::Display for LineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
