pub mod allocation;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod retry;

pub use chrono;
pub use rust_decimal;

pub use allocation::{Allocation, AllocationPlan, FefoPlanner};
pub use domain::batch::{Batch, BatchId};
pub use domain::cart::{normalize_cart, CartLine, CheckoutLine};
pub use domain::customer::{Customer, CustomerId};
pub use domain::discount::{DiscountRule, DiscountRuleId};
pub use domain::order::{
    LineStage, Order, OrderId, OrderLine, OrderLineId, OrderReceipt, OrderStatus,
};
pub use domain::quantity::Quantity;
pub use domain::scope::Scope;
pub use domain::variant::{Variant, VariantId};
pub use errors::{EntityKind, FulfillmentError, InterfaceError};
pub use pricing::{resolve_price, PriceQuote};
pub use retry::{run_with_conflict_retry, RetryPolicy};
