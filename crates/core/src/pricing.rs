//! Effective unit price from a variant's list price and the discount rules
//! that match a request. Rules never stack: the largest matching discount wins.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::discount::{DiscountRule, DiscountRuleId};
use crate::domain::quantity::Quantity;
use crate::domain::variant::VariantId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub base_price: Decimal,
    pub discount_percent: Decimal,
    pub unit_price: Decimal,
    pub applied_rule: Option<DiscountRuleId>,
}

/// Returns the matching rule with the largest discount. Equal discounts resolve
/// to the lowest rule id so the reported rule is stable.
pub fn best_discount<'a>(
    rules: impl IntoIterator<Item = &'a DiscountRule>,
    variant: VariantId,
    customer: Option<CustomerId>,
    quantity: Quantity,
) -> Option<&'a DiscountRule> {
    let mut best: Option<&'a DiscountRule> = None;
    for rule in rules.into_iter().filter(|rule| rule.applies_to(variant, customer, quantity)) {
        let better = match best {
            None => true,
            Some(current) => {
                rule.discount_percent > current.discount_percent
                    || (rule.discount_percent == current.discount_percent && rule.id < current.id)
            }
        };
        if better {
            best = Some(rule);
        }
    }
    best
}

/// `round(base × (1 − pct/100), 2)` with half-up rounding, floored at zero.
pub fn discounted_unit_price(base_price: Decimal, discount_percent: Decimal) -> Decimal {
    let factor = Decimal::ONE - discount_percent / Decimal::ONE_HUNDRED;
    (base_price * factor)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .max(Decimal::ZERO)
}

pub fn resolve_price(
    base_price: Decimal,
    rules: &[DiscountRule],
    variant: VariantId,
    customer: Option<CustomerId>,
    quantity: Quantity,
) -> PriceQuote {
    let best = best_discount(rules, variant, customer, quantity);
    let discount_percent = best.map_or(Decimal::ZERO, |rule| rule.discount_percent);

    PriceQuote {
        base_price,
        discount_percent,
        unit_price: discounted_unit_price(base_price, discount_percent),
        applied_rule: best.map(|rule| rule.id),
    }
}
