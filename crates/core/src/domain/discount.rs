use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::customer::CustomerId;
use super::quantity::Quantity;
use super::row_id;
use super::scope::Scope;
use super::variant::VariantId;

row_id!(DiscountRuleId);

/// A volume discount. Rules are authored elsewhere with `discount_percent`
/// constrained to `[0, 100]`; this crate only reads them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub id: DiscountRuleId,
    pub variant: Scope<VariantId>,
    pub customer: Scope<CustomerId>,
    pub min_quantity: u32,
    pub discount_percent: Decimal,
}

impl DiscountRule {
    pub fn applies_to(
        &self,
        variant: VariantId,
        customer: Option<CustomerId>,
        quantity: Quantity,
    ) -> bool {
        self.variant.matches(&variant)
            && self.customer.matches_optional(customer.as_ref())
            && quantity.get() >= self.min_quantity
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{DiscountRule, DiscountRuleId};
    use crate::domain::customer::CustomerId;
    use crate::domain::quantity::Quantity;
    use crate::domain::scope::Scope;
    use crate::domain::variant::VariantId;

    fn rule(variant: Scope<VariantId>, customer: Scope<CustomerId>, min: u32) -> DiscountRule {
        DiscountRule {
            id: DiscountRuleId(1),
            variant,
            customer,
            min_quantity: min,
            discount_percent: Decimal::new(10, 0),
        }
    }

    fn qty(value: i64) -> Quantity {
        Quantity::new(value).expect("positive quantity")
    }

    #[test]
    fn wildcard_rule_applies_to_any_variant_and_customer() {
        let rule = rule(Scope::Any, Scope::Any, 1);
        assert!(rule.applies_to(VariantId(4), Some(CustomerId(9)), qty(1)));
        assert!(rule.applies_to(VariantId(5), None, qty(1)));
    }

    #[test]
    fn min_quantity_is_inclusive() {
        let rule = rule(Scope::Specific(VariantId(4)), Scope::Any, 5);
        assert!(!rule.applies_to(VariantId(4), None, qty(4)));
        assert!(rule.applies_to(VariantId(4), None, qty(5)));
    }

    #[test]
    fn customer_specific_rule_skips_other_and_anonymous_buyers() {
        let rule = rule(Scope::Any, Scope::Specific(CustomerId(2)), 1);
        assert!(rule.applies_to(VariantId(1), Some(CustomerId(2)), qty(1)));
        assert!(!rule.applies_to(VariantId(1), Some(CustomerId(3)), qty(1)));
        assert!(!rule.applies_to(VariantId(1), None, qty(1)));
    }

    #[test]
    fn variant_specific_rule_skips_other_variants() {
        let rule = rule(Scope::Specific(VariantId(4)), Scope::Any, 1);
        assert!(!rule.applies_to(VariantId(5), Some(CustomerId(2)), qty(10)));
    }
}
