use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::quantity::Quantity;
use super::variant::VariantId;
use crate::errors::FulfillmentError;

/// Cart state as handed over by the cart collaborator; quantities are unchecked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub variant_id: VariantId,
    pub quantity: i64,
}

/// A validated line ready for fulfillment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub variant_id: VariantId,
    pub quantity: Quantity,
}

/// Validates every quantity, merges lines naming the same variant and returns
/// them in ascending variant order, which is also the lock acquisition order.
pub fn normalize_cart(lines: &[CartLine]) -> Result<Vec<CheckoutLine>, FulfillmentError> {
    if lines.is_empty() {
        return Err(FulfillmentError::EmptyCart);
    }

    let mut merged: BTreeMap<VariantId, Quantity> = BTreeMap::new();
    for line in lines {
        let quantity = Quantity::new(line.quantity)?;
        match merged.get_mut(&line.variant_id) {
            Some(existing) => {
                let merged_total = existing.checked_add(quantity);
                *existing = merged_total.ok_or(FulfillmentError::InvalidQuantity {
                    requested: i64::from(*existing) + line.quantity,
                })?;
            }
            None => {
                merged.insert(line.variant_id, quantity);
            }
        }
    }

    Ok(merged
        .into_iter()
        .map(|(variant_id, quantity)| CheckoutLine { variant_id, quantity })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{normalize_cart, CartLine};
    use crate::domain::variant::VariantId;
    use crate::errors::FulfillmentError;

    fn cart_line(variant: i64, quantity: i64) -> CartLine {
        CartLine { variant_id: VariantId(variant), quantity }
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert_eq!(normalize_cart(&[]), Err(FulfillmentError::EmptyCart));
    }

    #[test]
    fn lines_are_sorted_by_variant() {
        let lines = normalize_cart(&[cart_line(9, 1), cart_line(2, 4), cart_line(5, 2)])
            .expect("valid cart");
        let order: Vec<i64> = lines.iter().map(|line| line.variant_id.get()).collect();
        assert_eq!(order, vec![2, 5, 9]);
    }

    #[test]
    fn duplicate_variants_are_merged() {
        let lines = normalize_cart(&[cart_line(3, 2), cart_line(1, 1), cart_line(3, 4)])
            .expect("valid cart");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].variant_id, VariantId(3));
        assert_eq!(lines[1].quantity.get(), 6);
    }

    #[test]
    fn any_non_positive_line_rejects_the_cart() {
        let result = normalize_cart(&[cart_line(1, 3), cart_line(2, 0)]);
        assert_eq!(result, Err(FulfillmentError::InvalidQuantity { requested: 0 }));
    }
}
