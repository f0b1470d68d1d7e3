use anyhow::{bail, Context};

use crate::commands::order::with_service;
use crate::commands::CommandResult;
use stockroom_core::domain::cart::CartLine;
use stockroom_core::domain::customer::CustomerId;
use stockroom_core::domain::variant::VariantId;

pub fn run(customer: i64, raw_lines: &[String]) -> CommandResult {
    let cart = match parse_cart(raw_lines) {
        Ok(cart) => cart,
        Err(error) => {
            return CommandResult::failure("checkout", "invalid_line", format!("{error:#}"), 6);
        }
    };

    with_service("checkout", |service| async move {
        service.checkout(CustomerId(customer), &cart).await
    })
}

/// Parses `VARIANT:QTY` arguments. Quantities are passed through unchecked so
/// the fulfillment core reports non-positive values itself.
pub fn parse_cart(raw_lines: &[String]) -> anyhow::Result<Vec<CartLine>> {
    raw_lines.iter().map(|raw| parse_line(raw)).collect()
}

fn parse_line(raw: &str) -> anyhow::Result<CartLine> {
    let Some((variant, quantity)) = raw.split_once(':') else {
        bail!("cart line `{raw}` must look like VARIANT:QTY");
    };
    let variant = variant
        .trim()
        .parse::<i64>()
        .with_context(|| format!("cart line `{raw}` has a non-numeric variant"))?;
    let quantity = quantity
        .trim()
        .parse::<i64>()
        .with_context(|| format!("cart line `{raw}` has a non-integer quantity"))?;

    Ok(CartLine { variant_id: VariantId(variant), quantity })
}

#[cfg(test)]
mod tests {
    use super::parse_cart;
    use stockroom_core::domain::variant::VariantId;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn lines_parse_in_argument_order() {
        let cart = parse_cart(&owned(&["3:5", " 1 : 2 "])).expect("parse");

        assert_eq!(cart.len(), 2);
        assert_eq!(cart[0].variant_id, VariantId(3));
        assert_eq!(cart[0].quantity, 5);
        assert_eq!(cart[1].variant_id, VariantId(1));
        assert_eq!(cart[1].quantity, 2);
    }

    #[test]
    fn negative_quantities_are_left_for_the_core_to_reject() {
        let cart = parse_cart(&owned(&["2:-4"])).expect("parse");
        assert_eq!(cart[0].quantity, -4);
    }

    #[test]
    fn malformed_lines_are_reported() {
        let missing = parse_cart(&owned(&["7"])).expect_err("missing colon");
        assert!(missing.to_string().contains("VARIANT:QTY"));

        let fractional = parse_cart(&owned(&["7:1.5"])).expect_err("fraction");
        assert!(fractional.to_string().contains("non-integer quantity"));
    }
}
