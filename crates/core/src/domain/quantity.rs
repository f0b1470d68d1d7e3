use serde::{Deserialize, Serialize};

use crate::errors::FulfillmentError;

/// A validated, strictly positive unit count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(requested: i64) -> Result<Self, FulfillmentError> {
        match u32::try_from(requested) {
            Ok(value) if value > 0 => Ok(Self(value)),
            _ => Err(FulfillmentError::InvalidQuantity { requested }),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = FulfillmentError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        i64::from(value.0)
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Quantity;
    use crate::errors::FulfillmentError;

    #[test]
    fn rejects_zero_and_negative_requests() {
        for requested in [0, -1, -500] {
            assert_eq!(
                Quantity::new(requested),
                Err(FulfillmentError::InvalidQuantity { requested })
            );
        }
    }

    #[test]
    fn rejects_counts_beyond_u32() {
        let requested = i64::from(u32::MAX) + 1;
        assert!(matches!(Quantity::new(requested), Err(FulfillmentError::InvalidQuantity { .. })));
    }

    #[test]
    fn accepts_positive_counts() {
        assert_eq!(Quantity::new(12).map(Quantity::get), Ok(12));
    }
}
