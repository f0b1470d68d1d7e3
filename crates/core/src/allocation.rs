//! First-expire-first-out planning.
//!
//! Storage code walks candidate batches in `(expiry_date, batch_id)` order,
//! locks each row, and offers its freshly read on-hand quantity to a
//! [`FefoPlanner`]. The planner decides how much to take and when to stop; it
//! never mutates stock itself, so a failed plan leaves storage untouched.

use serde::{Deserialize, Serialize};

use crate::domain::batch::BatchId;
use crate::domain::quantity::Quantity;
use crate::domain::variant::VariantId;
use crate::errors::FulfillmentError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub batch_id: BatchId,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub variant_id: VariantId,
    pub requested: Quantity,
    pub allocations: Vec<Allocation>,
}

impl AllocationPlan {
    pub fn total_allocated(&self) -> u32 {
        self.allocations.iter().map(|allocation| allocation.quantity).sum()
    }
}

#[derive(Debug)]
pub struct FefoPlanner {
    variant_id: VariantId,
    requested: Quantity,
    remaining: u32,
    allocations: Vec<Allocation>,
}

impl FefoPlanner {
    pub fn new(variant_id: VariantId, requested: Quantity) -> Self {
        Self { variant_id, requested, remaining: requested.get(), allocations: Vec::new() }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_satisfied(&self) -> bool {
        self.remaining == 0
    }

    /// Offers the next batch in FEFO order and returns how many units were taken.
    pub fn offer(&mut self, batch_id: BatchId, on_hand: u32) -> u32 {
        let take = on_hand.min(self.remaining);
        if take > 0 {
            self.remaining -= take;
            self.allocations.push(Allocation { batch_id, quantity: take });
        }
        take
    }

    pub fn finish(self) -> Result<AllocationPlan, FulfillmentError> {
        if self.remaining > 0 {
            return Err(FulfillmentError::InsufficientStock {
                variant: self.variant_id,
                requested: self.requested.get(),
                shortfall: self.remaining,
            });
        }

        Ok(AllocationPlan {
            variant_id: self.variant_id,
            requested: self.requested,
            allocations: self.allocations,
        })
    }
}
