use sqlx::SqliteConnection;
use tracing::{debug, info};

use stockroom_core::allocation::{AllocationPlan, FefoPlanner};
use stockroom_core::domain::quantity::Quantity;
use stockroom_core::domain::variant::VariantId;
use stockroom_core::errors::FulfillmentError;

use crate::repositories::inventory::{fefo_candidates, lock_batch};

/// Builds a FEFO plan inside the caller's transaction. Each candidate row is
/// locked before its quantity is read, in `(expiry_date, batch_id)` order, and
/// the walk stops at the first batch that satisfies the request. Nothing is
/// decremented here.
pub(crate) async fn allocate(
    conn: &mut SqliteConnection,
    variant: VariantId,
    quantity: Quantity,
) -> Result<AllocationPlan, FulfillmentError> {
    let candidates = fefo_candidates(conn, variant).await?;
    let mut planner = FefoPlanner::new(variant, quantity);

    for batch_id in candidates {
        if planner.is_satisfied() {
            break;
        }
        let Some(locked) = lock_batch(conn, batch_id).await? else {
            continue;
        };
        let taken = planner.offer(locked.id, locked.on_hand);
        debug!(
            event_name = "fulfillment.allocation.batch_locked",
            variant_id = %variant,
            batch_id = %locked.id,
            on_hand = locked.on_hand,
            taken,
            "batch locked for allocation"
        );
    }

    let outcome = planner.finish();
    if let Err(FulfillmentError::InsufficientStock { requested, shortfall, .. }) = &outcome {
        info!(
            event_name = "fulfillment.allocation.insufficient",
            variant_id = %variant,
            requested = *requested,
            shortfall = *shortfall,
            "not enough stock across batches"
        );
    }
    outcome
}
