mod support;

use std::sync::Arc;
use std::time::Duration;

use stockroom_core::domain::cart::CartLine;
use stockroom_core::domain::order::OrderReceipt;
use stockroom_core::domain::variant::VariantId;
use stockroom_core::errors::FulfillmentError;
use stockroom_core::retry::RetryPolicy;
use stockroom_db::repositories::{OrderRepository, SqlOrderRepository};
use stockroom_db::{DbPool, FulfillmentService};
use tokio::task::JoinHandle;

use support::{
    add_batch, add_variant, file_pool, on_hand, price, single_connection_pool, BUYER, OTHER_BUYER,
};

type ConcurrencyTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

async fn race(
    service: Arc<FulfillmentService>,
    buyers: usize,
    variant: VariantId,
    quantity: i64,
) -> ConcurrencyTestResult<Vec<Result<OrderReceipt, FulfillmentError>>> {
    let mut tasks = Vec::with_capacity(buyers);
    for index in 0..buyers {
        let service = Arc::clone(&service);
        let customer = if index % 2 == 0 { BUYER } else { OTHER_BUYER };
        tasks.push(tokio::spawn(async move {
            service.place_line_order(customer, variant, quantity).await
        }));
    }

    let mut outcomes = Vec::with_capacity(buyers);
    for task in tasks {
        outcomes.push(task.await.map_err(|error| format!("task panicked: {error}"))?);
    }
    Ok(outcomes)
}

/// Takes the write lock on another connection and releases it after `hold`.
async fn hold_write_lock(
    pool: &DbPool,
    hold: Duration,
) -> ConcurrencyTestResult<JoinHandle<ConcurrencyTestResult>> {
    let blocker = pool.begin_with("BEGIN IMMEDIATE").await.map_err(|error| error.to_string())?;
    Ok(tokio::spawn(async move {
        tokio::time::sleep(hold).await;
        blocker.rollback().await.map_err(|error| error.to_string())
    }))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_buyers_racing_for_the_same_stock_never_oversell() -> ConcurrencyTestResult {
    let dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let pool = file_pool(&dir, 5_000).await;
    let variant = add_variant(&pool, 1, price(200)).await;
    add_batch(&pool, variant, "A", "2026-03-01", 4).await;
    add_batch(&pool, variant, "B", "2026-09-01", 6).await;
    let service = Arc::new(FulfillmentService::new(pool.clone()));

    let outcomes = race(service, 2, variant, 6).await?;

    let committed: Vec<&OrderReceipt> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
    require_eq!(committed.len(), 1);
    require_eq!(committed[0].total_units(), 6);
    let rejected: Vec<&FulfillmentError> =
        outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
    require_eq!(
        rejected,
        vec![&FulfillmentError::InsufficientStock { variant, requested: 6, shortfall: 2 }]
    );
    require_eq!(on_hand(&pool, variant).await, 4);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_buyers_sell_exactly_the_available_stock() -> ConcurrencyTestResult {
    let dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let pool = file_pool(&dir, 5_000).await;
    let variant = add_variant(&pool, 1, price(200)).await;
    add_batch(&pool, variant, "A", "2026-02-01", 15).await;
    add_batch(&pool, variant, "B", "2026-04-01", 15).await;
    add_batch(&pool, variant, "C", "2026-06-01", 20).await;
    let service = Arc::new(FulfillmentService::new(pool.clone()));

    let outcomes = race(service, 10, variant, 10).await?;

    let committed = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    require_eq!(committed, 5);
    for outcome in &outcomes {
        if let Err(error) = outcome {
            require!(
                matches!(error, FulfillmentError::InsufficientStock { .. }),
                "unexpected failure: {error}"
            );
        }
    }
    let sold: u64 = outcomes.iter().flatten().map(OrderReceipt::total_units).sum();
    require_eq!(sold, 50);
    require_eq!(on_hand(&pool, variant).await, 0);

    let orders = SqlOrderRepository::new(pool.clone())
        .count_orders()
        .await
        .map_err(|error| error.to_string())?;
    require_eq!(orders, 5);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn crossing_multi_line_carts_both_commit() -> ConcurrencyTestResult {
    let dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let pool = file_pool(&dir, 5_000).await;
    let first = add_variant(&pool, 1, price(200)).await;
    let second = add_variant(&pool, 2, price(450)).await;
    add_batch(&pool, first, "F", "2027-01-01", 10).await;
    add_batch(&pool, second, "S", "2027-01-01", 10).await;
    let service = Arc::new(FulfillmentService::new(pool.clone()));

    let forward = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let cart = [
                CartLine { variant_id: first, quantity: 3 },
                CartLine { variant_id: second, quantity: 3 },
            ];
            service.checkout(BUYER, &cart).await
        })
    };
    let backward = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let cart = [
                CartLine { variant_id: second, quantity: 4 },
                CartLine { variant_id: first, quantity: 4 },
            ];
            service.checkout(OTHER_BUYER, &cart).await
        })
    };

    let forward = forward.await.map_err(|error| error.to_string())?;
    let backward = backward.await.map_err(|error| error.to_string())?;
    require!(forward.is_ok(), "forward cart failed: {forward:?}");
    require!(backward.is_ok(), "backward cart failed: {backward:?}");
    require_eq!(on_hand(&pool, first).await, 3);
    require_eq!(on_hand(&pool, second).await, 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lock_wait_past_the_timeout_surfaces_as_conflict() -> ConcurrencyTestResult {
    let dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let pool = file_pool(&dir, 50).await;
    let variant = add_variant(&pool, 1, price(200)).await;
    add_batch(&pool, variant, "A", "2027-01-01", 10).await;
    let service = FulfillmentService::with_retry_policy(pool.clone(), RetryPolicy::new(2));

    let mut blocker = pool.begin_with("BEGIN IMMEDIATE").await.map_err(|error| error.to_string())?;
    sqlx::query("UPDATE inventory_batch SET quantity_on_hand = quantity_on_hand")
        .execute(&mut *blocker)
        .await
        .map_err(|error| error.to_string())?;

    let outcome = service.place_line_order(BUYER, variant, 1).await;
    require!(
        matches!(outcome, Err(FulfillmentError::TransientConflict { .. })),
        "expected a conflict, got {outcome:?}"
    );

    blocker.rollback().await.map_err(|error| error.to_string())?;

    let retried = service.place_line_order(BUYER, variant, 1).await;
    require!(retried.is_ok(), "retry after release failed: {retried:?}");
    require_eq!(on_hand(&pool, variant).await, 9);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lock_held_across_one_timeout_commits_on_the_replay() -> ConcurrencyTestResult {
    let dir = tempfile::tempdir().map_err(|error| error.to_string())?;
    let pool = file_pool(&dir, 300).await;
    let variant = add_variant(&pool, 1, price(200)).await;
    add_batch(&pool, variant, "A", "2027-01-01", 10).await;
    let cart = [CartLine { variant_id: variant, quantity: 1 }];

    let single_attempt = FulfillmentService::with_retry_policy(pool.clone(), RetryPolicy::new(1));
    let release = hold_write_lock(&pool, Duration::from_millis(450)).await?;
    let outcome = single_attempt.checkout(BUYER, &cart).await;
    release.await.map_err(|error| error.to_string())??;
    require!(
        matches!(outcome, Err(FulfillmentError::TransientConflict { .. })),
        "expected a conflict without replay, got {outcome:?}"
    );
    require_eq!(on_hand(&pool, variant).await, 10);

    let replaying = FulfillmentService::new(pool.clone());
    let release = hold_write_lock(&pool, Duration::from_millis(450)).await?;
    let outcome = replaying.checkout(BUYER, &cart).await;
    release.await.map_err(|error| error.to_string())??;
    require!(outcome.is_ok(), "replayed checkout failed: {outcome:?}");
    require_eq!(on_hand(&pool, variant).await, 9);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pool_timeout_during_existence_checks_is_replayed() -> ConcurrencyTestResult {
    let pool = single_connection_pool().await;
    let variant = add_variant(&pool, 1, price(200)).await;
    add_batch(&pool, variant, "A", "2027-01-01", 10).await;

    let held = pool.acquire().await.map_err(|error| error.to_string())?;
    let release = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        drop(held);
    });

    let outcome = FulfillmentService::new(pool.clone()).place_line_order(BUYER, variant, 1).await;
    release.await.map_err(|error| error.to_string())?;
    require!(outcome.is_ok(), "replayed order failed: {outcome:?}");
    require_eq!(on_hand(&pool, variant).await, 9);
    Ok(())
}
