use std::future::Future;

use crate::commands::{open_pool, prepare, to_data, CommandResult};
use stockroom_core::domain::batch::BatchId;
use stockroom_core::domain::customer::CustomerId;
use stockroom_core::domain::order::{OrderId, OrderReceipt};
use stockroom_core::domain::variant::VariantId;
use stockroom_core::errors::FulfillmentError;
use stockroom_db::FulfillmentService;

pub fn run_line(customer: i64, variant: i64, quantity: i64) -> CommandResult {
    with_service("order", |service| async move {
        service.place_line_order(CustomerId(customer), VariantId(variant), quantity).await
    })
}

pub fn run_batch(customer: i64, batch: i64, quantity: i64) -> CommandResult {
    with_service("batch-order", |service| async move {
        service.place_batch_order(CustomerId(customer), BatchId(batch), quantity).await
    })
}

pub fn run_show(order: i64) -> CommandResult {
    with_service("show-order", |service| async move { service.find_order(OrderId(order)).await })
}

/// Runs one receipt-producing operation and renders the receipt as `data`.
pub(crate) fn with_service<F, Fut>(command: &'static str, operation: F) -> CommandResult
where
    F: FnOnce(FulfillmentService) -> Fut,
    Fut: Future<Output = Result<OrderReceipt, FulfillmentError>>,
{
    let (config, runtime) = match prepare(command) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let pool = match open_pool(command, &config).await {
            Ok(pool) => pool,
            Err(failure) => return failure,
        };
        let service = FulfillmentService::from_config(pool.clone(), &config.fulfillment);
        let outcome = operation(service).await;
        pool.close().await;

        match outcome {
            Ok(receipt) => match to_data(command, &receipt) {
                Ok(data) => CommandResult::success_with_data(
                    command,
                    format!(
                        "order {} with {} line(s), total {}",
                        receipt.order.id,
                        receipt.lines.len(),
                        receipt.grand_total
                    ),
                    Some(data),
                ),
                Err(failure) => failure,
            },
            Err(error) => CommandResult::fulfillment_failure(command, error),
        }
    })
}
