use crate::commands::{open_pool, prepare, to_data, CommandResult};
use stockroom_core::domain::customer::CustomerId;
use stockroom_db::FulfillmentService;

pub fn run(customer: Option<i64>, quantity: i64) -> CommandResult {
    let (config, runtime) = match prepare("price-list") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let pool = match open_pool("price-list", &config).await {
            Ok(pool) => pool,
            Err(failure) => return failure,
        };
        let service = FulfillmentService::from_config(pool.clone(), &config.fulfillment);
        let outcome = service.price_list(customer.map(CustomerId), quantity).await;
        pool.close().await;

        match outcome {
            Ok(entries) => match to_data("price-list", &entries) {
                Ok(data) => CommandResult::success_with_data(
                    "price-list",
                    format!("{} variant(s) priced", entries.len()),
                    Some(data),
                ),
                Err(failure) => failure,
            },
            Err(error) => CommandResult::fulfillment_failure("price-list", error),
        }
    })
}
