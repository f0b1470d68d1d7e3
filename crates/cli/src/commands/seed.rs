use crate::commands::{open_pool, prepare, CommandResult};
use stockroom_db::{SeedDataset, SeedResult};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result: Result<SeedResult, CommandResult> = runtime.block_on(async {
        let pool = open_pool("seed", &config).await?;

        let seeded = SeedDataset::load(&pool).await.map_err(|error| {
            CommandResult::failure("seed", "seed_execution", error.to_string(), 5)
        })?;

        let verification = SeedDataset::verify(&pool).await.map_err(|error| {
            CommandResult::failure("seed", "seed_verification", error.to_string(), 6)
        })?;

        pool.close().await;

        if verification.all_present {
            Ok(seeded)
        } else {
            Err(CommandResult::failure(
                "seed",
                "seed_verification",
                verification_failure_message(&verification.checks),
                6,
            ))
        }
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", seed_summary(&seeded)),
        Err(failure) => failure,
    }
}

fn seed_summary(seeded: &SeedResult) -> String {
    format!(
        "seed dataset loaded: {} customers, {} variants, {} batches, {} discount rules",
        seeded.customers, seeded.variants, seeded.batches, seeded.discount_rules
    )
}

fn verification_failure_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
