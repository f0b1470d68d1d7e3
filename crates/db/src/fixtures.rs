use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_CUSTOMER_IDS: &[i64] = &[1, 2, 3];
const SEED_VARIANT_IDS: &[i64] = &[1, 2, 3];
const SEED_BATCH_IDS: &[i64] = &[1, 2, 3, 4, 5];
const SEED_RULE_IDS: &[i64] = &[1, 2, 3];

/// Deterministic demo catalog: customers, variants, FEFO lots and
/// overlapping discount rules.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Loads the dataset. Rows that already exist are left untouched, so stock
    /// consumed since the last load is not restored.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            customers: SEED_CUSTOMER_IDS.len(),
            variants: SEED_VARIANT_IDS.len(),
            batches: SEED_BATCH_IDS.len(),
            discount_rules: SEED_RULE_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let tables: [(&'static str, &'static str, &'static str, &[i64]); 4] = [
            ("customers", "customer", "customer_id", SEED_CUSTOMER_IDS),
            ("variants", "product_variant", "variant_id", SEED_VARIANT_IDS),
            ("batches", "inventory_batch", "batch_id", SEED_BATCH_IDS),
            ("discount-rules", "discount_rule", "rule_id", SEED_RULE_IDS),
        ];

        let mut checks = Vec::new();
        for (label, table, key, ids) in tables {
            let present: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(1) FROM {table} WHERE {key} IN {}",
                sql_id_list(ids)
            ))
            .fetch_one(pool)
            .await?;
            checks.push((label, present == ids.len() as i64));
        }

        let overlapping_rules: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM discount_rule WHERE variant_id = 3 AND rule_id IN (1, 2)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("overlapping-insulin-rules", overlapping_rules == 2));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

fn sql_id_list(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
    format!("({joined})")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub customers: usize,
    pub variants: usize,
    pub batches: usize,
    pub discount_rules: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
