use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use stockroom_core::domain::customer::CustomerId;
use stockroom_core::domain::discount::{DiscountRule, DiscountRuleId};
use stockroom_core::domain::scope::Scope;
use stockroom_core::domain::variant::VariantId;

use super::{decode_count, decode_decimal, get_i64, DiscountRepository, RepositoryError};
use crate::DbPool;

const RULE_COLUMNS: &str = "rule_id, variant_id, customer_id, min_quantity, discount_percent";

/// Rules whose variant and customer dimensions could match. The quantity
/// threshold is left to the resolver.
pub(crate) async fn candidate_rules(
    conn: &mut SqliteConnection,
    variant: VariantId,
    customer: Option<CustomerId>,
) -> Result<Vec<DiscountRule>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {RULE_COLUMNS} FROM discount_rule
         WHERE (variant_id IS NULL OR variant_id = ?)
           AND (customer_id IS NULL OR customer_id = ?)
         ORDER BY rule_id ASC"
    ))
    .bind(variant.get())
    .bind(customer.map(CustomerId::get))
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(rule_from_row).collect()
}

pub(crate) async fn all_rules(
    conn: &mut SqliteConnection,
) -> Result<Vec<DiscountRule>, RepositoryError> {
    let sql = format!("SELECT {RULE_COLUMNS} FROM discount_rule ORDER BY rule_id ASC");
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    rows.iter().map(rule_from_row).collect()
}

fn rule_from_row(row: &SqliteRow) -> Result<DiscountRule, RepositoryError> {
    let variant: Option<i64> =
        row.try_get("variant_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer: Option<i64> =
        row.try_get("customer_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(DiscountRule {
        id: DiscountRuleId(get_i64(row, "rule_id")?),
        variant: Scope::from_nullable(variant.map(VariantId)),
        customer: Scope::from_nullable(customer.map(CustomerId)),
        min_quantity: decode_count(row, "min_quantity")?,
        discount_percent: decode_decimal(row, "discount_percent")?,
    })
}

pub struct SqlDiscountRepository {
    pool: DbPool,
}

impl SqlDiscountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DiscountRepository for SqlDiscountRepository {
    async fn list_rules(&self) -> Result<Vec<DiscountRule>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        all_rules(&mut conn).await
    }

    async fn add_rule(
        &self,
        variant: Scope<VariantId>,
        customer: Scope<CustomerId>,
        min_quantity: u32,
        discount_percent: Decimal,
    ) -> Result<DiscountRuleId, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO discount_rule (variant_id, customer_id, min_quantity, discount_percent)
             VALUES (?, ?, ?, ?)
             RETURNING rule_id",
        )
        .bind(variant.as_specific().map(|id| id.get()))
        .bind(customer.as_specific().map(|id| id.get()))
        .bind(i64::from(min_quantity.max(1)))
        .bind(discount_percent.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(DiscountRuleId(get_i64(&row, "rule_id")?))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use stockroom_core::domain::customer::{Customer, CustomerId};
    use stockroom_core::domain::scope::Scope;
    use stockroom_core::domain::variant::{Variant, VariantId};

    use super::{candidate_rules, SqlDiscountRepository};
    use crate::repositories::{
        CatalogRepository, CustomerRepository, DiscountRepository, SqlCatalogRepository,
        SqlCustomerRepository,
    };
    use crate::{connect_with_settings, migrations, DbPool};

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30, 1_000).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let catalog = SqlCatalogRepository::new(pool.clone());
        for id in [1, 2] {
            catalog
                .save_variant(&Variant {
                    id: VariantId(id),
                    sku: format!("SKU-{id}"),
                    name: "Saline 10ml".to_string(),
                    base_price: Decimal::new(500, 2),
                    unit_label: "vial".to_string(),
                })
                .await
                .expect("variant");
        }
        let customers = SqlCustomerRepository::new(pool.clone());
        for id in [7, 8] {
            customers
                .save(&Customer {
                    id: CustomerId(id),
                    name: format!("Customer {id}"),
                    customer_type: "Pharmacy".to_string(),
                })
                .await
                .expect("customer");
        }
        pool
    }

    #[tokio::test]
    async fn wildcard_columns_round_trip_as_any_scope() {
        let pool = seeded_pool().await;
        let repo = SqlDiscountRepository::new(pool);
        repo.add_rule(Scope::Any, Scope::Specific(CustomerId(7)), 10, Decimal::new(125, 1))
            .await
            .expect("add rule");

        let rules = repo.list_rules().await.expect("list");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].variant, Scope::Any);
        assert_eq!(rules[0].customer, Scope::Specific(CustomerId(7)));
        assert_eq!(rules[0].min_quantity, 10);
        assert_eq!(rules[0].discount_percent, Decimal::new(125, 1));
    }

    #[tokio::test]
    async fn candidate_rules_filter_by_variant_and_customer_dimensions() {
        let pool = seeded_pool().await;
        let repo = SqlDiscountRepository::new(pool.clone());
        repo.add_rule(Scope::Specific(VariantId(1)), Scope::Any, 1, Decimal::new(5, 0))
            .await
            .expect("variant rule");
        repo.add_rule(Scope::Specific(VariantId(2)), Scope::Any, 1, Decimal::new(6, 0))
            .await
            .expect("other variant rule");
        repo.add_rule(Scope::Any, Scope::Specific(CustomerId(7)), 1, Decimal::new(7, 0))
            .await
            .expect("customer rule");
        repo.add_rule(Scope::Any, Scope::Specific(CustomerId(8)), 1, Decimal::new(8, 0))
            .await
            .expect("other customer rule");

        let mut conn = pool.acquire().await.expect("conn");
        let for_customer =
            candidate_rules(&mut conn, VariantId(1), Some(CustomerId(7))).await.expect("rules");
        let percents: Vec<Decimal> =
            for_customer.iter().map(|rule| rule.discount_percent).collect();
        assert_eq!(percents, vec![Decimal::new(5, 0), Decimal::new(7, 0)]);

        let anonymous = candidate_rules(&mut conn, VariantId(1), None).await.expect("rules");
        assert_eq!(anonymous.len(), 1);
    }

    #[tokio::test]
    async fn out_of_range_discount_is_refused_by_schema() {
        let pool = seeded_pool().await;
        let repo = SqlDiscountRepository::new(pool);
        let result = repo.add_rule(Scope::Any, Scope::Any, 1, Decimal::new(101, 0)).await;
        assert!(result.is_err());
    }
}
