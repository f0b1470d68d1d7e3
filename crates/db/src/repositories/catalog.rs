use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use stockroom_core::domain::variant::{Variant, VariantId};

use super::{decode_decimal, get_i64, get_string, CatalogRepository, RepositoryError};
use crate::DbPool;

const VARIANT_COLUMNS: &str = "variant_id, sku, name, base_price, unit_label";

pub(crate) async fn find_variant(
    conn: &mut SqliteConnection,
    id: VariantId,
) -> Result<Option<Variant>, RepositoryError> {
    let sql = format!("SELECT {VARIANT_COLUMNS} FROM product_variant WHERE variant_id = ?");
    let row = sqlx::query(&sql).bind(id.get()).fetch_optional(&mut *conn).await?;

    row.as_ref().map(variant_from_row).transpose()
}

pub(crate) async fn list_variants(
    conn: &mut SqliteConnection,
) -> Result<Vec<Variant>, RepositoryError> {
    let sql = format!("SELECT {VARIANT_COLUMNS} FROM product_variant ORDER BY variant_id ASC");
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    rows.iter().map(variant_from_row).collect()
}

fn variant_from_row(row: &SqliteRow) -> Result<Variant, RepositoryError> {
    Ok(Variant {
        id: VariantId(get_i64(row, "variant_id")?),
        sku: get_string(row, "sku")?,
        name: get_string(row, "name")?,
        base_price: decode_decimal(row, "base_price")?,
        unit_label: get_string(row, "unit_label")?,
    })
}

/// Catalog collaborator surface. Price changes only affect future sales.
pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn get_variant(&self, id: VariantId) -> Result<Option<Variant>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        find_variant(&mut conn, id).await
    }

    async fn list_variants(&self) -> Result<Vec<Variant>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        list_variants(&mut conn).await
    }

    async fn save_variant(&self, variant: &Variant) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product_variant (variant_id, sku, name, base_price, unit_label)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(variant_id) DO UPDATE SET
                sku = excluded.sku,
                name = excluded.name,
                base_price = excluded.base_price,
                unit_label = excluded.unit_label",
        )
        .bind(variant.id.get())
        .bind(&variant.sku)
        .bind(&variant.name)
        .bind(variant.base_price.to_string())
        .bind(&variant.unit_label)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use stockroom_core::domain::variant::{Variant, VariantId};

    use super::SqlCatalogRepository;
    use crate::repositories::CatalogRepository;
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlCatalogRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30, 1_000).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlCatalogRepository::new(pool)
    }

    fn variant(id: i64, price: Decimal) -> Variant {
        Variant {
            id: VariantId(id),
            sku: format!("SKU-{id}"),
            name: "Amoxicillin 500mg".to_string(),
            base_price: price,
            unit_label: "10-strip".to_string(),
        }
    }

    #[tokio::test]
    async fn saved_variant_is_returned_with_exact_price() {
        let repo = repository().await;
        let saved = variant(1, Decimal::new(1999, 2));
        repo.save_variant(&saved).await.expect("save");

        let found = repo.get_variant(VariantId(1)).await.expect("get");
        assert_eq!(found, Some(saved));
    }

    #[tokio::test]
    async fn unknown_variant_is_absent() {
        let repo = repository().await;
        assert_eq!(repo.get_variant(VariantId(404)).await.expect("get"), None);
    }

    #[tokio::test]
    async fn saving_again_updates_the_list_price() {
        let repo = repository().await;
        repo.save_variant(&variant(1, Decimal::new(200, 2))).await.expect("save");
        repo.save_variant(&variant(1, Decimal::new(250, 2))).await.expect("update");

        let variants = repo.list_variants().await.expect("list");
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].base_price, Decimal::new(250, 2));
    }
}
