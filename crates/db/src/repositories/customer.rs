use sqlx::SqliteConnection;

use stockroom_core::domain::customer::{Customer, CustomerId};

use super::{get_i64, get_string, CustomerRepository, RepositoryError};
use crate::DbPool;

pub(crate) async fn find_customer(
    conn: &mut SqliteConnection,
    id: CustomerId,
) -> Result<Option<Customer>, RepositoryError> {
    let row = sqlx::query(
        "SELECT customer_id, name, customer_type FROM customer
         WHERE customer_id = ?",
    )
    .bind(id.get())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|row| {
        Ok(Customer {
            id: CustomerId(get_i64(&row, "customer_id")?),
            name: get_string(&row, "name")?,
            customer_type: get_string(&row, "customer_type")?,
        })
    })
    .transpose()
}

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        find_customer(&mut conn, id).await
    }

    async fn save(&self, customer: &Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customer (customer_id, name, customer_type) VALUES (?, ?, ?)
             ON CONFLICT(customer_id) DO UPDATE SET
                name = excluded.name,
                customer_type = excluded.customer_type",
        )
        .bind(customer.id.get())
        .bind(&customer.name)
        .bind(&customer.customer_type)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
