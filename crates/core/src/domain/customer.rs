use serde::{Deserialize, Serialize};

use super::row_id;

row_id!(CustomerId);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub customer_type: String,
}
