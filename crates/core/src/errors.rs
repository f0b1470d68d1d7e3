use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::variant::VariantId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Variant,
    Batch,
    Order,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Customer => "customer",
            Self::Variant => "variant",
            Self::Batch => "batch",
            Self::Order => "order",
        })
    }
}

/// Terminal outcome of a fulfillment request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FulfillmentError {
    #[error("quantity must be a positive whole number, got {requested}")]
    InvalidQuantity { requested: i64 },
    #[error("cart has no lines to fulfill")]
    EmptyCart,
    #[error("{entity} {id} was not found")]
    NotFound { entity: EntityKind, id: i64 },
    #[error(
        "insufficient stock for variant {variant}: requested {requested}, short by {shortfall}"
    )]
    InsufficientStock { variant: VariantId, requested: u32, shortfall: u32 },
    #[error("transient storage conflict: {detail}")]
    TransientConflict { detail: String },
    #[error("fatal storage failure: {0}")]
    Fatal(String),
}

impl FulfillmentError {
    pub fn not_found(entity: EntityKind, id: impl Into<i64>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    /// Only storage conflicts are worth replaying; every other outcome would repeat.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientConflict { .. })
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::InvalidQuantity { .. } => "invalid_quantity",
            Self::EmptyCart => "empty_cart",
            Self::NotFound { .. } => "not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::TransientConflict { .. } => "conflict",
            Self::Fatal(_) => "fatal",
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::InsufficientStock { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("insufficient stock: {message}")]
    InsufficientStock { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::InsufficientStock { .. } => {
                "Not enough stock is available. Reduce the quantity and submit again."
            }
            Self::Conflict { .. } => {
                "Another order touched the same stock at the same time. Please try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl From<FulfillmentError> for InterfaceError {
    fn from(value: FulfillmentError) -> Self {
        let message = value.to_string();
        let correlation_id = "unassigned".to_owned();
        match value {
            FulfillmentError::InvalidQuantity { .. }
            | FulfillmentError::EmptyCart
            | FulfillmentError::NotFound { .. } => Self::BadRequest { message, correlation_id },
            FulfillmentError::InsufficientStock { .. } => {
                Self::InsufficientStock { message, correlation_id }
            }
            FulfillmentError::TransientConflict { .. } => {
                Self::Conflict { message, correlation_id }
            }
            FulfillmentError::Fatal(_) => Self::Internal { message, correlation_id },
        }
    }
}
