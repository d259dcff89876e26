use thiserror::Error;

use crate::{db_types::OrderId, traits::PersistenceError};

/// Failures surfaced by the reconciliation and order APIs. How each class propagates depends on the flow:
/// user-initiated checkout surfaces them to the caller; the asynchronous notification handler folds them into an
/// acknowledged outcome instead (see [`crate::sfe_api::order_objects::NotificationOutcome`]).
#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("The payment gateway is not configured. {0}")]
    Configuration(String),
    #[error("{0}")]
    Validation(String),
    #[error("The upstream gateway call failed. {0}")]
    UpstreamGateway(String),
    #[error("The order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested order change would be a no-op.")]
    OrderModificationNoOp,
    #[error("The requested order status change is forbidden.")]
    OrderModificationForbidden,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Error)]
pub enum AuthApiError {
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("An account with email {0} already exists.")]
    EmailTaken(String),
    #[error("{0}")]
    Validation(String),
    #[error("Password hashing failed. {0}")]
    Hashing(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
