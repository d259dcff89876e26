//! Contracts a storage backend must satisfy to power the storefront engine.
//!
//! Two backends ship with the engine: [`crate::SqliteDatabase`] (used whenever a database URL is configured) and
//! [`crate::FileStoreDatabase`] (the flat-file fallback). Both must produce structurally identical records for the
//! same operation sequence; the test suite holds them to that.

mod auth_management;
mod catalog_management;
mod order_management;
mod payment_management;

use thiserror::Error;

pub use auth_management::AuthManagement;
pub use catalog_management::{CartManagement, CatalogManagement, CategorySummary, ProductQueryFilter, ProductSort, ReviewManagement};
pub use order_management::{InsertOrderResult, OrderManagement};
pub use payment_management::PaymentManagement;

use crate::db_types::{NewOrder, PaymentUpsert};

/// Storage-level failures. Higher layers either wrap these (user-initiated flows) or log-and-acknowledge them
/// (notification handlers).
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("Internal database error: {0}")]
    Database(String),
    #[error("File store I/O error: {0}")]
    Io(String),
    #[error("Could not (de)serialize a stored record: {0}")]
    Serialization(String),
    #[error("The order {0} does not exist")]
    OrderNotFound(String),
    #[error("No payment exists for merchant payment id {0}")]
    PaymentNotFound(String),
    #[error("The product {0} does not exist")]
    ProductNotFound(String),
    #[error("A user with email {0} already exists")]
    DuplicateEmail(String),
    #[error("A payment with merchant payment id {0} already exists")]
    DuplicateMerchantPaymentId(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(e: sqlx::Error) -> Self {
        PersistenceError::Database(e.to_string())
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialization(e.to_string())
    }
}

/// The aggregate backend contract. One extra operation lives here rather than on the per-concern traits:
/// committing a reconciled order together with its payment update, because that pairing must be all-or-nothing.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase:
    Clone + OrderManagement + PaymentManagement + CatalogManagement + CartManagement + ReviewManagement + AuthManagement
{
    /// The URL or root path of the underlying store.
    fn url(&self) -> &str;

    /// Inserts the order and applies the payment upsert as one logical unit. If an order already holds the same
    /// external transaction id, nothing is inserted, the payment upsert is still applied (it is re-driveable, so a
    /// failure between the two writes is repaired by the gateway's next delivery), and the existing order is
    /// returned.
    fn commit_reconciled_order(
        &self,
        order: NewOrder,
        payment: PaymentUpsert,
    ) -> impl std::future::Future<Output = Result<InsertOrderResult, PersistenceError>> + Send;

    /// Closes the backend. The default implementation is a no-op.
    async fn close(&mut self) -> Result<(), PersistenceError> {
        Ok(())
    }
}
