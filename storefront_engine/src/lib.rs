//! Storefront Engine
//!
//! The storefront engine carries the core logic of the store: the order and payment ledgers, the reconciliation
//! state machine that turns asynchronous gateway notifications into confirmed orders exactly once, the catalog and
//! cart services, and the identity service. It is HTTP- and gateway-agnostic; the server crate supplies both.
//!
//! The library is divided into two main sections:
//! 1. Storage backends. Two interchangeable backends implement the traits in [`mod@traits`]: [`SqliteDatabase`]
//!    (used whenever a database URL is configured) and [`FileStoreDatabase`] (the flat-file fallback). The backend
//!    is chosen once at startup and injected into the APIs; nothing else in the system branches on the storage
//!    mode, and both backends must produce structurally identical records.
//! 2. The engine public API ([`mod@sfe_api`]): [`ReconciliationApi`], [`OrdersApi`], [`CatalogApi`], [`CartApi`]
//!    and [`AuthApi`].
//!
//! The engine also emits events (e.g. [`events::OrderCreatedEvent`]) through a small hook system so that
//! subscribers like the order-confirmation mailer can react without ever blocking the request path.

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod sfe_api;
pub mod shipping;
pub mod traits;

#[cfg(feature = "sqlite")]
mod backend;
mod filestore;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use backend::StoreBackend;
pub use filestore::FileStoreDatabase;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use sfe_api::{
    auth_api::AuthApi,
    cart_api::CartApi,
    catalog_api::{CatalogApi, ProductDetail},
    errors::{AuthApiError, ReconciliationError},
    order_objects,
    orders_api::OrdersApi,
    reconciliation_api::ReconciliationApi,
};
pub use traits::{
    AuthManagement,
    CartManagement,
    CatalogManagement,
    InsertOrderResult,
    OrderManagement,
    PaymentManagement,
    PersistenceError,
    ReviewManagement,
    StorefrontDatabase,
};
