//! Runtime backend selection. The server decides once, at startup, whether a database is configured; from then on
//! every component works against this enum and never branches on the storage mode again.

use crate::{
    db_types::{
        Cart,
        NewOrder,
        NewPayment,
        NewReview,
        NewUser,
        Order,
        OrderId,
        OrderStatusType,
        Payment,
        PaymentUpsert,
        Product,
        Review,
        User,
    },
    filestore::FileStoreDatabase,
    sqlite::SqliteDatabase,
    traits::{
        AuthManagement,
        CartManagement,
        CatalogManagement,
        CategorySummary,
        InsertOrderResult,
        OrderManagement,
        PaymentManagement,
        PersistenceError,
        ProductQueryFilter,
        ReviewManagement,
        StorefrontDatabase,
    },
};

/// Either the SQLite database (preferred) or the flat-file fallback, fixed for the process lifetime.
#[derive(Clone, Debug)]
pub enum StoreBackend {
    Db(SqliteDatabase),
    Files(FileStoreDatabase),
}

macro_rules! dispatch {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            StoreBackend::Db(b) => b.$method($($arg),*).await,
            StoreBackend::Files(b) => b.$method($($arg),*).await,
        }
    };
}

impl OrderManagement for StoreBackend {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, PersistenceError> {
        dispatch!(self, insert_order, order)
    }

    async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Option<Order>, PersistenceError> {
        dispatch!(self, fetch_order_by_id, id)
    }

    async fn fetch_order_by_external_txid(&self, txid: &str) -> Result<Option<Order>, PersistenceError> {
        dispatch!(self, fetch_order_by_external_txid, txid)
    }

    async fn fetch_orders_for_owner(&self, owner_id: &str) -> Result<Vec<Order>, PersistenceError> {
        dispatch!(self, fetch_orders_for_owner, owner_id)
    }

    async fn fetch_all_orders(&self) -> Result<Vec<Order>, PersistenceError> {
        dispatch!(self, fetch_all_orders)
    }

    async fn update_order_status(&self, id: &OrderId, status: OrderStatusType) -> Result<Order, PersistenceError> {
        dispatch!(self, update_order_status, id, status)
    }

    async fn delete_order(&self, id: &OrderId) -> Result<(), PersistenceError> {
        dispatch!(self, delete_order, id)
    }
}

impl PaymentManagement for StoreBackend {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PersistenceError> {
        dispatch!(self, insert_payment, payment)
    }

    async fn upsert_payment(&self, upsert: PaymentUpsert) -> Result<Payment, PersistenceError> {
        dispatch!(self, upsert_payment, upsert)
    }

    async fn fetch_payment_by_merchant_id(&self, merchant_payment_id: &str) -> Result<Option<Payment>, PersistenceError> {
        dispatch!(self, fetch_payment_by_merchant_id, merchant_payment_id)
    }

    async fn fetch_payments_for_owner(&self, owner_id: &str) -> Result<Vec<Payment>, PersistenceError> {
        dispatch!(self, fetch_payments_for_owner, owner_id)
    }

    async fn fetch_all_payments(&self) -> Result<Vec<Payment>, PersistenceError> {
        dispatch!(self, fetch_all_payments)
    }
}

impl CatalogManagement for StoreBackend {
    async fn search_products(&self, filter: ProductQueryFilter) -> Result<Vec<Product>, PersistenceError> {
        dispatch!(self, search_products, filter)
    }

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, PersistenceError> {
        dispatch!(self, fetch_product, id)
    }

    async fn fetch_categories(&self) -> Result<Vec<CategorySummary>, PersistenceError> {
        dispatch!(self, fetch_categories)
    }

    async fn upsert_product(&self, product: Product) -> Result<Product, PersistenceError> {
        dispatch!(self, upsert_product, product)
    }

    async fn delete_product(&self, id: &str) -> Result<(), PersistenceError> {
        dispatch!(self, delete_product, id)
    }
}

impl CartManagement for StoreBackend {
    async fn fetch_cart(&self, owner_id: &str) -> Result<Option<Cart>, PersistenceError> {
        dispatch!(self, fetch_cart, owner_id)
    }

    async fn save_cart(&self, cart: Cart) -> Result<Cart, PersistenceError> {
        dispatch!(self, save_cart, cart)
    }
}

impl ReviewManagement for StoreBackend {
    async fn insert_review(&self, review: NewReview) -> Result<Review, PersistenceError> {
        dispatch!(self, insert_review, review)
    }

    async fn fetch_reviews_for_product(&self, product_id: &str) -> Result<Vec<Review>, PersistenceError> {
        dispatch!(self, fetch_reviews_for_product, product_id)
    }
}

impl AuthManagement for StoreBackend {
    async fn create_user(&self, user: NewUser) -> Result<User, PersistenceError> {
        dispatch!(self, create_user, user)
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, PersistenceError> {
        dispatch!(self, fetch_user_by_email, email)
    }

    async fn fetch_user_by_id(&self, id: &str) -> Result<Option<User>, PersistenceError> {
        dispatch!(self, fetch_user_by_id, id)
    }
}

impl StorefrontDatabase for StoreBackend {
    fn url(&self) -> &str {
        match self {
            StoreBackend::Db(b) => b.url(),
            StoreBackend::Files(b) => b.url(),
        }
    }

    async fn commit_reconciled_order(
        &self,
        order: NewOrder,
        payment: PaymentUpsert,
    ) -> Result<InsertOrderResult, PersistenceError> {
        dispatch!(self, commit_reconciled_order, order, payment)
    }

    async fn close(&mut self) -> Result<(), PersistenceError> {
        match self {
            StoreBackend::Db(b) => b.close().await,
            StoreBackend::Files(b) => b.close().await,
        }
    }
}
