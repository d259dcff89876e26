//! `SqliteDatabase` is the concrete database-backed storefront backend. It implements all the traits defined in
//! the [`crate::traits`] module over a SQLite connection pool.

use std::fmt::Debug;

use log::debug;
use sqlx::SqlitePool;

use super::db::{carts, new_pool, orders, payments, products, reviews, users};
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

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool (creating the database file and schema if necessary).
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PersistenceError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        orders::idempotent_insert(order, &mut conn).await
    }

    async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Option<Order>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_id(id, &mut conn).await?)
    }

    async fn fetch_order_by_external_txid(&self, txid: &str) -> Result<Option<Order>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_external_txid(txid, &mut conn).await
    }

    async fn fetch_orders_for_owner(&self, owner_id: &str) -> Result<Vec<Order>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_orders_for_owner(owner_id, &mut conn).await?)
    }

    async fn fetch_all_orders(&self) -> Result<Vec<Order>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_all_orders(&mut conn).await?)
    }

    async fn update_order_status(&self, id: &OrderId, status: OrderStatusType) -> Result<Order, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_status(id, status, &mut conn).await
    }

    async fn delete_order(&self, id: &OrderId) -> Result<(), PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        orders::delete_order(id, &mut conn).await
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        payments::insert_payment(payment, &mut conn).await
    }

    async fn upsert_payment(&self, upsert: PaymentUpsert) -> Result<Payment, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        payments::upsert_payment(upsert, &mut conn).await
    }

    async fn fetch_payment_by_merchant_id(&self, merchant_payment_id: &str) -> Result<Option<Payment>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment_by_merchant_id(merchant_payment_id, &mut conn).await?)
    }

    async fn fetch_payments_for_owner(&self, owner_id: &str) -> Result<Vec<Payment>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payments_for_owner(owner_id, &mut conn).await?)
    }

    async fn fetch_all_payments(&self) -> Result<Vec<Payment>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_all_payments(&mut conn).await?)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn search_products(&self, filter: ProductQueryFilter) -> Result<Vec<Product>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::search_products(filter, &mut conn).await?)
    }

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(id, &mut conn).await?)
    }

    async fn fetch_categories(&self) -> Result<Vec<CategorySummary>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_categories(&mut conn).await?)
    }

    async fn upsert_product(&self, product: Product) -> Result<Product, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        products::upsert_product(product, &mut conn).await
    }

    async fn delete_product(&self, id: &str) -> Result<(), PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        products::delete_product(id, &mut conn).await
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, owner_id: &str) -> Result<Option<Cart>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::fetch_cart(owner_id, &mut conn).await?)
    }

    async fn save_cart(&self, cart: Cart) -> Result<Cart, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        carts::save_cart(cart, &mut conn).await
    }
}

impl ReviewManagement for SqliteDatabase {
    async fn insert_review(&self, review: NewReview) -> Result<Review, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        reviews::insert_review(review, &mut conn).await
    }

    async fn fetch_reviews_for_product(&self, product_id: &str) -> Result<Vec<Review>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(reviews::fetch_reviews_for_product(product_id, &mut conn).await?)
    }
}

impl AuthManagement for SqliteDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        users::create_user(user, &mut conn).await
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user_by_email(email, &mut conn).await?)
    }

    async fn fetch_user_by_id(&self, id: &str) -> Result<Option<User>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user_by_id(id, &mut conn).await?)
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn commit_reconciled_order(
        &self,
        order: NewOrder,
        payment: PaymentUpsert,
    ) -> Result<InsertOrderResult, PersistenceError> {
        // No interactive transaction here: each statement is individually atomic, a lost insert race folds into
        // `AlreadyExists`, and the payment upsert is re-driveable — a crash between the two writes is repaired by
        // the gateway's next delivery of the same notification.
        let mut conn = self.pool.acquire().await?;
        let result = orders::idempotent_insert(order, &mut conn).await?;
        // On a repeat delivery the payment must link to the order that actually won, not the freshly
        // generated id in the caller's upsert.
        let mut payment = payment;
        payment.order_id = Some(result.order().id.clone());
        payments::upsert_payment(payment, &mut conn).await?;
        debug!(
            "🗃️ Reconciled order [{}] committed (inserted: {}).",
            result.order().id,
            result.was_inserted()
        );
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), PersistenceError> {
        self.pool.close().await;
        Ok(())
    }
}
