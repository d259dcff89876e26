use std::{fmt::Debug, path::PathBuf, sync::Arc};

use chrono::Utc;
use log::{debug, trace};
use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, sync::Mutex};

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
        PaymentStatus,
        PaymentUpsert,
        Product,
        Review,
        User,
    },
    helpers::new_user_id,
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
        ProductSort,
        ReviewManagement,
        StorefrontDatabase,
    },
};

const ORDERS: &str = "orders";
const PAYMENTS: &str = "payments";
const PRODUCTS: &str = "products";
const CARTS: &str = "carts";
const USERS: &str = "users";
const REVIEWS: &str = "reviews";

/// The flat-file backend. Writes are serialized behind an async mutex so that a duplicate-check-then-insert
/// sequence cannot interleave with another writer — this is the fallback store's equivalent of the database's
/// uniqueness constraint. Reads go straight to disk; the temp-file-and-rename write keeps them consistent.
#[derive(Clone)]
pub struct FileStoreDatabase {
    root: PathBuf,
    url: String,
    write_lock: Arc<Mutex<()>>,
}

impl Debug for FileStoreDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "FileStoreDatabase ({})", self.root.display())
    }
}

impl FileStoreDatabase {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let url = format!("file://{}", root.display());
        Self { root, url, write_lock: Arc::new(Mutex::new(())) }
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    /// Reads a whole collection, lazily creating an empty one on first access.
    async fn read_collection<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, PersistenceError> {
        let path = self.collection_path(name);
        if !fs::try_exists(&path).await? {
            fs::create_dir_all(&self.root).await?;
            fs::write(&path, b"[]").await?;
            trace!("📁️ Collection {name} created empty at {}", path.display());
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path).await?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records = serde_json::from_str(&raw)?;
        Ok(records)
    }

    /// Whole-file replace via a temp file and rename. Last writer wins.
    async fn write_collection<T: Serialize>(&self, name: &str, records: &[T]) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.root).await?;
        let path = self.collection_path(name);
        let tmp = self.collection_path(&format!("{name}.tmp"));
        let raw = serde_json::to_string_pretty(records)?;
        fs::write(&tmp, raw.as_bytes()).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    fn build_order(order: NewOrder) -> Order {
        let now = Utc::now();
        Order {
            id: order.id,
            owner_id: order.owner_id,
            customer: order.customer,
            items: order.items,
            subtotal: order.subtotal,
            shipping: order.shipping,
            total: order.total,
            payment_status: order.payment_status,
            status: OrderStatusType::Pending,
            gateway: order.gateway,
            external_txid: order.external_txid,
            metadata: order.metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Insert-or-short-circuit on external transaction id. Callers must hold the write lock.
    async fn insert_order_unlocked(&self, order: NewOrder) -> Result<InsertOrderResult, PersistenceError> {
        let mut all: Vec<Order> = self.read_collection(ORDERS).await?;
        if let Some(txid) = order.external_txid.as_deref() {
            if let Some(existing) = all.iter().find(|o| o.external_txid.as_deref() == Some(txid)) {
                debug!("📁️ Order for txid {txid} already exists as [{}]. Nothing inserted.", existing.id);
                return Ok(InsertOrderResult::AlreadyExists(existing.clone()));
            }
        }
        let stored = Self::build_order(order);
        all.push(stored.clone());
        self.write_collection(ORDERS, &all).await?;
        debug!("📁️ Order [{}] appended to the orders collection.", stored.id);
        Ok(InsertOrderResult::Inserted(stored))
    }

    /// Callers must hold the write lock.
    async fn upsert_payment_unlocked(&self, upsert: PaymentUpsert) -> Result<Payment, PersistenceError> {
        let mut all: Vec<Payment> = self.read_collection(PAYMENTS).await?;
        let now = Utc::now();
        let payment = match all.iter_mut().find(|p| p.merchant_payment_id == upsert.merchant_payment_id) {
            Some(existing) => {
                existing.order_id = upsert.order_id;
                existing.status = upsert.status;
                existing.external_txid = upsert.external_txid;
                existing.payload = upsert.payload;
                existing.updated_at = now;
                existing.clone()
            },
            None => {
                let id = all.iter().map(|p| p.id).max().unwrap_or(0) + 1;
                let created = Payment {
                    id,
                    merchant_payment_id: upsert.merchant_payment_id,
                    owner_id: upsert.owner_id,
                    order_id: upsert.order_id,
                    gateway: upsert.gateway,
                    method: upsert.method,
                    amount: upsert.amount,
                    currency: upsert.currency,
                    status: upsert.status,
                    external_txid: upsert.external_txid,
                    payload: upsert.payload,
                    created_at: now,
                    updated_at: now,
                };
                all.push(created.clone());
                created
            },
        };
        self.write_collection(PAYMENTS, &all).await?;
        Ok(payment)
    }
}

impl OrderManagement for FileStoreDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.insert_order_unlocked(order).await
    }

    async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Option<Order>, PersistenceError> {
        let all: Vec<Order> = self.read_collection(ORDERS).await?;
        Ok(all.into_iter().find(|o| &o.id == id))
    }

    async fn fetch_order_by_external_txid(&self, txid: &str) -> Result<Option<Order>, PersistenceError> {
        let all: Vec<Order> = self.read_collection(ORDERS).await?;
        Ok(all.into_iter().find(|o| o.external_txid.as_deref() == Some(txid)))
    }

    async fn fetch_orders_for_owner(&self, owner_id: &str) -> Result<Vec<Order>, PersistenceError> {
        let all: Vec<Order> = self.read_collection(ORDERS).await?;
        let mut mine: Vec<Order> = all.into_iter().filter(|o| o.owner_id.as_deref() == Some(owner_id)).collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn fetch_all_orders(&self) -> Result<Vec<Order>, PersistenceError> {
        let mut all: Vec<Order> = self.read_collection(ORDERS).await?;
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn update_order_status(&self, id: &OrderId, status: OrderStatusType) -> Result<Order, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Order> = self.read_collection(ORDERS).await?;
        let order = all.iter_mut().find(|o| &o.id == id).ok_or_else(|| PersistenceError::OrderNotFound(id.to_string()))?;
        order.status = status;
        order.updated_at = Utc::now();
        let updated = order.clone();
        self.write_collection(ORDERS, &all).await?;
        Ok(updated)
    }

    async fn delete_order(&self, id: &OrderId) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Order> = self.read_collection(ORDERS).await?;
        let before = all.len();
        all.retain(|o| &o.id != id);
        if all.len() == before {
            return Err(PersistenceError::OrderNotFound(id.to_string()));
        }
        self.write_collection(ORDERS, &all).await
    }
}

impl PaymentManagement for FileStoreDatabase {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Payment> = self.read_collection(PAYMENTS).await?;
        if all.iter().any(|p| p.merchant_payment_id == payment.merchant_payment_id) {
            return Err(PersistenceError::DuplicateMerchantPaymentId(payment.merchant_payment_id));
        }
        let now = Utc::now();
        let id = all.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let stored = Payment {
            id,
            merchant_payment_id: payment.merchant_payment_id,
            owner_id: payment.owner_id,
            order_id: None,
            gateway: payment.gateway,
            method: payment.method,
            amount: payment.amount,
            currency: payment.currency,
            status: PaymentStatus::Initiated,
            external_txid: None,
            payload: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        };
        all.push(stored.clone());
        self.write_collection(PAYMENTS, &all).await?;
        debug!("📁️ Payment [{}] recorded as initiated.", stored.merchant_payment_id);
        Ok(stored)
    }

    async fn upsert_payment(&self, upsert: PaymentUpsert) -> Result<Payment, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.upsert_payment_unlocked(upsert).await
    }

    async fn fetch_payment_by_merchant_id(&self, merchant_payment_id: &str) -> Result<Option<Payment>, PersistenceError> {
        let all: Vec<Payment> = self.read_collection(PAYMENTS).await?;
        Ok(all.into_iter().find(|p| p.merchant_payment_id == merchant_payment_id))
    }

    async fn fetch_payments_for_owner(&self, owner_id: &str) -> Result<Vec<Payment>, PersistenceError> {
        let all: Vec<Payment> = self.read_collection(PAYMENTS).await?;
        let mut mine: Vec<Payment> = all.into_iter().filter(|p| p.owner_id.as_deref() == Some(owner_id)).collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn fetch_all_payments(&self) -> Result<Vec<Payment>, PersistenceError> {
        let mut all: Vec<Payment> = self.read_collection(PAYMENTS).await?;
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

impl CatalogManagement for FileStoreDatabase {
    async fn search_products(&self, filter: ProductQueryFilter) -> Result<Vec<Product>, PersistenceError> {
        let all: Vec<Product> = self.read_collection(PRODUCTS).await?;
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut hits: Vec<Product> = all
            .into_iter()
            .filter(|p| filter.category.as_deref().map(|c| p.category == c).unwrap_or(true))
            .filter(|p| {
                needle
                    .as_deref()
                    .map(|n| p.name.to_lowercase().contains(n) || p.description.to_lowercase().contains(n))
                    .unwrap_or(true)
            })
            .filter(|p| filter.min_price.map(|m| p.price >= m).unwrap_or(true))
            .filter(|p| filter.max_price.map(|m| p.price <= m).unwrap_or(true))
            .filter(|p| filter.featured.map(|f| p.featured == f).unwrap_or(true))
            .collect();
        match filter.sort {
            ProductSort::Newest => hits.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ProductSort::PriceAsc => hits.sort_by(|a, b| a.price.cmp(&b.price)),
            ProductSort::PriceDesc => hits.sort_by(|a, b| b.price.cmp(&a.price)),
            ProductSort::Name => hits.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let hits: Vec<Product> = match filter.limit {
            Some(limit) => hits.into_iter().skip(offset).take(limit.max(0) as usize).collect(),
            None => hits.into_iter().skip(offset).collect(),
        };
        Ok(hits)
    }

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, PersistenceError> {
        let all: Vec<Product> = self.read_collection(PRODUCTS).await?;
        Ok(all.into_iter().find(|p| p.id == id))
    }

    async fn fetch_categories(&self) -> Result<Vec<CategorySummary>, PersistenceError> {
        let all: Vec<Product> = self.read_collection(PRODUCTS).await?;
        let mut counts: Vec<CategorySummary> = Vec::new();
        for product in all.into_iter().filter(|p| !p.category.is_empty()) {
            match counts.iter_mut().find(|c| c.name == product.category) {
                Some(c) => c.product_count += 1,
                None => counts.push(CategorySummary { name: product.category, product_count: 1 }),
            }
        }
        counts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(counts)
    }

    async fn upsert_product(&self, product: Product) -> Result<Product, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Product> = self.read_collection(PRODUCTS).await?;
        match all.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = product.clone();
                existing.created_at = created_at;
            },
            None => all.push(product.clone()),
        }
        self.write_collection(PRODUCTS, &all).await?;
        Ok(product)
    }

    async fn delete_product(&self, id: &str) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Product> = self.read_collection(PRODUCTS).await?;
        let before = all.len();
        all.retain(|p| p.id != id);
        if all.len() == before {
            return Err(PersistenceError::ProductNotFound(id.to_string()));
        }
        self.write_collection(PRODUCTS, &all).await
    }
}

impl CartManagement for FileStoreDatabase {
    async fn fetch_cart(&self, owner_id: &str) -> Result<Option<Cart>, PersistenceError> {
        let all: Vec<Cart> = self.read_collection(CARTS).await?;
        Ok(all.into_iter().find(|c| c.owner_id == owner_id))
    }

    async fn save_cart(&self, cart: Cart) -> Result<Cart, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Cart> = self.read_collection(CARTS).await?;
        match all.iter_mut().find(|c| c.owner_id == cart.owner_id) {
            Some(existing) => *existing = cart.clone(),
            None => all.push(cart.clone()),
        }
        self.write_collection(CARTS, &all).await?;
        Ok(cart)
    }
}

impl ReviewManagement for FileStoreDatabase {
    async fn insert_review(&self, review: NewReview) -> Result<Review, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Review> = self.read_collection(REVIEWS).await?;
        let id = all.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let stored = Review {
            id,
            product_id: review.product_id,
            owner_id: review.owner_id,
            author: review.author,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        };
        all.push(stored.clone());
        self.write_collection(REVIEWS, &all).await?;
        Ok(stored)
    }

    async fn fetch_reviews_for_product(&self, product_id: &str) -> Result<Vec<Review>, PersistenceError> {
        let all: Vec<Review> = self.read_collection(REVIEWS).await?;
        let mut hits: Vec<Review> = all.into_iter().filter(|r| r.product_id == product_id).collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(hits)
    }
}

impl AuthManagement for FileStoreDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<User> = self.read_collection(USERS).await?;
        let email = user.email.to_ascii_lowercase();
        if all.iter().any(|u| u.email == email) {
            return Err(PersistenceError::DuplicateEmail(user.email));
        }
        let stored = User {
            id: new_user_id(),
            name: user.name,
            email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        all.push(stored.clone());
        self.write_collection(USERS, &all).await?;
        Ok(stored)
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, PersistenceError> {
        let all: Vec<User> = self.read_collection(USERS).await?;
        let email = email.to_ascii_lowercase();
        Ok(all.into_iter().find(|u| u.email == email))
    }

    async fn fetch_user_by_id(&self, id: &str) -> Result<Option<User>, PersistenceError> {
        let all: Vec<User> = self.read_collection(USERS).await?;
        Ok(all.into_iter().find(|u| u.id == id))
    }
}

impl StorefrontDatabase for FileStoreDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn commit_reconciled_order(
        &self,
        order: NewOrder,
        payment: PaymentUpsert,
    ) -> Result<InsertOrderResult, PersistenceError> {
        // One critical section for both writes: the check-then-insert and the payment upsert cannot interleave
        // with a concurrent delivery of the same notification.
        let _guard = self.write_lock.lock().await;
        let result = self.insert_order_unlocked(order).await?;
        // On a repeat delivery the payment must link to the order that actually won, not the freshly
        // generated id in the caller's upsert.
        let mut payment = payment;
        payment.order_id = Some(result.order().id.clone());
        self.upsert_payment_unlocked(payment).await?;
        Ok(result)
    }
}
