use serde::{Deserialize, Serialize};
use spg_common::Money;

use crate::{
    db_types::{Cart, NewReview, Product, Review},
    traits::PersistenceError,
};

//--------------------------------------  Catalog queries  -----------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductQueryFilter {
    pub category: Option<String>,
    /// Case-insensitive substring match against name and description.
    pub search: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub featured: Option<bool>,
    #[serde(default)]
    pub sort: ProductSort,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ProductQueryFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.search.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.featured.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub name: String,
    pub product_count: i64,
}

/// Product listing, search and aggregation.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement: Clone {
    async fn search_products(&self, filter: ProductQueryFilter) -> Result<Vec<Product>, PersistenceError>;

    async fn fetch_product(&self, id: &str) -> Result<Option<Product>, PersistenceError>;

    /// Distinct categories with their product counts, alphabetical.
    async fn fetch_categories(&self) -> Result<Vec<CategorySummary>, PersistenceError>;

    /// Creates or replaces a product. Admin only.
    async fn upsert_product(&self, product: Product) -> Result<Product, PersistenceError>;

    /// Admin only.
    async fn delete_product(&self, id: &str) -> Result<(), PersistenceError>;
}

/// Per-owner cart persistence.
#[allow(async_fn_in_trait)]
pub trait CartManagement: Clone {
    async fn fetch_cart(&self, owner_id: &str) -> Result<Option<Cart>, PersistenceError>;

    /// Whole-cart replace, keyed by owner id.
    async fn save_cart(&self, cart: Cart) -> Result<Cart, PersistenceError>;
}

/// Product reviews.
#[allow(async_fn_in_trait)]
pub trait ReviewManagement: Clone {
    async fn insert_review(&self, review: NewReview) -> Result<Review, PersistenceError>;

    /// Newest first.
    async fn fetch_reviews_for_product(&self, product_id: &str) -> Result<Vec<Review>, PersistenceError>;
}
