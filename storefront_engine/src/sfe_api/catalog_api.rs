use serde::{Deserialize, Serialize};

use crate::{
    db_types::{NewReview, Product, Review},
    sfe_api::errors::ReconciliationError,
    traits::{CatalogManagement, CategorySummary, PersistenceError, ProductQueryFilter, ProductSort, ReviewManagement, StorefrontDatabase},
};

/// A product together with its reviews, as served on the product detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
    pub reviews: Vec<Review>,
    pub average_rating: Option<f64>,
}

/// Catalog queries and admin catalog maintenance.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CatalogApi<B>
where B: StorefrontDatabase
{
    pub async fn products(&self, filter: ProductQueryFilter) -> Result<Vec<Product>, PersistenceError> {
        self.db.search_products(filter).await
    }

    pub async fn product(&self, id: &str) -> Result<Option<Product>, PersistenceError> {
        self.db.fetch_product(id).await
    }

    pub async fn product_detail(&self, id: &str) -> Result<Option<ProductDetail>, PersistenceError> {
        let Some(product) = self.db.fetch_product(id).await? else {
            return Ok(None);
        };
        let reviews = self.db.fetch_reviews_for_product(id).await?;
        let average_rating = if reviews.is_empty() {
            None
        } else {
            #[allow(clippy::cast_precision_loss)]
            Some(reviews.iter().map(|r| r.rating).sum::<i64>() as f64 / reviews.len() as f64)
        };
        Ok(Some(ProductDetail { product, reviews, average_rating }))
    }

    pub async fn categories(&self) -> Result<Vec<CategorySummary>, PersistenceError> {
        self.db.fetch_categories().await
    }

    pub async fn featured(&self, limit: i64) -> Result<Vec<Product>, PersistenceError> {
        let filter = ProductQueryFilter { featured: Some(true), limit: Some(limit), ..Default::default() };
        self.db.search_products(filter).await
    }

    /// Products from the same category, excluding the product itself.
    pub async fn related(&self, product_id: &str, limit: i64) -> Result<Vec<Product>, PersistenceError> {
        let Some(product) = self.db.fetch_product(product_id).await? else {
            return Ok(Vec::new());
        };
        let filter = ProductQueryFilter {
            category: Some(product.category.clone()),
            sort: ProductSort::Newest,
            // One extra, since the product itself is in its own category.
            limit: Some(limit + 1),
            ..Default::default()
        };
        let mut related = self.db.search_products(filter).await?;
        related.retain(|p| p.id != product_id);
        related.truncate(limit.max(0) as usize);
        Ok(related)
    }

    /// Creates or replaces a product. Admin only.
    pub async fn upsert_product(&self, product: Product) -> Result<Product, ReconciliationError> {
        if product.id.trim().is_empty() || product.name.trim().is_empty() {
            return Err(ReconciliationError::Validation("A product needs an id and a name.".to_string()));
        }
        if product.price.value() < 0 {
            return Err(ReconciliationError::Validation("A product price cannot be negative.".to_string()));
        }
        Ok(self.db.upsert_product(product).await?)
    }

    /// Admin only.
    pub async fn delete_product(&self, id: &str) -> Result<(), PersistenceError> {
        self.db.delete_product(id).await
    }

    pub async fn add_review(&self, review: NewReview) -> Result<Review, ReconciliationError> {
        if !(1..=5).contains(&review.rating) {
            return Err(ReconciliationError::Validation("Ratings run from 1 to 5.".to_string()));
        }
        if self.db.fetch_product(&review.product_id).await?.is_none() {
            return Err(ReconciliationError::Validation(format!(
                "Cannot review product {}: it does not exist.",
                review.product_id
            )));
        }
        Ok(self.db.insert_review(review).await?)
    }
}
