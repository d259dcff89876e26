use chrono::Utc;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::Product,
    traits::{CategorySummary, PersistenceError, ProductQueryFilter, ProductSort},
};

/// Fetches products according to the criteria in the `ProductQueryFilter`.
pub async fn search_products(
    filter: ProductQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM products ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(category) = filter.category {
        where_clause.push("category = ");
        where_clause.push_bind_unseparated(category);
    }
    if let Some(term) = filter.search {
        let pattern = format!("%{term}%");
        where_clause.push("(name LIKE ");
        where_clause.push_bind_unseparated(pattern.clone());
        where_clause.push_unseparated(" OR description LIKE ");
        where_clause.push_bind_unseparated(pattern);
        where_clause.push_unseparated(")");
    }
    if let Some(min) = filter.min_price {
        where_clause.push("price >= ");
        where_clause.push_bind_unseparated(min);
    }
    if let Some(max) = filter.max_price {
        where_clause.push("price <= ");
        where_clause.push_bind_unseparated(max);
    }
    if let Some(featured) = filter.featured {
        where_clause.push("featured = ");
        where_clause.push_bind_unseparated(featured);
    }
    let order_by = match filter.sort {
        ProductSort::Newest => " ORDER BY created_at DESC",
        ProductSort::PriceAsc => " ORDER BY price ASC",
        ProductSort::PriceDesc => " ORDER BY price DESC",
        ProductSort::Name => " ORDER BY name ASC",
    };
    builder.push(order_by);
    if let Some(limit) = filter.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        if let Some(offset) = filter.offset {
            builder.push(" OFFSET ");
            builder.push_bind(offset);
        }
    }
    trace!("🛒️ Executing product query: {}", builder.sql());
    builder.build_query_as::<Product>().fetch_all(conn).await
}

pub async fn fetch_product(id: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_categories(conn: &mut SqliteConnection) -> Result<Vec<CategorySummary>, sqlx::Error> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT category, COUNT(*) FROM products WHERE category <> '' GROUP BY category ORDER BY category ASC",
    )
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(name, product_count)| CategorySummary { name, product_count }).collect())
}

pub async fn upsert_product(product: Product, conn: &mut SqliteConnection) -> Result<Product, PersistenceError> {
    let sizes = serde_json::to_string(&product.sizes)?;
    let colors = serde_json::to_string(&product.colors)?;
    let created_at = if product.created_at.timestamp() == 0 { Utc::now() } else { product.created_at };
    let stored = sqlx::query_as::<_, Product>(
        r#"
            INSERT INTO products (id, name, description, price, category, sizes, colors, image, featured, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                price = excluded.price,
                category = excluded.category,
                sizes = excluded.sizes,
                colors = excluded.colors,
                image = excluded.image,
                featured = excluded.featured
            RETURNING *;
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.category)
    .bind(sizes)
    .bind(colors)
    .bind(&product.image)
    .bind(product.featured)
    .bind(created_at)
    .fetch_one(conn)
    .await?;
    Ok(stored)
}

pub async fn delete_product(id: &str, conn: &mut SqliteConnection) -> Result<(), PersistenceError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(PersistenceError::ProductNotFound(id.to_string()));
    }
    Ok(())
}
