use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewReview, Review},
    traits::PersistenceError,
};

pub async fn insert_review(review: NewReview, conn: &mut SqliteConnection) -> Result<Review, PersistenceError> {
    let stored = sqlx::query_as::<_, Review>(
        r#"
            INSERT INTO reviews (product_id, owner_id, author, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(&review.product_id)
    .bind(&review.owner_id)
    .bind(&review.author)
    .bind(review.rating)
    .bind(&review.comment)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(stored)
}

pub async fn fetch_reviews_for_product(
    product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Review>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC")
        .bind(product_id)
        .fetch_all(conn)
        .await
}
