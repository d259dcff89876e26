use sqlx::SqliteConnection;

use crate::{db_types::Cart, traits::PersistenceError};

pub async fn fetch_cart(owner_id: &str, conn: &mut SqliteConnection) -> Result<Option<Cart>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM carts WHERE owner_id = $1").bind(owner_id).fetch_optional(conn).await
}

/// Whole-cart replace keyed by the owner id.
pub async fn save_cart(cart: Cart, conn: &mut SqliteConnection) -> Result<Cart, PersistenceError> {
    let items = serde_json::to_string(&cart.items)?;
    let stored = sqlx::query_as::<_, Cart>(
        r#"
            INSERT INTO carts (owner_id, items, subtotal, shipping, total, status, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(owner_id) DO UPDATE SET
                items = excluded.items,
                subtotal = excluded.subtotal,
                shipping = excluded.shipping,
                total = excluded.total,
                status = excluded.status,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(&cart.owner_id)
    .bind(items)
    .bind(cart.subtotal)
    .bind(cart.shipping)
    .bind(cart.total)
    .bind(cart.status)
    .bind(cart.updated_at)
    .fetch_one(conn)
    .await?;
    Ok(stored)
}
