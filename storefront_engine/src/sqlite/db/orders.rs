use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    sqlite::db::is_unique_violation,
    traits::{InsertOrderResult, PersistenceError},
};

/// Inserts the order, returning `AlreadyExists` when another order already holds its external transaction id.
/// The existence check avoids the constraint-violation path in the common case; the `UNIQUE` constraint catches
/// the race between the check and the insert.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, PersistenceError> {
    if let Some(txid) = order.external_txid.as_deref() {
        if let Some(existing) = fetch_order_by_external_txid(txid, conn).await? {
            debug!("🧾️ Order for txid {txid} already exists as [{}]. Nothing inserted.", existing.id);
            return Ok(InsertOrderResult::AlreadyExists(existing));
        }
    }
    match insert_order(order.clone(), conn).await {
        Ok(inserted) => {
            debug!("🧾️ Order [{}] inserted.", inserted.id);
            Ok(InsertOrderResult::Inserted(inserted))
        },
        Err(PersistenceError::Database(msg)) if msg.contains("UNIQUE") => {
            // Lost the race to a concurrent notification delivery. Fetch the winner.
            let txid = order.external_txid.as_deref().unwrap_or_default();
            let existing = fetch_order_by_external_txid(txid, conn)
                .await?
                .ok_or_else(|| PersistenceError::Database(format!("unique violation without a matching order for {txid}")))?;
            debug!("🧾️ Lost insert race for txid {txid}; returning existing order [{}].", existing.id);
            Ok(InsertOrderResult::AlreadyExists(existing))
        },
        Err(e) => Err(e),
    }
}

async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PersistenceError> {
    let now = Utc::now();
    let customer = serde_json::to_string(&order.customer)?;
    let items = serde_json::to_string(&order.items)?;
    let metadata = serde_json::to_string(&order.metadata)?;
    let result = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (
                id, owner_id, customer, items, subtotal, shipping, total,
                payment_status, status, gateway, external_txid, metadata, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'Pending', $9, $10, $11, $12, $12)
            RETURNING *;
        "#,
    )
    .bind(order.id)
    .bind(order.owner_id)
    .bind(customer)
    .bind(items)
    .bind(order.subtotal)
    .bind(order.shipping)
    .bind(order.total)
    .bind(order.payment_status)
    .bind(order.gateway)
    .bind(order.external_txid)
    .bind(metadata)
    .bind(now)
    .fetch_one(conn)
    .await;
    result.map_err(|e| {
        if is_unique_violation(&e) {
            PersistenceError::Database(format!("UNIQUE constraint hit: {e}"))
        } else {
            PersistenceError::from(e)
        }
    })
}

pub async fn fetch_order_by_id(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_order_by_external_txid(
    txid: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PersistenceError> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE external_txid = $1").bind(txid).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_owner(owner_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE owner_id = $1 ORDER BY created_at DESC")
        .bind(owner_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_all_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC").fetch_all(conn).await
}

pub(crate) async fn update_order_status(
    id: &OrderId,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, PersistenceError> {
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
            .bind(status)
            .bind(Utc::now())
            .bind(id.as_str())
            .fetch_optional(conn)
            .await?;
    result.ok_or_else(|| PersistenceError::OrderNotFound(id.to_string()))
}

pub(crate) async fn delete_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<(), PersistenceError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id.as_str()).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(PersistenceError::OrderNotFound(id.to_string()));
    }
    Ok(())
}
