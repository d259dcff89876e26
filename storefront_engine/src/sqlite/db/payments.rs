use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus, PaymentUpsert},
    sqlite::db::is_unique_violation,
    traits::PersistenceError,
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, PersistenceError> {
    let now = Utc::now();
    let result = sqlx::query_as::<_, Payment>(
        r#"
            INSERT INTO payments (
                merchant_payment_id, owner_id, order_id, gateway, method, amount, currency,
                status, external_txid, payload, created_at, updated_at
            ) VALUES ($1, $2, NULL, $3, $4, $5, $6, $7, NULL, 'null', $8, $8)
            RETURNING *;
        "#,
    )
    .bind(&payment.merchant_payment_id)
    .bind(&payment.owner_id)
    .bind(payment.gateway)
    .bind(&payment.method)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(PaymentStatus::Initiated)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(p) => {
            debug!("💳️ Payment [{}] recorded as initiated.", p.merchant_payment_id);
            Ok(p)
        },
        Err(e) if is_unique_violation(&e) => {
            Err(PersistenceError::DuplicateMerchantPaymentId(payment.merchant_payment_id))
        },
        Err(e) => Err(e.into()),
    }
}

/// Applies the patch to the payment matching the merchant payment id, inserting the record if it is absent.
/// A single atomic statement: concurrent deliveries of the same notification cannot race an UPDATE against an
/// INSERT, and a repeat delivery just rewrites the same terminal state. The conflict branch leaves the original
/// `created_at`, owner and amount untouched.
pub async fn upsert_payment(upsert: PaymentUpsert, conn: &mut SqliteConnection) -> Result<Payment, PersistenceError> {
    let now = Utc::now();
    let payload = serde_json::to_string(&upsert.payload)?;
    let payment = sqlx::query_as::<_, Payment>(
        r#"
            INSERT INTO payments (
                merchant_payment_id, owner_id, order_id, gateway, method, amount, currency,
                status, external_txid, payload, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            ON CONFLICT(merchant_payment_id) DO UPDATE SET
                order_id = excluded.order_id,
                status = excluded.status,
                external_txid = excluded.external_txid,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(&upsert.merchant_payment_id)
    .bind(&upsert.owner_id)
    .bind(upsert.order_id.as_ref().map(|o| o.as_str().to_string()))
    .bind(upsert.gateway)
    .bind(&upsert.method)
    .bind(upsert.amount)
    .bind(&upsert.currency)
    .bind(upsert.status)
    .bind(&upsert.external_txid)
    .bind(&payload)
    .bind(now)
    .fetch_one(conn)
    .await?;
    trace!("💳️ Payment [{}] upserted to {}.", payment.merchant_payment_id, payment.status);
    Ok(payment)
}

pub async fn fetch_payment_by_merchant_id(
    merchant_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE merchant_payment_id = $1")
        .bind(merchant_payment_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_payments_for_owner(owner_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE owner_id = $1 ORDER BY created_at DESC")
        .bind(owner_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_all_payments(conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments ORDER BY created_at DESC").fetch_all(conn).await
}
