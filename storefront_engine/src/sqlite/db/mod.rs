//! # SQLite database methods
//!
//! "Low-level" SQLite interactions, maintained as simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers obtain a connection from a pool, or open a transaction and pass
//! `&mut *tx` when a sequence of calls must be atomic.

use std::{env, str::FromStr};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod carts;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/storefront.db";

pub fn db_url() -> String {
    let result = env::var("SPG_DATABASE_URL").unwrap_or_else(|_| {
        info!("SPG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    create_tables(&pool).await?;
    Ok(pool)
}

/// Idempotent schema bootstrap. The `UNIQUE` constraints on `orders.external_txid` and
/// `payments.merchant_payment_id` are load-bearing: they are the second line of defense for idempotent order
/// creation under concurrent notification delivery.
pub async fn create_tables(pool: &SqlitePool) -> Result<(), SqlxError> {
    const SCHEMA: [&str; 6] = [
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id             TEXT PRIMARY KEY,
            owner_id       TEXT,
            customer       TEXT NOT NULL,
            items          TEXT NOT NULL,
            subtotal       INTEGER NOT NULL,
            shipping       INTEGER NOT NULL,
            total          INTEGER NOT NULL,
            payment_status TEXT NOT NULL,
            status         TEXT NOT NULL DEFAULT 'Pending',
            gateway        TEXT NOT NULL,
            external_txid  TEXT UNIQUE,
            metadata       TEXT NOT NULL DEFAULT 'null',
            created_at     TIMESTAMP NOT NULL,
            updated_at     TIMESTAMP NOT NULL
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            merchant_payment_id TEXT NOT NULL UNIQUE,
            owner_id            TEXT,
            order_id            TEXT,
            gateway             TEXT NOT NULL,
            method              TEXT NOT NULL,
            amount              INTEGER NOT NULL,
            currency            TEXT NOT NULL,
            status              TEXT NOT NULL,
            external_txid       TEXT,
            payload             TEXT NOT NULL DEFAULT 'null',
            created_at          TIMESTAMP NOT NULL,
            updated_at          TIMESTAMP NOT NULL
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            price       INTEGER NOT NULL,
            category    TEXT NOT NULL DEFAULT '',
            sizes       TEXT NOT NULL DEFAULT '[]',
            colors      TEXT NOT NULL DEFAULT '[]',
            image       TEXT,
            featured    BOOLEAN NOT NULL DEFAULT 0,
            created_at  TIMESTAMP NOT NULL
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS carts (
            owner_id   TEXT PRIMARY KEY,
            items      TEXT NOT NULL DEFAULT '[]',
            subtotal   INTEGER NOT NULL DEFAULT 0,
            shipping   INTEGER NOT NULL DEFAULT 0,
            total      INTEGER NOT NULL DEFAULT 0,
            status     TEXT NOT NULL DEFAULT 'Active',
            updated_at TIMESTAMP NOT NULL
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            email         TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role          TEXT NOT NULL DEFAULT 'User',
            created_at    TIMESTAMP NOT NULL
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id TEXT NOT NULL,
            owner_id   TEXT,
            author     TEXT NOT NULL,
            rating     INTEGER NOT NULL,
            comment    TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP NOT NULL
        );
        "#,
    ];
    for stmt in SCHEMA {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}

pub(crate) fn is_unique_violation(e: &SqlxError) -> bool {
    match e {
        SqlxError::Database(db) => db.kind() == sqlx::error::ErrorKind::UniqueViolation,
        _ => false,
    }
}
