//! `SqliteDatabase` is the database-backed storefront backend. It implements every trait in the [`crate::traits`]
//! module over a SQLite connection pool, and is selected whenever a database URL is configured at startup.

mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
