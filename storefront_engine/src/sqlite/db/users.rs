use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, User},
    helpers::new_user_id,
    sqlite::db::is_unique_violation,
    traits::PersistenceError,
};

pub async fn create_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, PersistenceError> {
    let result = sqlx::query_as::<_, User>(
        r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(new_user_id())
    .bind(&user.name)
    .bind(user.email.to_ascii_lowercase())
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(Utc::now())
    .fetch_one(conn)
    .await;
    match result {
        Ok(u) => Ok(u),
        Err(e) if is_unique_violation(&e) => Err(PersistenceError::DuplicateEmail(user.email)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_user_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = $1").bind(email.to_ascii_lowercase()).fetch_optional(conn).await
}

pub async fn fetch_user_by_id(id: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await
}
