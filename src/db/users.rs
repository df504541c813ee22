//! Queries against the `users` table.

use super::{DbPool, NewUser, User};

/// Find the user whose email equals `email` exactly.
///
/// The comparison is byte-for-byte: no case folding or trimming. `email`
/// is unique in the schema, so at most one row can match.
pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = ? LIMIT 1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn create(pool: &DbPool, user: NewUser) -> Result<User, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO users (id, name, email, password, role) VALUES (?, ?, ?, ?, ?)")
        .bind(&id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .execute(pool)
        .await?;

    sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}
