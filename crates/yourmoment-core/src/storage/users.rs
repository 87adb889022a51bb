//! CRUD operations for user accounts.
//!
//! The core only reads users to validate ownership of referenced entities;
//! account creation and authentication are the API collaborator's concern.

use super::DbPool;
use crate::domain::User;
use crate::error::StorageError;

/// Fetch a user by id. Returns `None` if not found.
pub async fn get_user(pool: &DbPool, user_id: &str) -> Result<Option<User>, StorageError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

/// Insert a new user. Used by test setup and the API collaborator.
pub async fn insert_user(pool: &DbPool, user: &User) -> Result<(), StorageError> {
    sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at.to_rfc3339())
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;

    fn sample_user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            password_hash: "hash".to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_user() {
        let pool = init_test_db().await.expect("init db");
        let user = sample_user("u1");

        insert_user(&pool, &user).await.expect("insert");
        let fetched = get_user(&pool, "u1").await.expect("get").expect("exists");

        assert_eq!(fetched.email, "u1@example.com");
    }

    #[tokio::test]
    async fn missing_user_returns_none() {
        let pool = init_test_db().await.expect("init db");
        assert!(get_user(&pool, "nonexistent").await.expect("get").is_none());
    }
}
