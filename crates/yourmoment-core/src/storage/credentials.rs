//! CRUD operations for upstream login credentials.

use super::DbPool;
use crate::domain::UpstreamCredential;
use crate::error::StorageError;

/// Insert a new credential. `password_encrypted` must already be the
/// ciphertext produced by a `CryptoAdapter`.
pub async fn insert_credential(
    pool: &DbPool,
    credential: &UpstreamCredential,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO upstream_credentials \
         (id, user_id, display_name, username, password_encrypted, is_active, created_at, last_used_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&credential.id)
    .bind(&credential.user_id)
    .bind(&credential.display_name)
    .bind(&credential.username)
    .bind(&credential.password_encrypted)
    .bind(credential.is_active)
    .bind(credential.created_at.to_rfc3339())
    .bind(credential.last_used_at.map(|t| t.to_rfc3339()))
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Fetch a credential by id. Returns `None` if not found.
pub async fn get_credential(
    pool: &DbPool,
    credential_id: &str,
) -> Result<Option<UpstreamCredential>, StorageError> {
    sqlx::query_as::<_, UpstreamCredential>("SELECT * FROM upstream_credentials WHERE id = ?")
        .bind(credential_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

/// Fetch a batch of credentials by id, for the read+cache pattern (§4.8.4).
pub async fn get_credentials_by_ids(
    pool: &DbPool,
    ids: &[String],
) -> Result<Vec<UpstreamCredential>, StorageError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let query = format!("SELECT * FROM upstream_credentials WHERE id IN ({placeholders})");
    let mut q = sqlx::query_as::<_, UpstreamCredential>(&query);
    for id in ids {
        q = q.bind(id);
    }
    q.fetch_all(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

/// Record that a credential was just used by a worker.
pub async fn touch_last_used(pool: &DbPool, credential_id: &str) -> Result<(), StorageError> {
    sqlx::query("UPDATE upstream_credentials SET last_used_at = ? WHERE id = ?")
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(credential_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;
    use crate::storage::users::insert_user;
    use crate::domain::User;

    async fn seed_user(pool: &DbPool, id: &str) {
        insert_user(
            pool,
            &User {
                id: id.to_string(),
                email: format!("{id}@example.com"),
                password_hash: "hash".to_string(),
                created_at: chrono::Utc::now(),
            },
        )
        .await
        .expect("seed user");
    }

    fn sample_credential(id: &str, user_id: &str) -> UpstreamCredential {
        UpstreamCredential {
            id: id.to_string(),
            user_id: user_id.to_string(),
            display_name: "main".to_string(),
            username: "writer1".to_string(),
            password_encrypted: vec![1, 2, 3],
            is_active: true,
            created_at: chrono::Utc::now(),
            last_used_at: None,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_credential() {
        let pool = init_test_db().await.expect("init db");
        seed_user(&pool, "u1").await;
        insert_credential(&pool, &sample_credential("c1", "u1"))
            .await
            .expect("insert");

        let fetched = get_credential(&pool, "c1").await.expect("get").expect("exists");
        assert_eq!(fetched.username, "writer1");
    }

    #[tokio::test]
    async fn batch_fetch_by_ids() {
        let pool = init_test_db().await.expect("init db");
        seed_user(&pool, "u1").await;
        insert_credential(&pool, &sample_credential("c1", "u1")).await.expect("insert");
        insert_credential(&pool, &sample_credential("c2", "u1")).await.expect("insert");

        let fetched = get_credentials_by_ids(&pool, &["c1".to_string(), "c2".to_string()])
            .await
            .expect("batch get");
        assert_eq!(fetched.len(), 2);
    }

    #[tokio::test]
    async fn empty_id_list_returns_empty() {
        let pool = init_test_db().await.expect("init db");
        let fetched = get_credentials_by_ids(&pool, &[]).await.expect("batch get");
        assert!(fetched.is_empty());
    }

    #[tokio::test]
    async fn touch_updates_last_used_at() {
        let pool = init_test_db().await.expect("init db");
        seed_user(&pool, "u1").await;
        insert_credential(&pool, &sample_credential("c1", "u1")).await.expect("insert");

        touch_last_used(&pool, "c1").await.expect("touch");
        let fetched = get_credential(&pool, "c1").await.expect("get").expect("exists");
        assert!(fetched.last_used_at.is_some());
    }
}
