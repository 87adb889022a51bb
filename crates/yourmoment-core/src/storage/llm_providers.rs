//! CRUD operations for LLM provider configurations.

use super::DbPool;
use crate::domain::LlmProviderConfig;
use crate::error::StorageError;

/// Insert a new provider config. `api_key_encrypted` must already be ciphertext.
pub async fn insert_provider(
    pool: &DbPool,
    provider: &LlmProviderConfig,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO llm_provider_configs \
         (id, user_id, vendor_tag, model_name, api_key_encrypted, temperature, max_tokens, json_mode, is_active) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&provider.id)
    .bind(&provider.user_id)
    .bind(&provider.vendor_tag)
    .bind(&provider.model_name)
    .bind(&provider.api_key_encrypted)
    .bind(provider.temperature)
    .bind(provider.max_tokens)
    .bind(provider.json_mode)
    .bind(provider.is_active)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Fetch a provider config by id.
pub async fn get_provider(
    pool: &DbPool,
    provider_id: &str,
) -> Result<Option<LlmProviderConfig>, StorageError> {
    sqlx::query_as::<_, LlmProviderConfig>("SELECT * FROM llm_provider_configs WHERE id = ?")
        .bind(provider_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

/// Fetch a batch of provider configs by id, for the generation worker's
/// per-run config cache (§4.4 step 2).
pub async fn get_providers_by_ids(
    pool: &DbPool,
    ids: &[String],
) -> Result<Vec<LlmProviderConfig>, StorageError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let query = format!("SELECT * FROM llm_provider_configs WHERE id IN ({placeholders})");
    let mut q = sqlx::query_as::<_, LlmProviderConfig>(&query);
    for id in ids {
        q = q.bind(id);
    }
    q.fetch_all(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;
    use crate::storage::init_test_db;
    use crate::storage::users::insert_user;

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

    fn sample_provider(id: &str, user_id: &str) -> LlmProviderConfig {
        LlmProviderConfig {
            id: id.to_string(),
            user_id: user_id.to_string(),
            vendor_tag: "openai".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            api_key_encrypted: vec![9, 9, 9],
            temperature: 0.7,
            max_tokens: 512,
            json_mode: false,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_provider() {
        let pool = init_test_db().await.expect("init db");
        seed_user(&pool, "u1").await;
        insert_provider(&pool, &sample_provider("llm1", "u1")).await.expect("insert");

        let fetched = get_provider(&pool, "llm1").await.expect("get").expect("exists");
        assert_eq!(fetched.vendor_tag, "openai");
    }

    #[tokio::test]
    async fn batch_fetch_distinct_providers() {
        let pool = init_test_db().await.expect("init db");
        seed_user(&pool, "u1").await;
        insert_provider(&pool, &sample_provider("llm1", "u1")).await.expect("insert");
        insert_provider(&pool, &sample_provider("llm2", "u1")).await.expect("insert");

        let fetched = get_providers_by_ids(&pool, &["llm1".to_string(), "llm2".to_string()])
            .await
            .expect("batch get");
        assert_eq!(fetched.len(), 2);
    }
}
