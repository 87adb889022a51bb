//! CRUD operations for prompt templates.

use super::DbPool;
use crate::domain::PromptTemplate;
use crate::error::StorageError;

/// Insert a new prompt template.
pub async fn insert_template(pool: &DbPool, template: &PromptTemplate) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO prompt_templates \
         (id, owner_user_id, name, system_prompt, user_prompt_template, is_system) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&template.id)
    .bind(&template.owner_user_id)
    .bind(&template.name)
    .bind(&template.system_prompt)
    .bind(&template.user_prompt_template)
    .bind(template.is_system)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Fetch a template by id.
pub async fn get_template(
    pool: &DbPool,
    template_id: &str,
) -> Result<Option<PromptTemplate>, StorageError> {
    sqlx::query_as::<_, PromptTemplate>("SELECT * FROM prompt_templates WHERE id = ?")
        .bind(template_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

/// Fetch a batch of templates by id, for the generation worker's
/// per-run config cache (§4.4 step 2).
pub async fn get_templates_by_ids(
    pool: &DbPool,
    ids: &[String],
) -> Result<Vec<PromptTemplate>, StorageError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let query = format!("SELECT * FROM prompt_templates WHERE id IN ({placeholders})");
    let mut q = sqlx::query_as::<_, PromptTemplate>(&query);
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
    use crate::storage::init_test_db;

    fn sample_template(id: &str) -> PromptTemplate {
        PromptTemplate {
            id: id.to_string(),
            owner_user_id: None,
            name: "default".to_string(),
            system_prompt: "You are a helpful commenter.".to_string(),
            user_prompt_template: "Comment on {article_title} by {article_author}.".to_string(),
            is_system: true,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_template() {
        let pool = init_test_db().await.expect("init db");
        insert_template(&pool, &sample_template("t1")).await.expect("insert");

        let fetched = get_template(&pool, "t1").await.expect("get").expect("exists");
        assert_eq!(fetched.name, "default");
        assert!(fetched.owner_user_id.is_none());
    }

    #[tokio::test]
    async fn batch_fetch_templates() {
        let pool = init_test_db().await.expect("init db");
        insert_template(&pool, &sample_template("t1")).await.expect("insert");
        insert_template(&pool, &sample_template("t2")).await.expect("insert");

        let fetched = get_templates_by_ids(&pool, &["t1".to_string(), "t2".to_string()])
            .await
            .expect("batch get");
        assert_eq!(fetched.len(), 2);
    }
}
