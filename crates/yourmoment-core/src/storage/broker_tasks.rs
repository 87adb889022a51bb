//! Row-level storage for the `broker_tasks` table.
//!
//! This is the durable ledger backing [`crate::broker::SqliteBroker`]; it
//! knows nothing about queues-as-concepts beyond a name column, and every
//! function here is a single `UPDATE ... WHERE id = ?` or `SELECT`, per the
//! same short-session discipline as the rest of storage.

use super::DbPool;
use crate::error::StorageError;

/// A row in `broker_tasks`. `state` is stored as the enum's on-the-wire
/// string so the broker module owns the state machine semantics; this
/// layer only ever reads/writes the column.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrokerTaskRow {
    pub id: String,
    pub queue: String,
    pub process_id: String,
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Insert a new task row in `PENDING` state.
pub async fn insert_task(
    pool: &DbPool,
    id: &str,
    queue: &str,
    process_id: &str,
) -> Result<(), StorageError> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO broker_tasks (id, queue, process_id, state, created_at, updated_at) \
         VALUES (?, ?, ?, 'PENDING', ?, ?)",
    )
    .bind(id)
    .bind(queue)
    .bind(process_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Fetch a task row by id.
pub async fn get_task(pool: &DbPool, id: &str) -> Result<Option<BrokerTaskRow>, StorageError> {
    sqlx::query_as::<_, BrokerTaskRow>("SELECT * FROM broker_tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

/// Overwrite a task's state.
pub async fn set_task_state(pool: &DbPool, id: &str, state: &str) -> Result<(), StorageError> {
    sqlx::query("UPDATE broker_tasks SET state = ?, updated_at = ? WHERE id = ?")
        .bind(state)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Revoke every non-terminal task for a process, across all queues.
/// Idempotent: revoking an already-terminal task is a no-op.
pub async fn revoke_all_for_process(pool: &DbPool, process_id: &str) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE broker_tasks SET state = 'REVOKED', updated_at = ? \
         WHERE process_id = ? AND state IN ('PENDING', 'STARTED', 'RETRY')",
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(process_id)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;

    #[tokio::test]
    async fn insert_and_fetch_task() {
        let pool = init_test_db().await.expect("init db");
        insert_task(&pool, "task-1", "discovery", "p1").await.expect("insert");

        let task = get_task(&pool, "task-1").await.expect("get").expect("exists");
        assert_eq!(task.state, "PENDING");
        assert_eq!(task.queue, "discovery");
    }

    #[tokio::test]
    async fn set_state_updates_row() {
        let pool = init_test_db().await.expect("init db");
        insert_task(&pool, "task-1", "discovery", "p1").await.expect("insert");

        set_task_state(&pool, "task-1", "SUCCESS").await.expect("update");
        let task = get_task(&pool, "task-1").await.expect("get").expect("exists");
        assert_eq!(task.state, "SUCCESS");
    }

    #[tokio::test]
    async fn revoke_all_skips_terminal_tasks() {
        let pool = init_test_db().await.expect("init db");
        insert_task(&pool, "task-1", "discovery", "p1").await.expect("insert");
        insert_task(&pool, "task-2", "posting", "p1").await.expect("insert");
        set_task_state(&pool, "task-2", "SUCCESS").await.expect("update");

        revoke_all_for_process(&pool, "p1").await.expect("revoke");

        let t1 = get_task(&pool, "task-1").await.expect("get").expect("exists");
        let t2 = get_task(&pool, "task-2").await.expect("get").expect("exists");
        assert_eq!(t1.state, "REVOKED");
        assert_eq!(t2.state, "SUCCESS");
    }
}
