//! The work broker: durable, ID-addressable task state for the coordinator.
//!
//! A `BrokerHandle` port trait plus a SQLite-backed implementation over
//! `storage::broker_tasks`, read and written with the same single-row
//! `UPDATE ... WHERE id = ?` discipline as the rest of storage, giving
//! every dispatched task an inspectable, revocable state independent of
//! the in-process task list that runs it.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::BrokerError;
use crate::storage::{broker_tasks, DbPool};

/// Named queues a task can be enqueued onto. Stored as the row's `queue`
/// column, restricted to the stages this crate actually dispatches;
/// timeout enforcement and external scheduling are separate concerns with
/// no queue of their own here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    Discovery,
    Preparation,
    Generation,
    Posting,
}

impl Queue {
    pub fn name(self) -> &'static str {
        match self {
            Queue::Discovery => "discovery",
            Queue::Preparation => "preparation",
            Queue::Generation => "generation",
            Queue::Posting => "posting",
        }
    }
}

impl From<crate::domain::Stage> for Queue {
    fn from(stage: crate::domain::Stage) -> Self {
        match stage {
            crate::domain::Stage::Discovery => Queue::Discovery,
            crate::domain::Stage::Preparation => Queue::Preparation,
            crate::domain::Stage::Generation => Queue::Generation,
            crate::domain::Stage::Posting => Queue::Posting,
        }
    }
}

/// A task's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Started,
    Success,
    Failure,
    Retry,
    Revoked,
}

impl TaskState {
    /// `PENDING | STARTED | RETRY` — the coordinator treats these as
    /// "in flight" and will not dispatch a fresh task for the same stage.
    pub fn is_in_flight(self) -> bool {
        matches!(self, TaskState::Pending | TaskState::Started | TaskState::Retry)
    }

    fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Started => "STARTED",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
            TaskState::Retry => "RETRY",
            TaskState::Revoked => "REVOKED",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(TaskState::Pending),
            "STARTED" => Some(TaskState::Started),
            "SUCCESS" => Some(TaskState::Success),
            "FAILURE" => Some(TaskState::Failure),
            "RETRY" => Some(TaskState::Retry),
            "REVOKED" => Some(TaskState::Revoked),
            _ => None,
        }
    }
}

/// Port over the task broker. Object-safe, `Send + Sync`.
#[async_trait]
pub trait BrokerHandle: Send + Sync {
    /// Durably enqueue a task for `process_id` on `queue`. Returns the new task id.
    async fn enqueue(&self, queue: Queue, process_id: &str) -> Result<String, BrokerError>;

    /// Look up a task's current state. `None` if the task id is unknown.
    async fn inspect(&self, task_id: &str) -> Result<Option<TaskState>, BrokerError>;

    /// Mark a task `REVOKED`. Idempotent: revoking an already-terminal task is a no-op.
    async fn revoke(&self, task_id: &str) -> Result<(), BrokerError>;

    /// Revoke every non-terminal task belonging to a process, across all
    /// queues — used by the timeout enforcer and manual stop.
    async fn revoke_all_for_process(&self, process_id: &str) -> Result<(), BrokerError>;

    /// Record a task's outcome once a stage worker finishes running it.
    async fn complete(&self, task_id: &str, state: TaskState) -> Result<(), BrokerError>;
}

/// A `BrokerHandle` backed by the `broker_tasks` SQLite table.
pub struct SqliteBroker {
    pool: Arc<DbPool>,
}

impl SqliteBroker {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BrokerHandle for SqliteBroker {
    async fn enqueue(&self, queue: Queue, process_id: &str) -> Result<String, BrokerError> {
        let task_id = uuid::Uuid::new_v4().to_string();
        broker_tasks::insert_task(&self.pool, &task_id, queue.name(), process_id).await?;
        Ok(task_id)
    }

    async fn inspect(&self, task_id: &str) -> Result<Option<TaskState>, BrokerError> {
        let row = broker_tasks::get_task(&self.pool, task_id).await?;
        Ok(row.and_then(|r| TaskState::parse(&r.state)))
    }

    async fn revoke(&self, task_id: &str) -> Result<(), BrokerError> {
        let row = broker_tasks::get_task(&self.pool, task_id)
            .await?
            .ok_or_else(|| BrokerError::TaskNotFound {
                task_id: task_id.to_string(),
            })?;
        if let Some(state) = TaskState::parse(&row.state) {
            if !state.is_in_flight() {
                return Ok(());
            }
        }
        broker_tasks::set_task_state(&self.pool, task_id, TaskState::Revoked.as_str()).await?;
        Ok(())
    }

    async fn revoke_all_for_process(&self, process_id: &str) -> Result<(), BrokerError> {
        broker_tasks::revoke_all_for_process(&self.pool, process_id).await?;
        Ok(())
    }

    async fn complete(&self, task_id: &str, state: TaskState) -> Result<(), BrokerError> {
        broker_tasks::set_task_state(&self.pool, task_id, state.as_str()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;

    #[tokio::test]
    async fn enqueue_starts_pending_and_in_flight() {
        let pool = Arc::new(init_test_db().await.expect("init db"));
        let broker = SqliteBroker::new(pool);

        let task_id = broker.enqueue(Queue::Discovery, "p1").await.expect("enqueue");
        let state = broker.inspect(&task_id).await.expect("inspect").expect("exists");
        assert_eq!(state, TaskState::Pending);
        assert!(state.is_in_flight());
    }

    #[tokio::test]
    async fn complete_transitions_out_of_in_flight() {
        let pool = Arc::new(init_test_db().await.expect("init db"));
        let broker = SqliteBroker::new(pool);

        let task_id = broker.enqueue(Queue::Posting, "p1").await.expect("enqueue");
        broker.complete(&task_id, TaskState::Success).await.expect("complete");

        let state = broker.inspect(&task_id).await.expect("inspect").expect("exists");
        assert_eq!(state, TaskState::Success);
        assert!(!state.is_in_flight());
    }

    #[tokio::test]
    async fn revoke_is_idempotent_on_terminal_task() {
        let pool = Arc::new(init_test_db().await.expect("init db"));
        let broker = SqliteBroker::new(pool);

        let task_id = broker.enqueue(Queue::Generation, "p1").await.expect("enqueue");
        broker.complete(&task_id, TaskState::Failure).await.expect("complete");

        broker.revoke(&task_id).await.expect("revoke");
        let state = broker.inspect(&task_id).await.expect("inspect").expect("exists");
        assert_eq!(state, TaskState::Failure);
    }

    #[tokio::test]
    async fn revoke_all_for_process_only_touches_in_flight() {
        let pool = Arc::new(init_test_db().await.expect("init db"));
        let broker = SqliteBroker::new(pool);

        let t1 = broker.enqueue(Queue::Discovery, "p1").await.expect("enqueue");
        let t2 = broker.enqueue(Queue::Posting, "p1").await.expect("enqueue");
        broker.complete(&t2, TaskState::Success).await.expect("complete");

        broker.revoke_all_for_process("p1").await.expect("revoke all");

        assert_eq!(broker.inspect(&t1).await.expect("inspect").unwrap(), TaskState::Revoked);
        assert_eq!(broker.inspect(&t2).await.expect("inspect").unwrap(), TaskState::Success);
    }

    #[tokio::test]
    async fn inspect_unknown_task_returns_none() {
        let pool = Arc::new(init_test_db().await.expect("init db"));
        let broker = SqliteBroker::new(pool);
        assert!(broker.inspect("unknown").await.expect("inspect").is_none());
    }
}
