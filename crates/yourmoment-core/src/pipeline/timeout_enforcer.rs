//! The timeout enforcer: every tick, stops any `RUNNING` process whose
//! `expires_at` has passed, revoking its in-flight broker tasks first.
//!
//! Grounded in the same periodic-tick shape as the coordinator
//! (`automation::Runtime`); the only difference is what it does to a
//! process it finds due — revoke-then-stop instead of dispatch.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::broker::BrokerHandle;
use crate::domain::StopReason;
use crate::error::PipelineError;
use crate::storage::{action_log, processes, DbPool};

pub struct TimeoutEnforcer {
    pool: Arc<DbPool>,
    broker: Arc<dyn BrokerHandle>,
    tick_interval: Duration,
}

impl TimeoutEnforcer {
    pub fn new(pool: Arc<DbPool>, broker: Arc<dyn BrokerHandle>, tick_interval: Duration) -> Self {
        Self {
            pool,
            broker,
            tick_interval,
        }
    }

    /// Stop every running process whose `expires_at` has passed. Returns
    /// the number of processes stopped.
    pub async fn tick_once(&self) -> Result<usize, PipelineError> {
        let running = processes::list_running_processes(&self.pool).await?;
        let now = chrono::Utc::now();
        let mut stopped = 0;

        for process in running {
            let Some(expires_at) = process.expires_at else {
                continue;
            };
            if now < expires_at {
                continue;
            }

            self.broker.revoke_all_for_process(&process.id).await?;
            processes::mark_stopped(&self.pool, &process.id, StopReason::Timeout).await?;
            action_log::log_action(&self.pool, Some(&process.id), None, "timeout_stop", None).await?;
            tracing::info!(process_id = %process.id, "process stopped on timeout");
            stopped += 1;
        }

        Ok(stopped)
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.tick_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("timeout enforcer shutting down");
                    return;
                }
                _ = interval.tick() => {
                    match self.tick_once().await {
                        Ok(stopped) if stopped > 0 => {
                            tracing::info!(stopped, "timeout enforcer tick");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "timeout enforcer tick failed"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{Queue, SqliteBroker, TaskState};
    use crate::domain::{LlmProviderConfig, MonitoringProcess, ProcessFilters, ProcessStatus, StageTaskIds, User};
    use crate::storage::{init_test_db, llm_providers, users};

    async fn seed_process(pool: &DbPool, expires_at: chrono::DateTime<chrono::Utc>) {
        let now = chrono::Utc::now();
        users::insert_user(
            pool,
            &User {
                id: "u1".to_string(),
                email: "u1@example.com".to_string(),
                password_hash: "hash".to_string(),
                created_at: now,
            },
        )
        .await
        .unwrap();
        llm_providers::insert_provider(
            pool,
            &LlmProviderConfig {
                id: "llm1".to_string(),
                user_id: "u1".to_string(),
                vendor_tag: "openai".to_string(),
                model_name: "gpt-4o-mini".to_string(),
                api_key_encrypted: vec![0u8; 32],
                temperature: 0.7,
                max_tokens: 256,
                json_mode: false,
                is_active: true,
            },
        )
        .await
        .unwrap();
        processes::insert_process(
            pool,
            &MonitoringProcess {
                id: "p1".to_string(),
                user_id: "u1".to_string(),
                name: "test".to_string(),
                description: None,
                llm_provider_id: "llm1".to_string(),
                filters: ProcessFilters::default(),
                generate_only: false,
                max_duration_minutes: 60,
                status: ProcessStatus::Running,
                stop_reason: None,
                started_at: Some(now),
                expires_at: Some(expires_at),
                stopped_at: None,
                stage_task_ids: StageTaskIds::default(),
                counters: Default::default(),
                error_message: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn expired_process_is_stopped_and_tasks_revoked() {
        let pool = Arc::new(init_test_db().await.unwrap());
        seed_process(&pool, chrono::Utc::now() - chrono::Duration::minutes(1)).await;

        let broker: Arc<dyn BrokerHandle> = Arc::new(SqliteBroker::new(pool.clone()));
        let task_id = broker.enqueue(Queue::Discovery, "p1").await.unwrap();
        processes::set_stage_task_ids(
            &pool,
            "p1",
            &{
                let mut ids = StageTaskIds::default();
                ids.set(crate::domain::Stage::Discovery, task_id.clone());
                ids
            },
        )
        .await
        .unwrap();

        let enforcer = TimeoutEnforcer::new(pool.clone(), broker.clone(), Duration::from_millis(50));
        let stopped = enforcer.tick_once().await.unwrap();
        assert_eq!(stopped, 1);

        let process = processes::get_process(&pool, "p1").await.unwrap().unwrap();
        assert_eq!(process.status, ProcessStatus::Stopped);
        assert_eq!(process.stop_reason, Some(StopReason::Timeout));

        let state = broker.inspect(&task_id).await.unwrap().unwrap();
        assert_eq!(state, TaskState::Revoked);
    }

    #[tokio::test]
    async fn process_not_yet_expired_is_left_running() {
        let pool = Arc::new(init_test_db().await.unwrap());
        seed_process(&pool, chrono::Utc::now() + chrono::Duration::minutes(30)).await;

        let broker: Arc<dyn BrokerHandle> = Arc::new(SqliteBroker::new(pool.clone()));
        let enforcer = TimeoutEnforcer::new(pool.clone(), broker, Duration::from_millis(50));

        let stopped = enforcer.tick_once().await.unwrap();
        assert_eq!(stopped, 0);

        let process = processes::get_process(&pool, "p1").await.unwrap().unwrap();
        assert_eq!(process.status, ProcessStatus::Running);
    }
}
