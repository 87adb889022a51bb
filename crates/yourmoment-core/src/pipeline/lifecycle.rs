//! Process lifecycle operations: `start`, `stop`, `status`.
//!
//! Plain async functions rather than a trait or service struct — there is
//! no HTTP framing at this layer (that is the API collaborator's job), so
//! these are the narrowest possible surface the pipeline exposes upward,
//! the way `workflow/orchestrate.rs` exposes one function per operation
//! rather than a service object.

use std::sync::Arc;

use crate::broker::BrokerHandle;
use crate::domain::{MonitoringProcess, StopReason, WorkRecordStatus};
use crate::error::{PipelineError, StorageError};
use crate::storage::{action_log, llm_providers, processes, work_records, DbPool};

/// A `status(process_id)` snapshot: the process row plus its work record
/// counts by stage, for an operator or API collaborator to render.
#[derive(Debug, Clone)]
pub struct ProcessStatusView {
    pub process: MonitoringProcess,
    pub record_counts: std::collections::HashMap<WorkRecordStatus, i64>,
}

/// Start a `CREATED` process: validate it has at least one credential and
/// template configured, then transition it to `RUNNING` with an
/// `expires_at` computed from `max_duration_minutes`.
pub async fn start(pool: &DbPool, process_id: &str) -> Result<(), PipelineError> {
    let process = processes::get_process(pool, process_id)
        .await?
        .ok_or_else(|| StorageError::NotFound {
            entity: "MonitoringProcess",
            id: process_id.to_string(),
        })?;

    let credential_ids = processes::get_credential_ids(pool, process_id).await?;
    if credential_ids.is_empty() {
        return Err(PipelineError::InvalidProcessConfig {
            process_id: process_id.to_string(),
            reason: "no credentials configured".to_string(),
        });
    }
    let template_ids = processes::get_template_ids(pool, process_id).await?;
    if template_ids.is_empty() {
        return Err(PipelineError::InvalidProcessConfig {
            process_id: process_id.to_string(),
            reason: "no prompt templates configured".to_string(),
        });
    }
    match llm_providers::get_provider(pool, &process.llm_provider_id).await? {
        Some(provider) if provider.user_id == process.user_id => {}
        Some(_) => {
            return Err(PipelineError::InvalidProcessConfig {
                process_id: process_id.to_string(),
                reason: "llm provider does not belong to this user".to_string(),
            });
        }
        None => {
            return Err(PipelineError::InvalidProcessConfig {
                process_id: process_id.to_string(),
                reason: "llm provider not found".to_string(),
            });
        }
    }

    let started_at = chrono::Utc::now();
    let expires_at = started_at + chrono::Duration::minutes(process.max_duration_minutes);
    processes::mark_started(pool, process_id, started_at, expires_at).await?;
    action_log::log_action(pool, Some(process_id), None, "start", None).await?;
    Ok(())
}

/// Stop a running process: revoke all in-flight broker tasks, then mark it
/// `STOPPED` with `stop_reason=manual`.
pub async fn stop(pool: &DbPool, broker: &Arc<dyn BrokerHandle>, process_id: &str) -> Result<(), PipelineError> {
    processes::get_process(pool, process_id)
        .await?
        .ok_or_else(|| StorageError::NotFound {
            entity: "MonitoringProcess",
            id: process_id.to_string(),
        })?;

    broker.revoke_all_for_process(process_id).await?;
    processes::mark_stopped(pool, process_id, StopReason::Manual).await?;
    action_log::log_action(pool, Some(process_id), None, "stop", None).await?;
    Ok(())
}

/// Return a process's current state plus its work record counts by stage.
pub async fn status(pool: &DbPool, process_id: &str) -> Result<ProcessStatusView, PipelineError> {
    let process = processes::get_process(pool, process_id)
        .await?
        .ok_or_else(|| StorageError::NotFound {
            entity: "MonitoringProcess",
            id: process_id.to_string(),
        })?;
    let record_counts = work_records::status_counts(pool, process_id).await?;
    Ok(ProcessStatusView { process, record_counts })
}
