//! The `MonitoringProcess` entity and its lifecycle.

use super::ProcessFilters;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state of a `MonitoringProcess`.
///
/// Only `Running` processes are considered by the coordinator and the
/// timeout enforcer. `status=Running ⇒ started_at ∧ expires_at` are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessStatus {
    Created,
    Running,
    Stopped,
    Completed,
    Failed,
}

impl ProcessStatus {
    /// Whether the coordinator and timeout enforcer should act on this process.
    pub fn is_running(self) -> bool {
        matches!(self, ProcessStatus::Running)
    }
}

/// Why a `RUNNING` process transitioned to `STOPPED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    /// The timeout enforcer stopped the process after `expires_at`.
    Timeout,
    /// An operator called `stop(process_id)`.
    Manual,
}

/// One of the four stages a `MonitoringProcess` dispatches broker tasks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Discovery,
    Preparation,
    Generation,
    Posting,
}

impl Stage {
    /// All stages, in pipeline order.
    pub const ALL: [Stage; 4] = [
        Stage::Discovery,
        Stage::Preparation,
        Stage::Generation,
        Stage::Posting,
    ];

    /// The broker queue name this stage dispatches to.
    pub fn queue_name(self) -> &'static str {
        match self {
            Stage::Discovery => "discovery",
            Stage::Preparation => "preparation",
            Stage::Generation => "generation",
            Stage::Posting => "posting",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.queue_name())
    }
}

/// The broker task id currently dispatched for each stage, if any.
///
/// `generate_only ⇒ posting` is always `None`. Stored as a JSON `TEXT`
/// column (`stage_task_ids_json`) since it is read and written wholesale by
/// the coordinator and timeout enforcer, never queried column-by-column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTaskIds {
    #[serde(default)]
    pub discovery: Option<String>,
    #[serde(default)]
    pub preparation: Option<String>,
    #[serde(default)]
    pub generation: Option<String>,
    #[serde(default)]
    pub posting: Option<String>,
}

impl StageTaskIds {
    /// Parse from the stored JSON representation.
    pub fn from_json(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        serde_json::from_str(raw).unwrap_or_default()
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Read the task id currently recorded for `stage`.
    pub fn get(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Discovery => self.discovery.as_deref(),
            Stage::Preparation => self.preparation.as_deref(),
            Stage::Generation => self.generation.as_deref(),
            Stage::Posting => self.posting.as_deref(),
        }
    }

    /// Record a freshly dispatched task id for `stage`.
    pub fn set(&mut self, stage: Stage, task_id: String) {
        match stage {
            Stage::Discovery => self.discovery = Some(task_id),
            Stage::Preparation => self.preparation = Some(task_id),
            Stage::Generation => self.generation = Some(task_id),
            Stage::Posting => self.posting = Some(task_id),
        }
    }

    /// All non-empty task ids, e.g. for a revoke-all sweep.
    pub fn all_ids(&self) -> Vec<(Stage, String)> {
        Stage::ALL
            .into_iter()
            .filter_map(|s| self.get(s).map(|id| (s, id.to_string())))
            .collect()
    }
}

/// Pipeline throughput counters for a `MonitoringProcess`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessCounters {
    pub articles_discovered: i64,
    pub articles_prepared: i64,
    pub comments_generated: i64,
    pub comments_posted: i64,
    #[serde(default)]
    pub errors_by_stage: HashMap<String, i64>,
}

/// A configured, possibly-running, instance of the monitoring pipeline.
///
/// `credential_ids` and `template_ids` are many-to-many relations kept in
/// the `process_credentials`/`process_templates` join tables, not as
/// columns on this struct — see `crate::storage::processes`.
#[derive(Debug, Clone)]
pub struct MonitoringProcess {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub llm_provider_id: String,
    pub filters: ProcessFilters,
    pub generate_only: bool,
    pub max_duration_minutes: i64,
    pub status: ProcessStatus,
    pub stop_reason: Option<StopReason>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub stopped_at: Option<chrono::DateTime<chrono::Utc>>,
    pub stage_task_ids: StageTaskIds,
    pub counters: ProcessCounters,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl MonitoringProcess {
    /// Stages this process dispatches — all four, unless `generate_only`.
    pub fn active_stages(&self) -> &'static [Stage] {
        if self.generate_only {
            &Stage::ALL[..3]
        } else {
            &Stage::ALL[..]
        }
    }
}
