//! The coordinator: every tick, makes sure each running process has a
//! live broker task dispatched for each of its active stages, and runs
//! whichever stage worker that task represents.
//!
//! A single periodic tick fans out per-stage work for every running
//! process, rather than running one continuous loop per stage kind;
//! in-flight state is tracked through the broker rather than an
//! in-process set.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::broker::{BrokerHandle, Queue, TaskState};
use crate::domain::Stage;
use crate::error::PipelineError;
use crate::pipeline::{DiscoveryWorker, GenerationWorker, PostingWorker, PreparationWorker};
use crate::storage::{processes, DbPool};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub spawned: usize,
    pub skipped: usize,
}

pub struct Coordinator {
    pool: Arc<DbPool>,
    broker: Arc<dyn BrokerHandle>,
    discovery: Arc<DiscoveryWorker>,
    preparation: Arc<PreparationWorker>,
    generation: Arc<GenerationWorker>,
    posting: Arc<PostingWorker>,
    tick_interval: Duration,
}

impl Coordinator {
    pub fn new(
        pool: Arc<DbPool>,
        broker: Arc<dyn BrokerHandle>,
        discovery: Arc<DiscoveryWorker>,
        preparation: Arc<PreparationWorker>,
        generation: Arc<GenerationWorker>,
        posting: Arc<PostingWorker>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            pool,
            broker,
            discovery,
            preparation,
            generation,
            posting,
            tick_interval,
        }
    }

    /// One coordinator tick, in isolation — exercised directly by tests;
    /// `run` below wraps it in the periodic loop.
    pub async fn dispatch_tick(self: &Arc<Self>) -> Result<DispatchSummary, PipelineError> {
        let running = processes::list_running_processes(&self.pool).await?;
        let mut summary = DispatchSummary::default();

        for process in running {
            let mut stage_task_ids = process.stage_task_ids.clone();
            let mut changed = false;

            for stage in process.active_stages() {
                let in_flight = match stage_task_ids.get(*stage) {
                    Some(task_id) => match self.broker.inspect(task_id).await {
                        Ok(Some(state)) => state.is_in_flight(),
                        Ok(None) => false,
                        Err(e) => {
                            tracing::warn!(process_id = %process.id, stage = %stage, error = %e, "broker inspect failed, treating as in-flight");
                            true
                        }
                    },
                    None => false,
                };

                if in_flight {
                    summary.skipped += 1;
                    continue;
                }

                let task_id = self.broker.enqueue(Queue::from(*stage), &process.id).await?;
                stage_task_ids.set(*stage, task_id.clone());
                changed = true;
                summary.spawned += 1;
                self.spawn_stage(*stage, process.id.clone(), task_id);
            }

            if changed {
                processes::set_stage_task_ids(&self.pool, &process.id, &stage_task_ids).await?;
            }
        }

        Ok(summary)
    }

    /// Run `stage`'s worker for `process_id` in the background, reporting
    /// its outcome back to the broker so the next tick sees a terminal
    /// state and re-dispatches.
    fn spawn_stage(self: &Arc<Self>, stage: Stage, process_id: String, task_id: String) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = match stage {
                Stage::Discovery => this.discovery.run_once(&process_id).await.map(|_| ()),
                Stage::Preparation => this.preparation.run_once(&process_id).await.map(|_| ()),
                Stage::Generation => this.generation.run_once(&process_id).await.map(|_| ()),
                Stage::Posting => this.posting.run_once(&process_id).await.map(|_| ()),
            };

            let final_state = match &result {
                Ok(()) => TaskState::Success,
                Err(e) => {
                    tracing::warn!(process_id = %process_id, stage = %stage, error = %e, "stage worker failed");
                    TaskState::Failure
                }
            };
            if let Err(e) = this.broker.complete(&task_id, final_state).await {
                tracing::warn!(task_id, error = %e, "failed to record broker task completion");
            }
        });
    }

    /// Run the coordinator loop until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.tick_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("coordinator shutting down");
                    return;
                }
                _ = interval.tick() => {
                    match self.dispatch_tick().await {
                        Ok(summary) => {
                            tracing::debug!(spawned = summary.spawned, skipped = summary.skipped, "coordinator tick");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "coordinator tick failed");
                        }
                    }
                }
            }
        }
    }
}
