//! `yourmoment run` — start the coordinator and timeout enforcer loops and
//! block until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use yourmoment_core::broker::{BrokerHandle, SqliteBroker};
use yourmoment_core::config::Config;
use yourmoment_core::crypto::EncryptionKey;
use yourmoment_core::pipeline::{
    Coordinator, DiscoveryWorker, GenerationWorker, PostingWorker, PreparationWorker, TimeoutEnforcer,
};
use yourmoment_core::runtime::Runtime;
use yourmoment_core::scrape::UnconfiguredScrapeAdapter;
use yourmoment_core::storage;

pub async fn execute(config: &Config, status_interval: u64) -> anyhow::Result<()> {
    let pool = Arc::new(storage::init_db(&config.storage.db_path).await?);
    let crypto = Arc::new(EncryptionKey::from_env_var(&config.crypto.encryption_key_env)?);
    let broker: Arc<dyn BrokerHandle> = Arc::new(SqliteBroker::new(pool.clone()));
    let scrape: Arc<dyn yourmoment_core::scrape::ScrapeAdapter> = Arc::new(UnconfiguredScrapeAdapter);

    let discovery = Arc::new(DiscoveryWorker::new(pool.clone(), scrape.clone()));
    let preparation = Arc::new(PreparationWorker::new(
        pool.clone(),
        scrape.clone(),
        Duration::from_secs(config.timing.r_prep_seconds),
    ));
    let generation = Arc::new(GenerationWorker::new(
        pool.clone(),
        crypto,
        config.disclosure.ai_comment_prefix.clone(),
    ));
    let posting = Arc::new(PostingWorker::new(
        pool.clone(),
        scrape,
        Duration::from_secs(config.timing.r_post_seconds),
        config.limits.n_retry,
    ));

    let coordinator = Arc::new(Coordinator::new(
        pool.clone(),
        broker.clone(),
        discovery,
        preparation,
        generation,
        posting,
        Duration::from_secs(config.timing.t_trigger_seconds),
    ));
    let timeout_enforcer = Arc::new(TimeoutEnforcer::new(
        pool.clone(),
        broker,
        Duration::from_secs(config.timing.t_timeout_seconds),
    ));

    let mut runtime = Runtime::new();
    let cancel = runtime.cancel_token();

    {
        let coordinator = coordinator.clone();
        let cancel = cancel.clone();
        runtime.spawn("coordinator", async move { coordinator.run(cancel).await });
    }
    {
        let cancel = cancel.clone();
        runtime.spawn("timeout-enforcer", async move { timeout_enforcer.run(cancel).await });
    }

    if status_interval > 0 {
        let pool = pool.clone();
        let cancel = cancel.clone();
        runtime.spawn("status-reporter", async move {
            status_loop(pool, Duration::from_secs(status_interval), cancel).await;
        });
    }

    tracing::info!("yourmoment pipeline running");
    runtime.run_until_shutdown().await;
    Ok(())
}

async fn status_loop(
    pool: Arc<storage::DbPool>,
    interval: Duration,
    cancel: tokio_util::sync::CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                match yourmoment_core::storage::processes::list_running_processes(&pool).await {
                    Ok(running) => tracing::info!(running = running.len(), "status"),
                    Err(e) => tracing::warn!(error = %e, "status query failed"),
                }
            }
        }
    }
}
