//! `yourmoment migrate` — run embedded schema migrations and exit.

use yourmoment_core::config::Config;
use yourmoment_core::storage;

pub async fn execute(config: &Config) -> anyhow::Result<()> {
    println!("Running migrations against {}", config.storage.db_path);
    storage::init_db(&config.storage.db_path).await?;
    println!("Migrations complete.");
    Ok(())
}
