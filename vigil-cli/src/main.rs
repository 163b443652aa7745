mod cli;
mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use vigil_cooldown::CooldownController;
use vigil_queue::QueueClient;
use vigil_store::CheckStore;
use vigil_types::QueueWorker;
use vigil_worker::{Coordinator, SteamApiExecutor, TokioSleeper};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = cli::Args::parse();
    let config = config::load(args.config.as_deref());

    let instance_id = args
        .instance_id
        .or_else(|| config.queue.as_ref().and_then(|q| q.instance_id.clone()))
        .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
    tracing::info!(instance_id, "starting vigil");

    let queue_client = config.queue.as_ref().map(|q| {
        Arc::new(QueueClient::new(q.base_url.clone(), q.api_key.clone(), instance_id.clone()))
    });

    let store = Arc::new(CheckStore::new(
        config.check_store_path.clone(),
        queue_client.clone().map(|q| q as Arc<dyn vigil_types::QueueCompleter>),
    ));

    let cooldowns = Arc::new(CooldownController::new(
        config.cooldown_store_path.clone(),
        config.cooldown_durations.clone().into(),
        config.backoff_minutes.clone(),
    ));

    let executor = Arc::new(SteamApiExecutor::new(config.steam_api_base_url.clone()));

    let coordinator = Arc::new(Coordinator::with_claim_batch_size(
        store,
        cooldowns,
        queue_client.map(|q| q as Arc<dyn QueueWorker>),
        executor,
        None,
        Arc::new(TokioSleeper),
        config.claim_batch_size,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let run_handle = tokio::spawn(coordinator.run(
        Duration::from_millis(config.poll_interval_ms),
        Duration::from_millis(config.sweep_interval_ms),
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    shutdown_tx.send(true).ok();
    run_handle.await?;

    Ok(())
}
