//! Minimal wiring of the sync engine: SQLite-backed queue, REST remote,
//! reachability probe, and the background scheduler.
//!
//! Run with `RUST_LOG=debug cargo run --example offline_sync`.

use std::sync::Arc;
use std::time::Duration;

use haven_sync::{
    HttpProbeConnectivity, HttpRemote, LastWriteWins, Operation, ResolverRegistry, SqliteStore,
    SyncConfig, SyncEngine, SyncQueue, SyncScheduler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SyncConfig::load("haven-sync.toml")?;

    let store = Arc::new(SqliteStore::open("haven-sync.db")?);
    let queue = Arc::new(SyncQueue::new(store).with_max_size(config.max_queue_size));

    let mut resolvers = ResolverRegistry::new();
    resolvers.register("residents", Arc::new(LastWriteWins));

    let remote = Arc::new(HttpRemote::new("http://localhost:8080"));
    let engine = Arc::new(SyncEngine::new(
        queue.clone(),
        remote,
        resolvers,
        config.retry_policy(),
    ));

    // A mutation made while possibly offline: queued now, synced later.
    queue
        .enqueue(
            Operation::Update,
            "residents",
            serde_json::json!({"id": "res-17", "room": "B12"}),
        )
        .await?;

    let probe_url = config
        .probe_url
        .clone()
        .unwrap_or_else(|| "http://localhost:8080/health".to_string());
    let connectivity = Arc::new(HttpProbeConnectivity::new(probe_url, config.probe_interval()));
    let probe_handle = connectivity.clone().spawn();

    let scheduler = SyncScheduler::new(engine.clone(), config.sync_interval());
    let scheduler_handle = scheduler.spawn(connectivity.as_ref());

    tokio::time::sleep(Duration::from_secs(5)).await;
    println!("pending mutations: {}", engine.pending_count().await?);
    for item in engine.failed_items().await? {
        println!("failed: {} ({})", item.id, item.error.unwrap_or_default());
    }

    scheduler.stop();
    scheduler_handle.await?;
    probe_handle.abort();
    Ok(())
}
