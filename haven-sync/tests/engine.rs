//! End-to-end engine behavior against an in-memory store and a scriptable
//! remote authority.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use haven_sync::testing::MockRemote;
use haven_sync::{
    ItemStatus, LastWriteWins, ManualConnectivity, MemoryStore, Operation, PassOutcome,
    PassSummary, ResolverRegistry, RetryPolicy, SyncEngine, SyncQueue, SyncScheduler,
};

fn engine_with(
    remote: Arc<MockRemote>,
    resolvers: ResolverRegistry,
    retry: RetryPolicy,
) -> (Arc<SyncEngine>, Arc<SyncQueue>) {
    let queue = Arc::new(SyncQueue::new(Arc::new(MemoryStore::new())));
    let engine = Arc::new(SyncEngine::new(queue.clone(), remote, resolvers, retry));
    (engine, queue)
}

fn local_wins_registry(collection: &str) -> ResolverRegistry {
    let mut registry = ResolverRegistry::new();
    registry.register(collection, Arc::new(haven_sync::LocalWins));
    registry
}

fn summary(outcome: PassOutcome) -> PassSummary {
    match outcome {
        PassOutcome::Completed(summary) => summary,
        PassOutcome::Skipped => panic!("expected a completed pass"),
    }
}

#[tokio::test]
async fn eventual_drain_after_reconnect() {
    let remote = Arc::new(MockRemote::new());
    let (engine, queue) = engine_with(
        remote.clone(),
        ResolverRegistry::new(),
        RetryPolicy::new(10),
    );

    // Worked offline: everything queues, nothing reaches the remote.
    remote.fail_always(true);
    for i in 0..3 {
        queue
            .enqueue(
                Operation::Create,
                "residents",
                json!({"id": format!("res-{}", i), "name": format!("Resident {}", i)}),
            )
            .await
            .unwrap();
    }

    let offline = summary(engine.sync_now().await.unwrap());
    assert_eq!(offline.retried, 3);
    assert_eq!(engine.pending_count().await.unwrap(), 3);

    // Connectivity returns; the pending set converges to empty.
    remote.fail_always(false);
    let online = summary(engine.sync_now().await.unwrap());
    assert_eq!(online.synced, 3);
    assert_eq!(engine.pending_count().await.unwrap(), 0);
    assert_eq!(remote.collection_len("residents").await, 3);
}

#[tokio::test]
async fn idempotent_create_never_duplicates() {
    let remote = Arc::new(MockRemote::new());
    let (engine, queue) = engine_with(
        remote.clone(),
        local_wins_registry("residents"),
        RetryPolicy::default(),
    );

    queue
        .enqueue(
            Operation::Create,
            "residents",
            json!({"id": "res-1", "name": "Ada", "v": 1}),
        )
        .await
        .unwrap();
    summary(engine.sync_now().await.unwrap());

    queue
        .enqueue(
            Operation::Create,
            "residents",
            json!({"id": "res-1", "name": "Ada", "v": 2}),
        )
        .await
        .unwrap();
    let second = summary(engine.sync_now().await.unwrap());

    assert_eq!(second.synced, 1);
    assert_eq!(remote.collection_len("residents").await, 1);
    let record = remote.record("residents", "res-1").await.unwrap();
    assert_eq!(record["v"], 2);
}

#[tokio::test]
async fn per_entity_updates_apply_in_enqueue_order() {
    let remote = Arc::new(MockRemote::new());
    remote
        .insert("residents", "res-1", json!({"id": "res-1", "v": 0}))
        .await;

    let (engine, queue) = engine_with(
        remote.clone(),
        local_wins_registry("residents"),
        RetryPolicy::default(),
    );

    queue
        .enqueue(Operation::Update, "residents", json!({"id": "res-1", "v": 1}))
        .await
        .unwrap();
    queue
        .enqueue(Operation::Update, "residents", json!({"id": "res-1", "v": 2}))
        .await
        .unwrap();

    let pass = summary(engine.sync_now().await.unwrap());
    assert_eq!(pass.synced, 2);

    let record = remote.record("residents", "res-1").await.unwrap();
    assert_eq!(record["v"], 2, "the later update must win");
}

#[tokio::test]
async fn per_entity_order_survives_retry_interleaving() {
    let remote = Arc::new(MockRemote::new());
    remote
        .insert("residents", "res-1", json!({"id": "res-1", "v": 0}))
        .await;

    let (engine, queue) = engine_with(
        remote.clone(),
        local_wins_registry("residents"),
        RetryPolicy::new(10),
    );

    queue
        .enqueue(Operation::Update, "residents", json!({"id": "res-1", "v": 1}))
        .await
        .unwrap();
    queue
        .enqueue(Operation::Update, "residents", json!({"id": "res-1", "v": 2}))
        .await
        .unwrap();

    // First pass: the first item's fetch fails; the second must not jump
    // the queue for its entity.
    remote.fail_next(1);
    let first = summary(engine.sync_now().await.unwrap());
    assert_eq!(first.retried, 1);
    assert_eq!(first.deferred, 1);
    assert_eq!(remote.record("residents", "res-1").await.unwrap()["v"], 0);

    // Second pass: both apply, in enqueue order.
    let second = summary(engine.sync_now().await.unwrap());
    assert_eq!(second.synced, 2);

    assert_eq!(engine.pending_count().await.unwrap(), 0);
    assert_eq!(
        remote.record("residents", "res-1").await.unwrap()["v"],
        2,
        "the remote value must end at 2 regardless of retry interleavings"
    );
}

#[tokio::test]
async fn retry_exhaustion_is_terminal() {
    let remote = Arc::new(MockRemote::new());
    let (engine, queue) = engine_with(
        remote.clone(),
        ResolverRegistry::new(),
        RetryPolicy::new(3),
    );

    remote.fail_always(true);
    let id = queue
        .enqueue(Operation::Create, "residents", json!({"id": "res-1"}))
        .await
        .unwrap();

    for pass in 1..=3 {
        let result = summary(engine.sync_now().await.unwrap());
        assert_eq!(result.attempted, 1, "pass {} should attempt the item", pass);
    }

    let item = queue.get(&id).await.unwrap().unwrap();
    assert_eq!(item.status, ItemStatus::Failed);
    assert_eq!(item.retry_count, 3);
    assert!(item.error.is_some());

    // The fourth pass must not see the failed item.
    let fourth = summary(engine.sync_now().await.unwrap());
    assert_eq!(fourth.attempted, 0);
    assert_eq!(engine.failed_items().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_items_survive_until_operator_clears_them() {
    let remote = Arc::new(MockRemote::new());
    let (engine, queue) = engine_with(
        remote.clone(),
        ResolverRegistry::new(),
        RetryPolicy::new(1),
    );

    remote.fail_always(true);
    let id = queue
        .enqueue(Operation::Create, "residents", json!({"id": "res-1"}))
        .await
        .unwrap();
    summary(engine.sync_now().await.unwrap());
    assert_eq!(engine.failed_items().await.unwrap().len(), 1);

    // Manual retry puts it back in play with a fresh budget.
    remote.fail_always(false);
    queue.retry_failed(&id).await.unwrap();
    let drained = summary(engine.sync_now().await.unwrap());
    assert_eq!(drained.synced, 1);
    assert!(engine.failed_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn unregistered_collection_falls_back_to_remote_wins() {
    let remote = Arc::new(MockRemote::new());
    remote
        .insert("notes", "n-1", json!({"id": "n-1", "text": "server copy"}))
        .await;

    let (engine, queue) = engine_with(
        remote.clone(),
        ResolverRegistry::new(),
        RetryPolicy::default(),
    );

    queue
        .enqueue(Operation::Update, "notes", json!({"id": "n-1", "text": "local copy"}))
        .await
        .unwrap();
    let pass = summary(engine.sync_now().await.unwrap());

    assert_eq!(pass.discarded, 1);
    assert_eq!(pass.synced, 0);
    let record = remote.record("notes", "n-1").await.unwrap();
    assert_eq!(record["text"], "server copy");
    // The discard is silent to the caller: no failed items, nothing pending.
    assert_eq!(engine.pending_count().await.unwrap(), 0);
    assert!(engine.failed_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn last_write_wins_applies_newer_local() {
    let remote = Arc::new(MockRemote::new());
    // Remote was last modified long ago.
    remote
        .insert("rooms", "r-1", json!({"id": "r-1", "beds": 1, "updatedAt": 1000}))
        .await;

    let mut registry = ResolverRegistry::new();
    registry.register("rooms", Arc::new(LastWriteWins));
    let (engine, queue) = engine_with(remote.clone(), registry, RetryPolicy::default());

    queue
        .enqueue(Operation::Update, "rooms", json!({"id": "r-1", "beds": 2}))
        .await
        .unwrap();
    let pass = summary(engine.sync_now().await.unwrap());

    assert_eq!(pass.synced, 1);
    assert_eq!(remote.record("rooms", "r-1").await.unwrap()["beds"], 2);
}

#[tokio::test]
async fn delete_of_absent_record_completes() {
    let remote = Arc::new(MockRemote::new());
    let (engine, queue) = engine_with(
        remote.clone(),
        ResolverRegistry::new(),
        RetryPolicy::default(),
    );

    queue
        .enqueue(Operation::Delete, "residents", json!({"id": "res-gone"}))
        .await
        .unwrap();
    let pass = summary(engine.sync_now().await.unwrap());

    assert_eq!(pass.synced, 1);
    // Only the read-before-write went out; no DELETE call was issued.
    assert_eq!(remote.calls().await, vec!["GET residents/res-gone"]);
}

#[tokio::test]
async fn single_flight_coalesces_concurrent_triggers() {
    let remote = Arc::new(MockRemote::new());
    remote.set_latency(Some(Duration::from_millis(100))).await;

    let (engine, queue) = engine_with(
        remote.clone(),
        ResolverRegistry::new(),
        RetryPolicy::default(),
    );

    queue
        .enqueue(Operation::Create, "residents", json!({"id": "res-1"}))
        .await
        .unwrap();

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.sync_now().await.unwrap() })
    };
    // Give the first pass time to take the guard and block in the remote.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second = engine.sync_now().await.unwrap();
    assert_eq!(second, PassOutcome::Skipped);

    let first = first.await.unwrap();
    assert_eq!(summary(first).synced, 1);
}

#[tokio::test]
async fn enqueue_during_pass_waits_for_next_pass() {
    let remote = Arc::new(MockRemote::new());
    remote.set_latency(Some(Duration::from_millis(100))).await;

    let (engine, queue) = engine_with(
        remote.clone(),
        ResolverRegistry::new(),
        RetryPolicy::default(),
    );

    queue
        .enqueue(Operation::Create, "residents", json!({"id": "res-1"}))
        .await
        .unwrap();

    let pass = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.sync_now().await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Lands mid-pass: not part of the running snapshot.
    queue
        .enqueue(Operation::Create, "residents", json!({"id": "res-2"}))
        .await
        .unwrap();

    let first = summary(pass.await.unwrap());
    assert_eq!(first.attempted, 1);
    assert_eq!(first.synced, 1);
    assert_eq!(engine.pending_count().await.unwrap(), 1);

    remote.set_latency(None).await;
    let second = summary(engine.sync_now().await.unwrap());
    assert_eq!(second.attempted, 1);
    assert_eq!(engine.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn scheduler_triggers_on_reconnect() {
    let remote = Arc::new(MockRemote::new());
    let (engine, queue) = engine_with(
        remote.clone(),
        ResolverRegistry::new(),
        RetryPolicy::new(10),
    );

    // Offline: the immediate first tick fails the item once.
    remote.fail_always(true);
    queue
        .enqueue(Operation::Create, "residents", json!({"id": "res-1"}))
        .await
        .unwrap();

    let connectivity = ManualConnectivity::new(false);
    let scheduler = SyncScheduler::new(engine.clone(), Duration::from_secs(3600));
    let handle = scheduler.spawn(&connectivity);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.pending_count().await.unwrap(), 1);

    // Reconnect: the transition triggers a pass without waiting an hour.
    remote.fail_always(false);
    connectivity.set_online(true);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(engine.pending_count().await.unwrap(), 0);
    assert_eq!(remote.collection_len("residents").await, 1);

    scheduler.stop();
    handle.await.unwrap();
}
