use std::future::{Future, poll_fn};
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use tokio::sync::watch;
use uuid::Uuid;

use engine::{
    ActionPayload, CreateExpenseCmd, Engine, MAX_RETRIES, MutationQueue, RecordPaymentCmd,
    SyncOrchestrator,
};
use migration::MigratorTrait;

async fn fresh_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn orchestrator_with_group() -> (Arc<Engine>, SyncOrchestrator, Uuid) {
    let db = fresh_db().await;
    let backend = db.get_database_backend();
    for username in ["alice", "bob"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![username.into(), "password".into()],
        ))
        .await
        .unwrap();
    }

    let engine = Arc::new(Engine::builder().database(db).build().await.unwrap());
    let group_id = engine.create_group("Trip", "alice").await.unwrap();
    engine.add_member(group_id, "bob", "alice").await.unwrap();

    // The queue lives in its own local database.
    let queue = Arc::new(MutationQueue::new(fresh_db().await));
    let sync = SyncOrchestrator::new(engine.clone(), queue);
    (engine, sync, group_id)
}

fn create_expense_payload(group_id: Uuid, key: &str) -> ActionPayload {
    ActionPayload::CreateExpense(
        CreateExpenseCmd::new(group_id, "alice", "Dinner", 3000)
            .split("bob", 3000)
            .idempotency_key(key),
    )
}

#[tokio::test]
async fn queue_preserves_enqueue_order() {
    let (_engine, sync, group_id) = orchestrator_with_group().await;
    let queue = sync.queue();

    let first = queue
        .enqueue(&create_expense_payload(group_id, "k-1"))
        .await
        .unwrap();
    let second = queue
        .enqueue(&create_expense_payload(group_id, "k-2"))
        .await
        .unwrap();
    let third = queue
        .enqueue(&ActionPayload::RecordPayment(RecordPaymentCmd::new(
            group_id, "bob", "bob", "alice", 1000,
        )))
        .await
        .unwrap();
    assert!(first < second && second < third);

    let pending = queue.pending().await.unwrap();
    let ids: Vec<i64> = pending.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![first, second, third]);
    assert!(pending.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    assert!(pending.iter().all(|a| a.retry_count == 0));
}

#[tokio::test]
async fn drain_replays_in_fifo_order() {
    let (engine, sync, group_id) = orchestrator_with_group().await;

    // The payment only succeeds if the expense it settles was replayed
    // first.
    sync.queue()
        .enqueue(&create_expense_payload(group_id, "k-1"))
        .await
        .unwrap();
    sync.queue()
        .enqueue(&ActionPayload::RecordPayment(RecordPaymentCmd::new(
            group_id, "bob", "bob", "alice", 1000,
        )))
        .await
        .unwrap();

    let report = sync.sync_pending().await.unwrap().unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 0);

    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].amount_minor, 2000);

    assert_eq!(sync.queue().len().await.unwrap(), 0);
    assert!(!sync.is_syncing());
}

#[tokio::test]
async fn replaying_the_same_action_twice_does_not_double_apply() {
    let (engine, sync, group_id) = orchestrator_with_group().await;

    sync.queue()
        .enqueue(&create_expense_payload(group_id, "offline-1"))
        .await
        .unwrap();
    sync.sync_pending().await.unwrap().unwrap();

    // Simulate a false failure: the backend write landed but the action was
    // re-enqueued instead of removed.
    sync.queue()
        .enqueue(&create_expense_payload(group_id, "offline-1"))
        .await
        .unwrap();
    let report = sync.sync_pending().await.unwrap().unwrap();
    assert_eq!(report.succeeded, 1);

    let expenses = engine.list_expenses(group_id, "alice", 50).await.unwrap();
    assert_eq!(expenses.len(), 1);
    let balances = engine.balances_for_group(group_id, "alice").await.unwrap();
    assert_eq!(balances[0].amount_minor, 3000);
}

#[tokio::test]
async fn failing_action_is_dropped_after_max_retries() {
    let (_engine, sync, _group_id) = orchestrator_with_group().await;

    // References a group that does not exist, so every replay fails.
    let orphan_group = Uuid::new_v4();
    sync.queue()
        .enqueue(&create_expense_payload(orphan_group, "k-1"))
        .await
        .unwrap();

    for attempt in 1..=MAX_RETRIES {
        let report = sync.sync_pending().await.unwrap().unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(sync.queue().len().await.unwrap(), 1);
        let pending = sync.queue().pending().await.unwrap();
        assert_eq!(pending[0].retry_count, attempt);
    }

    // The fourth drain drops the action without attempting it again.
    let report = sync.sync_pending().await.unwrap().unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(sync.queue().len().await.unwrap(), 0);

    // And the queue stays empty afterwards: no fourth attempt ever runs.
    let report = sync.sync_pending().await.unwrap().unwrap();
    assert_eq!(report.attempted, 0);
}

#[tokio::test]
async fn mixed_outcomes_are_reported_per_action() {
    let (_engine, sync, group_id) = orchestrator_with_group().await;

    sync.queue()
        .enqueue(&create_expense_payload(group_id, "good"))
        .await
        .unwrap();
    sync.queue()
        .enqueue(&create_expense_payload(Uuid::new_v4(), "bad"))
        .await
        .unwrap();

    let report = sync.sync_pending().await.unwrap().unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(sync.queue().len().await.unwrap(), 1);
}

#[tokio::test]
async fn drain_invalidates_cached_settlement_plans() {
    let (engine, sync, group_id) = orchestrator_with_group().await;

    let before = engine.settlement_plan(group_id, "alice").await.unwrap();
    assert!(before.transfers.is_empty());

    sync.queue()
        .enqueue(&create_expense_payload(group_id, "k-1"))
        .await
        .unwrap();
    sync.sync_pending().await.unwrap().unwrap();

    let after = engine.settlement_plan(group_id, "alice").await.unwrap();
    assert_eq!(after.transfers.len(), 1);
    assert_eq!(after.transfers[0].from, "bob");
    assert_eq!(after.transfers[0].to, "alice");
    assert_eq!(after.transfers[0].amount.cents(), 3000);
}

#[tokio::test]
async fn a_drain_in_flight_ignores_concurrent_requests() {
    let (_engine, sync, group_id) = orchestrator_with_group().await;
    sync.queue()
        .enqueue(&create_expense_payload(group_id, "k-1"))
        .await
        .unwrap();

    // Drive the first drain up to its first await; the guard is taken
    // before any I/O happens.
    let first = sync.sync_pending();
    tokio::pin!(first);
    let early = poll_fn(|cx| {
        Poll::Ready(match first.as_mut().poll(cx) {
            Poll::Ready(done) => Some(done),
            Poll::Pending => None,
        })
    })
    .await;

    match early {
        None => {
            assert!(sync.is_syncing());
            // A second caller is turned away, not queued.
            assert_eq!(sync.sync_pending().await.unwrap(), None);
            let report = first.await.unwrap().unwrap();
            assert_eq!(report.succeeded, 1);
        }
        Some(done) => {
            // The drain resolved on its very first poll; there was no
            // in-flight window left to observe.
            assert_eq!(done.unwrap().unwrap().succeeded, 1);
        }
    }
    assert!(!sync.is_syncing());
}

#[tokio::test]
async fn online_transition_drains_the_queue() {
    let (engine, sync, group_id) = orchestrator_with_group().await;
    let sync = Arc::new(sync);
    sync.queue()
        .enqueue(&create_expense_payload(group_id, "k-1"))
        .await
        .unwrap();

    let (online_tx, online_rx) = watch::channel(false);
    let runner = tokio::spawn({
        let sync = sync.clone();
        async move { sync.run(online_rx).await }
    });

    // Still offline: the action stays queued.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sync.queue().len().await.unwrap(), 1);

    online_tx.send(true).unwrap();
    for _ in 0..100 {
        if sync.queue().len().await.unwrap() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sync.queue().len().await.unwrap(), 0);

    let expenses = engine.list_expenses(group_id, "alice", 50).await.unwrap();
    assert_eq!(expenses.len(), 1);

    // Closing the channel ends the orchestrator loop.
    drop(online_tx);
    runner.await.unwrap();
}

#[tokio::test]
async fn queue_survives_reopening_the_handle() {
    let (_engine, sync, group_id) = orchestrator_with_group().await;

    // Two handles over the same store see the same pending actions, like a
    // process restart over the same queue file.
    let queue_db = fresh_db().await;
    let first_handle = MutationQueue::new(queue_db.clone());
    first_handle
        .enqueue(&create_expense_payload(group_id, "k-1"))
        .await
        .unwrap();
    drop(first_handle);

    let second_handle = MutationQueue::new(queue_db);
    assert_eq!(second_handle.len().await.unwrap(), 1);
    let pending = second_handle.pending().await.unwrap();
    assert_eq!(pending[0].payload.kind(), "create_expense");

    drop(sync);
}
