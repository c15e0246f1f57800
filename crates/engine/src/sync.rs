//! Sync orchestration: drains the offline mutation queue into the ledger.
//!
//! A drain processes the queue snapshot taken when it starts; actions
//! enqueued mid-drain wait for the next cycle. Only one drain runs at a
//! time per orchestrator: a concurrent attempt is ignored, not queued.
//! This is the only place in the engine where a failure is swallowed
//! instead of propagated; it becomes a retry-count increment, and after
//! `MAX_RETRIES` failed attempts the action is dropped and reported as a
//! permanent failure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::queue::MAX_RETRIES;
use crate::{ActionPayload, Engine, MutationQueue, OfflineAction, ResultEngine};

/// Outcome of one queue drain. No per-action state is exposed mid-drain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct SyncOrchestrator {
    engine: Arc<Engine>,
    queue: Arc<MutationQueue>,
    syncing: AtomicBool,
}

impl SyncOrchestrator {
    pub fn new(engine: Arc<Engine>, queue: Arc<MutationQueue>) -> Self {
        Self {
            engine,
            queue,
            syncing: AtomicBool::new(false),
        }
    }

    pub fn queue(&self) -> &MutationQueue {
        &self.queue
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Drains the pending queue once.
    ///
    /// Returns `None` when a drain is already in flight; the concurrent
    /// attempt is simply dropped.
    pub async fn sync_pending(&self) -> ResultEngine<Option<SyncReport>> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(None);
        }

        let result = self.drain().await;
        self.syncing.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    async fn drain(&self) -> ResultEngine<SyncReport> {
        let snapshot = self.queue.pending().await?;
        let mut report = SyncReport {
            attempted: snapshot.len(),
            ..SyncReport::default()
        };

        for action in snapshot {
            if action.retry_count >= MAX_RETRIES {
                tracing::warn!(
                    action_id = action.id,
                    kind = action.payload.kind(),
                    "dropping action after {MAX_RETRIES} failed replay attempts"
                );
                self.queue.remove(action.id).await?;
                report.failed += 1;
                continue;
            }

            match self.replay(&action).await {
                Ok(()) => {
                    self.queue.remove(action.id).await?;
                    report.succeeded += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        action_id = action.id,
                        kind = action.payload.kind(),
                        "replay failed: {err}"
                    );
                    self.queue.increment_retry(action.id).await?;
                    report.failed += 1;
                }
            }
        }

        // Derived views are rebuilt lazily on the next read, whatever the
        // per-action outcomes were.
        self.engine.invalidate_all_views();
        Ok(report)
    }

    async fn replay(&self, action: &OfflineAction) -> ResultEngine<()> {
        match &action.payload {
            ActionPayload::CreateExpense(cmd) => {
                self.engine.create_expense(cmd.clone()).await?;
            }
            ActionPayload::UpdateExpense(cmd) => {
                self.engine.update_expense(cmd.clone()).await?;
            }
            ActionPayload::DeleteExpense {
                expense_id,
                user_id,
            } => {
                self.engine.delete_expense(*expense_id, user_id).await?;
            }
            ActionPayload::RecordPayment(cmd) => {
                self.engine.record_payment(cmd.clone()).await?;
            }
        }
        Ok(())
    }

    /// Runs until the connectivity channel closes, draining the queue on
    /// each offline-to-online transition.
    ///
    /// Seed the channel with `true` to replay actions left over from a
    /// previous process run at startup.
    pub async fn run(&self, mut online: watch::Receiver<bool>) {
        let mut was_online = false;
        loop {
            let online_now = *online.borrow_and_update();
            if online_now && !was_online {
                match self.sync_pending().await {
                    Ok(Some(report)) if report.attempted > 0 => {
                        tracing::info!(
                            succeeded = report.succeeded,
                            failed = report.failed,
                            "offline queue drained"
                        );
                    }
                    Ok(_) => {}
                    Err(err) => tracing::error!("queue drain failed: {err}"),
                }
            }
            was_online = online_now;
            if online.changed().await.is_err() {
                break;
            }
        }
    }
}
