//! Periodic background sync: every active user's sources on a fixed
//! interval, then a sweep of sources nobody subscribes to any more.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::repositories::{Store, StoreError};
use crate::subscriptions::SubscriptionService;
use crate::sync::{BatchSyncResult, SyncOrchestrator};

/// Days a soft-deleted source survives before the sweep removes it.
pub const SWEEP_GRACE_DAYS: i64 = 7;

/// Totals for one scheduler pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub users: usize,
    /// Users whose sync aborted before any source ran.
    pub failed_users: usize,
    pub sources: BatchSyncResult,
    pub purged: u64,
}

pub struct SyncScheduler {
    store: Arc<dyn Store>,
    orchestrator: Arc<SyncOrchestrator>,
    subscriptions: SubscriptionService,
    period: Duration,
    shutdown_token: CancellationToken,
}

impl SyncScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        orchestrator: Arc<SyncOrchestrator>,
        subscriptions: SubscriptionService,
        period: Duration,
    ) -> Self {
        Self {
            store,
            orchestrator,
            subscriptions,
            period,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops [`SyncScheduler::run`] after the pass in
    /// flight.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub async fn run(&self) {
        info!(period = ?self.period, "scheduler started");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    info!("scheduler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.tick().instrument(info_span!("sync_tick")).await {
                        Ok(report) => info!(
                            users = report.users,
                            failed_users = report.failed_users,
                            sources = report.sources.total_sources,
                            failed_sources = report.sources.failed_syncs,
                            added = report.sources.total_entries_added,
                            purged = report.purged,
                            "sync pass finished"
                        ),
                        Err(err) => error!(error = %err, "sync pass aborted"),
                    }
                }
            }
        }
    }

    /// One pass over every user with active sources. Users are synced one at
    /// a time; each user's sources still run concurrently.
    pub async fn tick(&self) -> Result<TickReport, StoreError> {
        let users = self.store.users_with_active_sources().await?;
        let window = self.orchestrator.recent_window();
        let mut report = TickReport {
            users: users.len(),
            ..TickReport::default()
        };

        for user_id in users {
            if self.shutdown_token.is_cancelled() {
                break;
            }
            match self.orchestrator.sync_user(user_id, window).await {
                Ok(batch) => merge(&mut report.sources, &batch),
                Err(err) => {
                    warn!(%user_id, error = %err, "user sync aborted");
                    report.failed_users += 1;
                }
            }
        }

        report.purged = self
            .subscriptions
            .sweep(chrono::Duration::days(SWEEP_GRACE_DAYS))
            .await?;
        Ok(report)
    }
}

fn merge(total: &mut BatchSyncResult, batch: &BatchSyncResult) {
    total.total_sources += batch.total_sources;
    total.successful_syncs += batch.successful_syncs;
    total.failed_syncs += batch.failed_syncs;
    total.total_entries_added += batch.total_entries_added;
    total.total_entries_updated += batch.total_entries_updated;
    total.deferred += batch.deferred;
}
