//! Retention sweeper — background task that deletes expired artifacts.
//!
//! ```text
//! Idle → Scanning → Deleting → Sleeping(interval) → Scanning → …
//! ```
//!
//! The first pass runs as soon as the task starts. A failure on one file is
//! logged and counted; the pass continues with the rest. Staging files left
//! behind by a killed process are reclaimed once they pass the same age limit.

use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use voxgate_core::types::{SweepPolicy, SweepState, SweepStatus};

use crate::error::GatewayError;
use crate::store::{AudioArtifact, FileStore};

/// Staging files younger than this may still belong to a live request.
const STAGING_MIN_AGE: Duration = Duration::from_secs(300);

/// Outcome of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
    /// Orphaned staging files removed.
    pub reclaimed: usize,
}

/// Handle to the running sweeper task.
pub struct Sweeper {
    status_rx: watch::Receiver<SweepStatus>,
    task: JoinHandle<()>,
}

impl Sweeper {
    /// Start the sweeper. Must be called from within a tokio runtime.
    pub fn spawn(store: FileStore, policy: SweepPolicy) -> Self {
        let (status_tx, status_rx) = watch::channel(SweepStatus::default());
        let task = tokio::spawn(sweeper_task(store, policy, status_tx));
        Self { status_rx, task }
    }

    pub fn status(&self) -> SweepStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SweepStatus> {
        self.status_rx.clone()
    }

    /// Stop the task. Safe to call mid-pass; deletions are independent.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

async fn sweeper_task(store: FileStore, policy: SweepPolicy, status_tx: watch::Sender<SweepStatus>) {
    info!(
        "sweeper: started (max age {:?}, interval {:?})",
        policy.max_age, policy.interval
    );

    // interval() panics on a zero period
    let period = policy.interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let report = sweep_pass(&store, policy.max_age, SystemTime::now(), &status_tx).await;
        if report.deleted > 0 || report.failed > 0 || report.reclaimed > 0 {
            info!(
                "sweeper: scanned {}, deleted {}, failed {}, reclaimed {} staging",
                report.scanned, report.deleted, report.failed, report.reclaimed
            );
        } else {
            debug!("sweeper: scanned {}, nothing expired", report.scanned);
        }

        status_tx.send_modify(|s| {
            s.state = SweepState::Sleeping;
            s.passes += 1;
            s.last_scanned = report.scanned;
            s.last_deleted = report.deleted;
            s.last_failed = report.failed;
            s.total_deleted += report.deleted as u64;
        });
    }
}

/// Run one pass against `now`. Artifacts strictly older than `max_age` are
/// deleted, as are staging files older than both `max_age` and five minutes.
pub async fn sweep_once(store: &FileStore, max_age: Duration, now: SystemTime) -> SweepReport {
    let (status_tx, _status_rx) = watch::channel(SweepStatus::default());
    sweep_pass(store, max_age, now, &status_tx).await
}

async fn sweep_pass(
    store: &FileStore,
    max_age: Duration,
    now: SystemTime,
    status_tx: &watch::Sender<SweepStatus>,
) -> SweepReport {
    status_tx.send_modify(|s| s.state = SweepState::Scanning);

    let artifacts = match store.list_all().await {
        Ok(a) => a,
        Err(e) => {
            warn!("sweeper: failed to list {}: {e}", store.dir().display());
            return SweepReport {
                failed: 1,
                ..Default::default()
            };
        }
    };

    let mut report = SweepReport {
        scanned: artifacts.len(),
        ..Default::default()
    };

    let expired: Vec<_> = artifacts
        .into_iter()
        .filter_map(|a| {
            let age = age_at(now, a.created_at);
            (age > max_age).then_some((a, age))
        })
        .collect();

    if !expired.is_empty() {
        status_tx.send_modify(|s| s.state = SweepState::Deleting);
        delete_expired(store, expired, &mut report).await;
    }

    reclaim_staging(store, max_age.max(STAGING_MIN_AGE), now, &mut report).await;

    report
}

// created_at in the future (clock skew) counts as age zero
fn age_at(now: SystemTime, then: SystemTime) -> Duration {
    now.duration_since(then).unwrap_or(Duration::ZERO)
}

async fn delete_expired(
    store: &FileStore,
    expired: Vec<(AudioArtifact, Duration)>,
    report: &mut SweepReport,
) {
    for (artifact, age) in expired {
        let filename = artifact.filename();
        match store.delete(&filename).await {
            Ok(()) => {
                info!("sweeper: deleted {filename} (age {}s)", age.as_secs());
                report.deleted += 1;
            }
            Err(GatewayError::NotFound) => {
                debug!("sweeper: {filename} already gone");
            }
            Err(e) => {
                warn!("sweeper: failed to delete {filename}: {e}");
                report.failed += 1;
            }
        }
    }
}

async fn reclaim_staging(
    store: &FileStore,
    min_age: Duration,
    now: SystemTime,
    report: &mut SweepReport,
) {
    let leftovers = match store.list_staging().await {
        Ok(l) => l,
        Err(e) => {
            warn!("sweeper: failed to list staging files: {e}");
            report.failed += 1;
            return;
        }
    };

    for leftover in leftovers {
        let age = age_at(now, leftover.modified_at);
        if age <= min_age {
            continue;
        }
        match store.delete_staging(&leftover.name).await {
            Ok(()) => {
                info!(
                    "sweeper: removed orphaned {} (age {}s)",
                    leftover.name,
                    age.as_secs()
                );
                report.reclaimed += 1;
            }
            Err(GatewayError::NotFound) => {}
            Err(e) => {
                warn!("sweeper: failed to remove {}: {e}", leftover.name);
                report.failed += 1;
            }
        }
    }
}
