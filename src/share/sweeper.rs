//! Background lifecycle sweeper.
//!
//! Periodically retires expired records, then deletes the blobs of records
//! that have been inactive for longer than the reclaim grace period. The
//! request path never depends on the sweeper: expiry and limits are always
//! re-derived live.
//!
//! Records that used up their download limit stay active until they expire.
//! Share downloads are already refused by the live limit check, and the
//! owner can still fetch the file.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::repository::FileRecordRepository;
use crate::config::SweeperConfig;
use crate::db::Database;
use crate::storage::FileStorage;

/// Default sweep interval in seconds (5 minutes).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Default number of records handled per sweep phase.
pub const DEFAULT_BATCH_SIZE: i64 = 500;

/// Default time an inactive record keeps its blob (1 hour).
///
/// A download admitted just before deactivation still reads the blob.
pub const DEFAULT_RECLAIM_GRACE_SECS: u64 = 3600;

/// Summary of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SweepReport {
    /// Records examined.
    pub scanned: usize,
    /// Records deactivated in this pass.
    pub deactivated: usize,
    /// Blobs reclaimed in this pass.
    pub reclaimed: usize,
    /// Failures encountered.
    pub errors: usize,
}

/// Share record lifecycle sweeper.
pub struct LifecycleSweeper {
    db: Arc<Database>,
    storage: Arc<FileStorage>,
    sweep_interval: Duration,
    batch_size: i64,
    reclaim_blobs: bool,
    reclaim_grace: ChronoDuration,
}

impl LifecycleSweeper {
    /// Create a new sweeper with default settings.
    pub fn new(db: Arc<Database>, storage: Arc<FileStorage>) -> Self {
        Self {
            db,
            storage,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
            reclaim_blobs: true,
            reclaim_grace: grace_from_secs(DEFAULT_RECLAIM_GRACE_SECS),
        }
    }

    /// Create a new sweeper with a custom interval.
    pub fn with_interval(db: Arc<Database>, storage: Arc<FileStorage>, interval_secs: u64) -> Self {
        Self {
            sweep_interval: Duration::from_secs(interval_secs),
            ..Self::new(db, storage)
        }
    }

    /// Create a new sweeper from configuration.
    pub fn from_config(
        db: Arc<Database>,
        storage: Arc<FileStorage>,
        config: &SweeperConfig,
    ) -> Self {
        Self {
            sweep_interval: Duration::from_secs(config.interval_secs.max(1)),
            batch_size: config.batch_size.max(1),
            reclaim_blobs: config.reclaim_blobs,
            reclaim_grace: grace_from_secs(config.reclaim_grace_secs),
            ..Self::new(db, storage)
        }
    }

    /// Set how long an inactive record keeps its blob.
    pub fn with_reclaim_grace(mut self, grace: ChronoDuration) -> Self {
        self.reclaim_grace = grace;
        self
    }

    /// Interval between sweeps.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Time an inactive record keeps its blob.
    pub fn reclaim_grace(&self) -> ChronoDuration {
        self.reclaim_grace
    }

    /// Run the sweeper loop indefinitely.
    pub async fn run(&self) {
        info!(
            "Lifecycle sweeper started (interval: {} seconds)",
            self.sweep_interval.as_secs()
        );

        let mut timer = interval(self.sweep_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            let report = self.sweep_once(Utc::now()).await;
            if report.deactivated > 0 || report.reclaimed > 0 || report.errors > 0 {
                info!(
                    scanned = report.scanned,
                    deactivated = report.deactivated,
                    reclaimed = report.reclaimed,
                    errors = report.errors,
                    "sweep complete"
                );
            } else {
                debug!(scanned = report.scanned, "sweep complete, nothing to do");
            }
        }
    }

    /// Run one sweep pass at `now`.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        self.deactivate_expired(now, &mut report).await;
        if self.reclaim_blobs {
            self.reclaim(now, &mut report).await;
        }
        report
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let repo = FileRecordRepository::new(self.db.pool());

        let candidates = match repo.list_sweep_candidates(now, self.batch_size).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Failed to list sweep candidates: {}", e);
                report.errors += 1;
                return;
            }
        };
        report.scanned += candidates.len();

        for record in candidates {
            match repo.deactivate_if_expired(record.id, now).await {
                Ok(Some(reason)) => {
                    report.deactivated += 1;
                    info!(
                        file_id = record.id,
                        owner_id = %record.owner_id,
                        reason = reason.as_str(),
                        "share deactivated"
                    );
                }
                // Revoked or retired concurrently.
                Ok(None) => {}
                Err(e) => {
                    error!(file_id = record.id, "Failed to deactivate record: {}", e);
                    report.errors += 1;
                }
            }
        }
    }

    async fn reclaim(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let repo = FileRecordRepository::new(self.db.pool());
        // A grace longer than the clock's range never elapses.
        let Some(cutoff) = now.checked_sub_signed(self.reclaim_grace) else {
            return;
        };

        let records = match repo.list_reclaimable(cutoff, self.batch_size).await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to list reclaimable records: {}", e);
                report.errors += 1;
                return;
            }
        };
        report.scanned += records.len();

        for record in records {
            match self.storage.delete(&record.blob_ref).await {
                Ok(existed) => {
                    if !existed {
                        warn!(file_id = record.id, "blob already missing during reclaim");
                    }
                }
                Err(e) => {
                    error!(file_id = record.id, "Failed to delete blob: {}", e);
                    report.errors += 1;
                    continue;
                }
            }

            match repo.mark_reclaimed(record.id, cutoff, now).await {
                Ok(true) => {
                    report.reclaimed += 1;
                    debug!(file_id = record.id, "blob reclaimed");
                }
                Ok(false) => {}
                Err(e) => {
                    error!(file_id = record.id, "Failed to mark blob reclaimed: {}", e);
                    report.errors += 1;
                }
            }
        }
    }
}

fn grace_from_secs(secs: u64) -> ChronoDuration {
    ChronoDuration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
}

/// Start the sweeper as a background task.
pub fn start_sweeper(
    db: Arc<Database>,
    storage: Arc<FileStorage>,
    config: &SweeperConfig,
) -> JoinHandle<()> {
    let sweeper = LifecycleSweeper::from_config(db, storage, config);
    tokio::spawn(async move {
        sweeper.run().await;
    })
}
