//! Scheduled-Work Poller
//!
//! Scans for due rule applications on a fixed interval and dispatches them
//! to the state machine. Both transitions are idempotent via their status
//! guards, so overlapping poll windows and redelivered items are safe; a
//! failing item never aborts the rest of the batch.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::db::repository::rule as rule_repo;
use crate::rules::RuleEngine;

/// Counters from one poll tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    pub applied: usize,
    pub reversed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: usize,
}

pub struct SchedulePoller {
    pool: sqlx::SqlitePool,
    rules: RuleEngine,
    interval: Duration,
    shutdown: CancellationToken,
}

impl SchedulePoller {
    pub fn new(
        pool: sqlx::SqlitePool,
        rules: RuleEngine,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pool,
            rules,
            interval,
            shutdown,
        }
    }

    /// Main loop: tick until shutdown.
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Schedule poller started");

        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let stats = self.run_once(shared::util::now_millis()).await;
                    if stats != PollStats::default() {
                        tracing::info!(
                            applied = stats.applied,
                            reversed = stats.reversed,
                            skipped = stats.skipped,
                            failed = stats.failed,
                            errors = stats.errors,
                            "Poll tick processed due work"
                        );
                    }
                }
            }
        }

        tracing::info!("Schedule poller stopped");
    }

    /// One scan: due `pending` items (active rules only) go through the
    /// apply transition, due `applied` items through restore.
    pub async fn run_once(&self, now: i64) -> PollStats {
        let mut stats = PollStats::default();

        match rule_repo::due_pending(&self.pool, now).await {
            Ok(due) => {
                for application in due {
                    match self.rules.apply(application.id).await {
                        Ok(outcome) => stats.record(outcome),
                        Err(e) => {
                            stats.errors += 1;
                            tracing::error!(
                                application_id = application.id,
                                "Apply dispatch failed: {e}"
                            );
                        }
                    }
                }
            }
            Err(e) => {
                stats.errors += 1;
                tracing::error!("Failed to scan due applications: {e}");
            }
        }

        match rule_repo::due_restores(&self.pool, now).await {
            Ok(due) => {
                for application in due {
                    match self.rules.restore(application.id).await {
                        Ok(outcome) => stats.record(outcome),
                        Err(e) => {
                            stats.errors += 1;
                            tracing::error!(
                                application_id = application.id,
                                "Restore dispatch failed: {e}"
                            );
                        }
                    }
                }
            }
            Err(e) => {
                stats.errors += 1;
                tracing::error!("Failed to scan due restorations: {e}");
            }
        }

        stats
    }
}

impl PollStats {
    fn record(&mut self, outcome: crate::rules::ApplyOutcome) {
        use crate::rules::ApplyOutcome;
        match outcome {
            ApplyOutcome::Applied => self.applied += 1,
            ApplyOutcome::Reversed => self.reversed += 1,
            ApplyOutcome::Skipped => self.skipped += 1,
            ApplyOutcome::Failed => self.failed += 1,
        }
    }
}
