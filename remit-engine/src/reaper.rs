//! Pending-transaction reaper.
//!
//! A background task that periodically fails PENDING transactions older
//! than the configured window. Keeps abandoned transfers from holding a
//! frozen rate forever.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use remit_types::{Actor, AuditSink, RepoError, TransferRepository, Transition};

pub struct Reaper<R: TransferRepository> {
    repo: Arc<R>,
    audit: Arc<dyn AuditSink>,
    /// Age at which a PENDING transaction is failed.
    window: chrono::Duration,
    interval: Duration,
}

impl<R: TransferRepository> Reaper<R> {
    pub fn new(
        repo: Arc<R>,
        audit: Arc<dyn AuditSink>,
        window: chrono::Duration,
        interval: Duration,
    ) -> Self {
        Self {
            repo,
            audit,
            window,
            interval,
        }
    }

    /// Runs forever; spawn on the runtime at startup.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match self.sweep().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(count = n, "reaper failed stale pending transactions"),
                Err(e) => tracing::error!(error = %e, "reaper sweep failed"),
            }
        }
    }

    /// One sweep pass; returns how many transactions were failed.
    pub async fn sweep(&self) -> Result<usize, RepoError> {
        let cutoff = Utc::now() - self.window;
        let stale = self.repo.list_pending_older_than(cutoff).await?;

        let mut reaped = 0;
        for mut transaction in stale {
            let Some(event) = transaction.apply(
                Transition::Fail {
                    reason: "timeout".into(),
                },
                &Actor::Reaper,
                Utc::now(),
            ) else {
                continue;
            };

            let applied = self
                .repo
                .update_transaction_status(
                    transaction.id,
                    transaction.status,
                    transaction.failure_reason.as_deref(),
                    None,
                    &event,
                )
                .await?;
            if applied {
                reaped += 1;
                self.audit
                    .write(
                        "transaction.reaped",
                        serde_json::json!({
                            "transaction_id": transaction.id,
                            "created_at": transaction.created_at,
                        }),
                    )
                    .await;
            }
        }
        Ok(reaped)
    }
}
