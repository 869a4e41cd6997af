//! Bounded-concurrency drain of the verification queue.

use crate::entity::lead;
use crate::entity::verification_queue::QueueEntry;
use crate::error::QueueError;
use crate::queue::QueueManager;
use crate::verifier::{VerificationProvider, VerificationResult};
use sea_orm::EntityTrait;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use utoipa::ToSchema;

/// Counts for one drain, for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DrainSummary {
    /// Entries present when the drain started.
    pub snapshot: usize,
    pub resolved: usize,
    pub left_pending: usize,
}

/// How a single entry ended up after its worker finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryOutcome {
    Resolved,
    LeadMissing,
    LeadLookupFailed,
    ProviderFailed,
    DequeueFailed,
}

/// Detail stored on the lead: the verdict tag plus the full result as a
/// JSON string.
pub fn detail_payload(result: &VerificationResult) -> Result<Value, serde_json::Error> {
    Ok(json!({
        "reachable": result.reachable.as_str(),
        "reason": serde_json::to_string(result)?,
    }))
}

#[derive(Clone)]
pub struct Dispatcher {
    queue: QueueManager,
    provider: Arc<dyn VerificationProvider>,
    max_concurrency: usize,
}

impl Dispatcher {
    pub fn new(
        queue: QueueManager,
        provider: Arc<dyn VerificationProvider>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            queue,
            provider,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Verifies every entry pending at the time of the call.
    ///
    /// At most `max_concurrency` entries are in flight; the next one is only
    /// started once a slot frees up. Per-entry failures are logged and leave
    /// the entry pending. Returns once every started worker has finished.
    #[tracing::instrument(name = "queue_drain", skip(self), fields(max_concurrency = self.max_concurrency))]
    pub async fn drain(&self) -> Result<DrainSummary, QueueError> {
        let snapshot = self.queue.list_pending().await?;
        let mut summary = DrainSummary {
            snapshot: snapshot.len(),
            ..Default::default()
        };
        if snapshot.is_empty() {
            return Ok(summary);
        }

        let sem = Arc::new(Semaphore::new(self.max_concurrency));
        let mut set = JoinSet::new();
        for entry in snapshot {
            let Ok(permit) = sem.clone().acquire_owned().await else {
                break;
            };
            let this = self.clone();
            set.spawn(async move {
                let _permit = permit;
                this.process_entry(entry).await
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(EntryOutcome::Resolved) => summary.resolved += 1,
                Ok(_) => summary.left_pending += 1,
                Err(e) => {
                    tracing::error!(
                        name = "queue.drain.worker_panicked",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        error = ?e,
                        message = "Verification worker did not complete"
                    );
                    summary.left_pending += 1;
                }
            }
        }

        tracing::info!(
            name = "queue.drain.done",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            snapshot = summary.snapshot,
            resolved = summary.resolved,
            left_pending = summary.left_pending,
            message = "Verification drain finished"
        );
        Ok(summary)
    }

    /// Runs one entry through lookup, verification and dequeue.
    #[tracing::instrument(skip(self, entry), fields(entry_id = %entry.id, lead_id = %entry.lead_id))]
    pub async fn process_entry(&self, entry: QueueEntry) -> EntryOutcome {
        match lead::Entity::find_by_id(entry.lead_id.clone())
            .one(self.queue.db())
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(
                    name = "queue.worker.lead_missing",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    entry_id = %entry.id,
                    lead_id = %entry.lead_id,
                    message = "Queued lead no longer exists, leaving entry pending"
                );
                return EntryOutcome::LeadMissing;
            }
            Err(e) => {
                tracing::error!(
                    name = "queue.worker.lead_lookup_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    entry_id = %entry.id,
                    error = ?e,
                    message = "Failed to load queued lead"
                );
                return EntryOutcome::LeadLookupFailed;
            }
        }

        // The entry's own copy of the email, even if the lead changed since.
        let result = match self.provider.verify(&entry.email).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    name = "queue.worker.verify_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    entry_id = %entry.id,
                    transient = e.is_transient(),
                    error = %e,
                    message = "Verification failed, entry stays pending"
                );
                return EntryOutcome::ProviderFailed;
            }
        };

        let detail = match detail_payload(&result) {
            Ok(detail) => detail,
            Err(e) => {
                tracing::error!(
                    name = "queue.worker.detail_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    entry_id = %entry.id,
                    error = ?e,
                    message = "Failed to serialize verification result"
                );
                return EntryOutcome::ProviderFailed;
            }
        };

        match self
            .queue
            .dequeue(&entry.id, result.reachable.as_str(), detail)
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    entry_id = %entry.id,
                    reachable = result.reachable.as_str(),
                    "Entry resolved"
                );
                EntryOutcome::Resolved
            }
            Err(e) => {
                tracing::error!(
                    name = "queue.dequeue.failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    entry_id = %entry.id,
                    error = ?e,
                    message = "Failed to record verification result"
                );
                EntryOutcome::DequeueFailed
            }
        }
    }
}
