//! Verification queue.
//!
//! A queue entry existing means "verification requested, not yet completed".
//! [`QueueManager`] is the only sanctioned path that resolves an entry, and
//! [`Dispatcher`] drains the pending set with bounded concurrency.
//!
//! ## Submodules
//!
//! - `dispatcher` - Bounded-concurrency drain of one pending snapshot
//! - `supervisor` - Detached drains started from request handlers

pub mod dispatcher;
pub mod supervisor;

pub use dispatcher::{DrainSummary, Dispatcher, EntryOutcome, detail_payload};
pub use supervisor::DrainSupervisor;

use crate::entity::lead;
use crate::entity::verification_queue::{self, QueueEntry};
use crate::error::QueueError;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};
use serde_json::Value;
use std::sync::Arc;

/// Rows per `INSERT` when enqueuing; four bind parameters each.
const ENQUEUE_CHUNK_SIZE: usize = 1000;

/// Owns the lifecycle of queue entries.
#[derive(Clone, Debug)]
pub struct QueueManager {
    db: Arc<DatabaseConnection>,
}

impl QueueManager {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Creates one entry per lead of `list_id`, copying each lead's current
    /// email. Leads that are already verified or already queued are queued
    /// again. Returns the number of entries created.
    #[tracing::instrument(skip(self))]
    pub async fn enqueue(&self, list_id: &str) -> Result<u64, QueueError> {
        let leads = lead::Entity::find()
            .filter(lead::Column::ListId.eq(list_id))
            .all(self.db())
            .await?;

        if leads.is_empty() {
            tracing::info!(
                name = "queue.enqueue.empty_list",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                list_id = %list_id,
                message = "List has no leads, nothing to enqueue"
            );
            return Ok(0);
        }

        let entries: Vec<verification_queue::ActiveModel> = leads
            .into_iter()
            .map(|l| verification_queue::ActiveModel {
                id: Set(uuid::Uuid::new_v4().to_string()),
                email: Set(l.email),
                lead_id: Set(l.id),
                list_id: Set(l.list_id),
            })
            .collect();

        // Chunked to stay under the backend's bind parameter limit. A failing
        // chunk is reported as-is; earlier chunks are not rolled back.
        let mut inserted = 0;
        for chunk in entries.chunks(ENQUEUE_CHUNK_SIZE) {
            inserted += verification_queue::Entity::insert_many(chunk.iter().cloned())
                .exec_without_returning(self.db())
                .await?;
        }

        tracing::info!(
            name = "queue.enqueue.done",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            list_id = %list_id,
            entries = inserted,
            message = "List enqueued for verification"
        );
        Ok(inserted)
    }

    #[tracing::instrument(skip(self))]
    pub async fn is_list_queued(&self, list_id: &str) -> Result<bool, QueueError> {
        let count = verification_queue::Entity::find()
            .filter(verification_queue::Column::ListId.eq(list_id))
            .count(self.db())
            .await?;
        Ok(count > 0)
    }

    /// Deletes every entry whose list reference equals `list_id`.
    #[tracing::instrument(skip(self))]
    pub async fn remove_list_from_queue(&self, list_id: &str) -> Result<u64, QueueError> {
        let res = verification_queue::Entity::delete_many()
            .filter(verification_queue::Column::ListId.eq(list_id))
            .exec(self.db())
            .await?;
        tracing::info!(
            name = "queue.remove_list.done",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            list_id = %list_id,
            removed = res.rows_affected,
            message = "Removed list from verification queue"
        );
        Ok(res.rows_affected)
    }

    /// Point-in-time snapshot of every pending entry, in store order.
    #[tracing::instrument(skip(self))]
    pub async fn list_pending(&self) -> Result<Vec<QueueEntry>, QueueError> {
        Ok(verification_queue::Entity::find().all(self.db()).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn pending_count(&self) -> Result<u64, QueueError> {
        Ok(verification_queue::Entity::find().count(self.db()).await?)
    }

    /// Records a verification result on the entry's lead, then removes the
    /// entry.
    ///
    /// The lead is written before the entry is deleted. A failure between the
    /// two steps leaves a resolved lead with a stale entry, which the next
    /// drain simply verifies again; the reverse order could lose a result.
    #[tracing::instrument(skip(self, detail))]
    pub async fn dequeue(
        &self,
        entry_id: &str,
        validity: &str,
        detail: Value,
    ) -> Result<(), QueueError> {
        let entry = verification_queue::Entity::find_by_id(entry_id.to_string())
            .one(self.db())
            .await?
            .ok_or_else(|| QueueError::NotFound(format!("queue entry {entry_id}")))?;

        let updated = lead::Entity::update_many()
            .col_expr(lead::Column::EmailIsValid, Expr::value(validity))
            .col_expr(lead::Column::VerificationResult, Expr::value(detail))
            .col_expr(lead::Column::EmailVerified, Expr::value(true))
            .filter(lead::Column::Id.eq(entry.lead_id.as_str()))
            .exec(self.db())
            .await
            .map_err(|e| QueueError::UpdateFailed {
                lead_id: entry.lead_id.clone(),
                reason: e.to_string(),
            })?;
        if updated.rows_affected == 0 {
            return Err(QueueError::UpdateFailed {
                lead_id: entry.lead_id,
                reason: "lead no longer exists".into(),
            });
        }

        let removed = verification_queue::Entity::delete_by_id(entry.id.clone())
            .exec(self.db())
            .await
            .map_err(|e| QueueError::DeleteFailed {
                entry_id: entry.id.clone(),
                reason: e.to_string(),
            })?;
        if removed.rows_affected == 0 {
            return Err(QueueError::DeleteFailed {
                entry_id: entry.id,
                reason: "entry was removed concurrently".into(),
            });
        }

        Ok(())
    }
}
