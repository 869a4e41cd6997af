//! Detached drains.
//!
//! The HTTP trigger answers immediately; the drain keeps running in a
//! background task that is tracked here until it finishes.

use crate::queue::Dispatcher;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// Tracks drains started with [`DrainSupervisor::spawn_drain`].
pub struct DrainSupervisor {
    pub(crate) running: RwLock<HashMap<u64, OffsetDateTime>>,
    next_id: AtomicU64,
}

impl Default for DrainSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl DrainSupervisor {
    pub fn new() -> Self {
        Self {
            running: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Starts a drain in the background and returns its id.
    ///
    /// Errors and panics of the drain are logged; nothing is propagated.
    #[tracing::instrument(skip(self, dispatcher))]
    pub async fn spawn_drain(self: &Arc<Self>, dispatcher: Dispatcher) -> u64 {
        let drain_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.running
            .write()
            .await
            .insert(drain_id, OffsetDateTime::now_utc());

        let handle = tokio::spawn(async move { dispatcher.drain().await });
        let this = Arc::clone(self);
        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(summary)) => tracing::info!(
                    name = "queue.drain.detached_done",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    drain_id,
                    resolved = summary.resolved,
                    left_pending = summary.left_pending,
                    message = "Background drain completed"
                ),
                Ok(Err(e)) => tracing::error!(
                    name = "queue.drain.detached_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    drain_id,
                    error = ?e,
                    message = "Background drain failed"
                ),
                Err(e) => tracing::error!(
                    name = "queue.drain.detached_panicked",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    drain_id,
                    error = ?e,
                    message = "Background drain panicked"
                ),
            }
            this.running.write().await.remove(&drain_id);
        });

        drain_id
    }

    pub async fn is_running(&self, drain_id: u64) -> bool {
        self.running.read().await.contains_key(&drain_id)
    }

    pub async fn active_drains(&self) -> usize {
        self.running.read().await.len()
    }
}
