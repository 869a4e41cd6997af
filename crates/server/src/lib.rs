//! Email lead verification service.
//!
//! Leads are grouped into lists. Enqueuing a list records one pending
//! verification per lead; a drain then verifies every pending address with a
//! bounded number of concurrent provider calls and writes the verdict back
//! onto the lead.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::queue::{Dispatcher, DrainSupervisor, QueueManager};
use crate::verifier::VerificationProvider;

pub mod api;
pub mod config;
pub mod entity;
pub mod error;
pub mod queue;
pub mod store;
pub mod verifier;

#[derive(Clone)]
pub struct AppResources {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub provider: Arc<dyn VerificationProvider>,
    pub drains: Arc<DrainSupervisor>,
}

impl AppResources {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        provider: Arc<dyn VerificationProvider>,
    ) -> Self {
        Self {
            db,
            config,
            provider,
            drains: Arc::new(DrainSupervisor::new()),
        }
    }

    pub fn queue_manager(&self) -> QueueManager {
        QueueManager::new(self.db.clone())
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.queue_manager(),
            self.provider.clone(),
            self.config.queue.max_concurrency,
        )
    }
}
