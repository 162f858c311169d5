use sqlx::PgPool;
use std::sync::Arc;

use crate::services::submitter::JobSubmitter;
use crate::services::worker::GradingWorker;
use crate::store::JobStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: Arc<JobStore>,
    pub worker: Arc<dyn GradingWorker>,
    pub submitter: Arc<JobSubmitter>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        store: Arc<JobStore>,
        worker: Arc<dyn GradingWorker>,
        submitter: JobSubmitter,
    ) -> Self {
        Self {
            db,
            store,
            worker,
            submitter: Arc::new(submitter),
        }
    }
}
