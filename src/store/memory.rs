use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::GradingJob;

use super::{StorageBackend, StoreError};

/// In-memory storage backend.
///
/// Used by the test suite and for ephemeral deployments where durability is
/// not required. Rows live for the life of the process.
#[derive(Default)]
pub struct MemoryBackend {
    rows: RwLock<HashMap<Uuid, GradingJob>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn insert(&self, job: &GradingJob) -> Result<(), StoreError> {
        self.rows.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn fetch(&self, job_id: Uuid) -> Result<Option<GradingJob>, StoreError> {
        Ok(self.rows.read().await.get(&job_id).cloned())
    }

    async fn fetch_by_external_id(
        &self,
        external_job_id: &str,
    ) -> Result<Option<GradingJob>, StoreError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|job| job.external_job_id.as_deref() == Some(external_job_id))
            .cloned())
    }

    async fn update(&self, job: &GradingJob) -> Result<(), StoreError> {
        match self.rows.write().await.get_mut(&job.id) {
            Some(row) => {
                *row = job.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(job.id)),
        }
    }
}
