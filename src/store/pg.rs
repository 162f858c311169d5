use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries;
use crate::models::job::GradingJob;

use super::{StorageBackend, StoreError};

/// PostgreSQL storage backend, the durable source of truth in production.
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StorageBackend for PgBackend {
    async fn insert(&self, job: &GradingJob) -> Result<(), StoreError> {
        queries::insert_job(&self.pool, job).await?;
        Ok(())
    }

    async fn fetch(&self, job_id: Uuid) -> Result<Option<GradingJob>, StoreError> {
        Ok(queries::fetch_job(&self.pool, job_id).await?)
    }

    async fn fetch_by_external_id(
        &self,
        external_job_id: &str,
    ) -> Result<Option<GradingJob>, StoreError> {
        Ok(queries::fetch_job_by_external_id(&self.pool, external_job_id).await?)
    }

    async fn update(&self, job: &GradingJob) -> Result<(), StoreError> {
        queries::update_job(&self.pool, job).await?;
        Ok(())
    }
}
