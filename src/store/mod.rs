//! Durable keyed storage for grading jobs.
//!
//! `JobStore` fronts a [`StorageBackend`] with an in-memory cache and a
//! per-job lock registry. The backend is the source of truth; the cache only
//! avoids a round trip for read-mostly callers. All mutation flows through
//! the reconciler, which serializes writes per job via [`JobStore::lock`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::models::job::GradingJob;

mod memory;
mod pg;

pub use memory::MemoryBackend;
pub use pg::PgBackend;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("job {0} not found")]
    NotFound(Uuid),
}

/// Atomic read/update operations over durable job rows.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn insert(&self, job: &GradingJob) -> Result<(), StoreError>;
    async fn fetch(&self, job_id: Uuid) -> Result<Option<GradingJob>, StoreError>;
    async fn fetch_by_external_id(
        &self,
        external_job_id: &str,
    ) -> Result<Option<GradingJob>, StoreError>;
    async fn update(&self, job: &GradingJob) -> Result<(), StoreError>;
}

/// Cache-fronted job store with per-job write serialization.
pub struct JobStore {
    backend: Box<dyn StorageBackend>,
    cache: RwLock<HashMap<Uuid, GradingJob>>,
    /// Secondary index: worker handle -> local id, warmed alongside the cache.
    external_index: RwLock<HashMap<String, Uuid>>,
    /// Lock registry keyed by local id. Entries are never evicted: jobs are
    /// never deleted by this subsystem and an entry is two pointers.
    locks: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl JobStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            cache: RwLock::new(HashMap::new()),
            external_index: RwLock::new(HashMap::new()),
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Acquire the exclusive critical section for one job. Scoped per job id
    /// so unrelated jobs are never serialized against each other.
    pub async fn lock(&self, job_id: Uuid) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().expect("lock registry poisoned");
            locks
                .entry(job_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }

    /// Persist a newly created job. Called exactly once per job.
    pub async fn insert(&self, job: &GradingJob) -> Result<(), StoreError> {
        self.backend.insert(job).await?;
        self.warm(job).await;
        Ok(())
    }

    /// Read a job, cache first, falling back to the backend.
    pub async fn get(&self, job_id: Uuid) -> Result<Option<GradingJob>, StoreError> {
        if let Some(job) = self.cache.read().await.get(&job_id) {
            return Ok(Some(job.clone()));
        }
        match self.backend.fetch(job_id).await? {
            Some(job) => {
                self.warm(&job).await;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Resolve a worker handle to a local job id via the secondary index.
    pub async fn resolve_external_id(
        &self,
        external_job_id: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        if let Some(id) = self.external_index.read().await.get(external_job_id) {
            return Ok(Some(*id));
        }
        match self.backend.fetch_by_external_id(external_job_id).await? {
            Some(job) => {
                let id = job.id;
                self.warm(&job).await;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Write back a reconciled job, durable storage first, then the cache.
    pub async fn update(&self, job: &GradingJob) -> Result<(), StoreError> {
        self.backend.update(job).await?;
        self.warm(job).await;
        Ok(())
    }

    async fn warm(&self, job: &GradingJob) {
        if let Some(external_id) = &job.external_job_id {
            self.external_index
                .write()
                .await
                .insert(external_id.clone(), job.id);
        }
        self.cache.write().await.insert(job.id, job.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobStatus;

    fn pending_job(external: &str) -> GradingJob {
        let mut job = GradingJob::new("artifacts/test");
        job.status = JobStatus::Pending;
        job.external_job_id = Some(external.to_string());
        job
    }

    #[tokio::test]
    async fn get_round_trips_through_cache() {
        let store = JobStore::new(MemoryBackend::new());
        let job = pending_job("w-1");
        store.insert(&job).await.unwrap();

        let loaded = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(loaded, job);
    }

    #[tokio::test]
    async fn resolve_external_id_finds_job() {
        let store = JobStore::new(MemoryBackend::new());
        let job = pending_job("w-42");
        store.insert(&job).await.unwrap();

        let resolved = store.resolve_external_id("w-42").await.unwrap();
        assert_eq!(resolved, Some(job.id));
        assert_eq!(store.resolve_external_id("w-unknown").await.unwrap(), None);
    }

    #[tokio::test]
    async fn cache_miss_falls_back_to_backend() {
        let backend = MemoryBackend::new();
        let job = pending_job("w-7");
        backend.insert(&job).await.unwrap();

        // Fresh store: cold cache, row only in the backend.
        let store = JobStore::new(backend);
        let loaded = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, job.id);
        // Secondary index warmed by the fallback read.
        assert_eq!(
            store.resolve_external_id("w-7").await.unwrap(),
            Some(job.id)
        );
    }

    #[tokio::test]
    async fn missing_job_is_none() {
        let store = JobStore::new(MemoryBackend::new());
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn per_job_locks_are_independent() {
        let store = JobStore::new(MemoryBackend::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let guard_a = store.lock(a).await;
        // A held lock on job A must not block job B.
        let guard_b = tokio::time::timeout(std::time::Duration::from_millis(50), store.lock(b))
            .await
            .expect("unrelated job lock should be uncontended");
        drop(guard_a);
        drop(guard_b);
    }
}
