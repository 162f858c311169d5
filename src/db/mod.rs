use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Open the PostgreSQL pool backing the job store.
///
/// Traffic here is poll-heavy reads over a single table; writes are
/// serialized per job upstream in the store, so the pool stays small.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(8)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(3600))
        .connect(database_url)
        .await
}

/// Apply the embedded migrations at startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

pub mod queries;
