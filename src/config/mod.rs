use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Base URL of the external grading worker (e.g., "https://grader.example.com")
    pub worker_endpoint: String,

    /// Bearer token for the grading worker API, if it requires one
    #[serde(default)]
    pub worker_api_token: Option<String>,

    /// Timeout for a submission call to the worker, in seconds
    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,

    /// Timeout for a status fetch from the worker, in seconds
    #[serde(default = "default_status_timeout_secs")]
    pub status_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_submit_timeout_secs() -> u64 {
    30
}

fn default_status_timeout_secs() -> u64 {
    5
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }
}
