pub mod grade;
pub mod health;
pub mod metrics;
