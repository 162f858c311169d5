//! Grading Job Lifecycle Service
//!
//! This library tracks media-artifact grading jobs submitted to an external
//! grading worker: submission, polling, worker callbacks, and race-free
//! reconciliation of the final verdict into a durable job record.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
