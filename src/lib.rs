//! Customer churn prediction service.
//!
//! Loads one fitted churn pipeline and its decision threshold at startup and
//! serves them over a small JSON API.

pub mod config;
pub mod error;
pub mod estimator;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod service;
