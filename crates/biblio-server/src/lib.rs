//! Biblio Server - HTTP surface of the lending service
//!
//! - `api`: route handlers
//! - `model`: configuration, response envelope, shared state
//! - `startup`: logging and server bootstrap
//! - `metrics`: Prometheus recorder and `/metrics`

pub mod api;
pub mod error;
pub mod metrics;
pub mod model;
pub mod startup;
