//! Data models shared by the HTTP layer
//!
//! - `config` - Configuration management
//! - `response` - JSON response envelope
//! - `app_state` - Application state shared across handlers

pub mod app_state;
pub mod config;
pub mod response;

pub use app_state::AppState;
pub use config::{Cli, Configuration, SharedStoreKind};
pub use response::Result;
