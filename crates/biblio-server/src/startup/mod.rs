//! Server startup: logging and the HTTP listener

pub mod http;
pub mod logging;

pub use http::{configure, main_server};
pub use logging::{LogFormat, LogRotation, LoggingConfig, LoggingGuard, init_logging};
