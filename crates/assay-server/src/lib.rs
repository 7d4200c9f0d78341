//! Assay Server
//!
//! Wires configuration, backends, the grounding validator and the streaming
//! pipeline into one axum application.

pub mod app;
pub mod config;
pub mod logging;
pub mod logging_provider;

pub use app::AppContext;
pub use config::{ConfigError, ServerConfig};
