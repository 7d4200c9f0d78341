//! Assay Routing
//!
//! The provider gateway: decides which completion backend serves a request and
//! substitutes the fallback backend once when the primary fails.

pub mod credentials;
pub mod gateway;

pub use credentials::CredentialState;
pub use gateway::{GatewayBuilder, ProviderGateway};
