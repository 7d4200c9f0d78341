//! Assay Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout Assay:
//! - Unified completion request/response types
//! - Provider and tool executor trait abstractions
//! - Core error types

pub mod error;
pub mod normalized;
pub mod provider;
pub mod tools;

pub use error::{Error, Result};
pub use provider::{Provider, ProviderKind};
pub use tools::ToolExecutor;
