//! End-to-end integration tests for Assay
//!
//! These tests wire the server context against mocked completion backends
//! and a mocked business layer to verify the full request flow.
