//! Authenticated image gallery service

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Gallery view-model
pub mod gallery;

/// Namespace-scoped image operations on top of an object store
pub mod gateway;

/// Signed-in principal resolution
pub mod identity;

/// Request middleware
pub mod middleware;

/// Per-principal namespaces and object keys
pub mod namespace;

/// HTTP routes
pub mod routes;

/// HTTP server
pub mod server;

/// Object store backends
pub mod storage;

/// Shared types
pub mod types;

/// Test doubles
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
