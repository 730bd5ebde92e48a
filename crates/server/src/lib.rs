//! HTTP server wiring: router, middleware, metrics, shared state.
//!
//! Exposed as a library so integration tests can assemble an in-process
//! server with mock dependencies.

pub mod api;
pub mod metrics;
pub mod state;
