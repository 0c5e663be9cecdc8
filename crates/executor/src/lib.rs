//! Data-owner side evaluation executor.
//!
//! Accepts artifact bundles over HTTP, runs one evaluation job per
//! request against a private dataset through an external evaluator, and
//! serves job status and anonymised results until they are evicted.
//! The library half exists so integration tests and the binary share the
//! same router and middleware stack.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod handlers;
pub mod metrics;
pub mod policy;
pub mod retention;
pub mod router;
pub mod routes;
pub mod runner;
pub mod state;
pub mod store;
