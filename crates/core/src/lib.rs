//! Shared domain types for the federated evaluation workflow.
//!
//! Holds the artifact bundle model, the evaluation job state machine,
//! the HTTP wire types exchanged between the developer-side client and
//! the data-owner-side executor, and the common error taxonomy.

pub mod artifact;
pub mod error;
pub mod job;
pub mod types;
pub mod wire;
