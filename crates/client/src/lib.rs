//! Developer-side client for federated model evaluation.
//!
//! The pipeline runs in order: stage artifacts and upload them
//! ([`submission`]), request a job ([`initiator`]), poll its state
//! ([`tracker`]), and fetch the result ([`retriever`]). All executor
//! access goes through the [`executor::EvaluationExecutor`] trait.

pub mod board;
pub mod config;
pub mod executor;
pub mod http;
pub mod initiator;
pub mod retriever;
pub mod submission;
pub mod tracker;
