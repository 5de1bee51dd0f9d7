//! Orchestration layer for the hierarchical proof-of-reserves protocol: prover adapter,
//! trusted-setup registry, batch pipeline, verifier, and the JSON/filesystem persistence
//! adapter. [`por_circuit`] stays free of all of this — it only knows about field elements
//! and constraints.

pub mod error;
pub mod persistence;
pub mod pipeline;
pub mod prover;
pub mod registry;
pub mod testdata;
pub mod types;
pub mod verifier;

pub use error::{PorError, Tier};
