//! Activation trace parsing and input schema.
//!
//! This module handles:
//! - Parsing raw JSON exported by a trace store
//! - Validating activation ordering
//! - Defining the input records consumed by the tree builder

pub mod activations;
pub mod schema;

// Re-export main types
pub use activations::{load_trace, parse_trace, validate_trace_order};
pub use schema::{Activation, ActivationId, ActivationTrace, TrialId};
