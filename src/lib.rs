//! Trial Graph
//!
//! Activation tree reconstruction and graph views for
//! provenance traces of script trials.
//!
//! This crate provides the core implementation for the
//! `trial-graph` CLI tool.
//!
//! ## Getting Started
//!
//! Most users should install and use the CLI:
//!
//! ```bash
//! cargo install trial-graph
//! trial-graph graph --input trace.json --mode combine
//! ```
//!
//! Library users build a [`trial_graph::TrialGraph`] from a parsed
//! [`parser::ActivationTrace`] and render one of its views.

pub mod commands;
pub mod graph;
pub mod output;
pub mod parser;
pub mod tree;
pub mod trial_graph;
pub mod utils;

pub use trial_graph::{GraphMode, TrialGraph};
