//! Graph views of one trial.
//!
//! The call tree is built once and cached; every view runs a fresh visitor
//! with its own accumulator.

use crate::graph::{CombineVisitor, ExactMatchVisitor, FullTreeVisitor, GraphDocument, NoMatchVisitor};
use crate::parser::schema::{ActivationTrace, TrialId};
use crate::tree::{build_activation_tree, ActivationTree};
use crate::utils::config::GraphConfig;
use crate::utils::error::{GraphError, TreeError};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which graph view to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GraphMode {
    /// Every occurrence, unrolled
    Tree,
    /// Occurrences with deduplicated call/return counts
    NoMatch,
    /// Structurally identical subtrees collapsed
    ExactMatch,
    /// Aggregated by qualified call path
    Combine,
}

impl fmt::Display for GraphMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GraphMode::Tree => "tree",
            GraphMode::NoMatch => "no_match",
            GraphMode::ExactMatch => "exact_match",
            GraphMode::Combine => "combine",
        };
        f.write_str(name)
    }
}

/// Lazily built call tree of one trial plus its views
#[derive(Debug, Clone)]
pub struct TrialGraph {
    trace: ActivationTrace,
    config: GraphConfig,
    tree: Option<ActivationTree>,
}

impl TrialGraph {
    pub fn new(trace: ActivationTrace, config: GraphConfig) -> Self {
        Self {
            trace,
            config,
            tree: None,
        }
    }

    pub fn trial_id(&self) -> TrialId {
        self.trace.trial_id
    }

    pub fn trace(&self) -> &ActivationTrace {
        &self.trace
    }

    /// Build the call tree on first use
    pub fn graph(&mut self) -> Result<&ActivationTree, TreeError> {
        let tree = match self.tree.take() {
            Some(tree) => tree,
            None => build_activation_tree(&self.trace)?,
        };
        Ok(&*self.tree.insert(tree))
    }

    pub fn tree(&mut self) -> Result<GraphDocument, GraphError> {
        FullTreeVisitor::new().render(self.graph()?)
    }

    pub fn no_match(&mut self) -> Result<GraphDocument, GraphError> {
        NoMatchVisitor::new().render(self.graph()?)
    }

    pub fn exact_match(&mut self) -> Result<GraphDocument, GraphError> {
        let policy = self.config.mix_policy;
        ExactMatchVisitor::render(self.graph()?, policy)
    }

    pub fn combine(&mut self) -> Result<GraphDocument, GraphError> {
        CombineVisitor::new().render(self.graph()?)
    }

    /// Produce the requested view
    ///
    /// **Public** - main entry point used by commands
    pub fn render(&mut self, mode: GraphMode) -> Result<GraphDocument, GraphError> {
        info!("Rendering {} view of trial {}", mode, self.trial_id());
        match mode {
            GraphMode::Tree => self.tree(),
            GraphMode::NoMatch => self.no_match(),
            GraphMode::ExactMatch => self.exact_match(),
            GraphMode::Combine => self.combine(),
        }
    }
}
