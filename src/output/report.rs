//! Report envelope written to disk.
//!
//! Schema is versioned to allow future evolution.

use crate::graph::GraphDocument;
use crate::parser::schema::TrialId;
use crate::trial_graph::GraphMode;
use crate::utils::config::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};

/// Top-level structure written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// Trial the graph was built from
    pub trial_id: TrialId,

    /// View that produced the graph
    pub mode: GraphMode,

    /// Number of activations in the trial
    pub activation_count: usize,

    /// Timestamp when the report was generated
    pub generated_at: String,

    pub graph: GraphDocument,
}

/// Wrap a rendered graph into a report
///
/// **Public** - used by commands to create final output
pub fn to_report(
    trial_id: TrialId,
    mode: GraphMode,
    activation_count: usize,
    graph: GraphDocument,
) -> GraphReport {
    use chrono::Utc;

    GraphReport {
        version: SCHEMA_VERSION.to_string(),
        trial_id,
        mode,
        activation_count,
        generated_at: Utc::now().to_rfc3339(),
        graph,
    }
}
