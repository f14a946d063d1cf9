//! Configuration and constants for graph construction and the CLI.

use crate::tree::MixPolicy;

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Graph node id used as the source of the synthetic `initial` edge
pub const INITIAL_NODE_ID: usize = 0;

/// Count carried by the synthetic `initial` edge
pub const INITIAL_EDGE_COUNT: u64 = 1;

/// Separator between ancestor names in a combine namespace
pub const NAMESPACE_SEPARATOR: &str = " ";

/// Default number of rows in the text summary
pub const DEFAULT_SUMMARY_LINES: usize = 10;
pub const MAX_SUMMARY_LINES: usize = 1000;

// Field names for activation lists (exporters disagree on the name)
pub const ACTIVATION_FIELD_NAMES: &[&str] = &[
    "activations",
    "function_activations",
    "trace",
    "result",
];
pub const TRIAL_FIELD_NAMES: &[&str] = &["trial_id", "trial", "trialId"];

/// Settings shared by every graph view of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphConfig {
    /// How durations of collapsed (mixed) nodes combine
    pub mix_policy: MixPolicy,
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mix_policy(mut self, mix_policy: MixPolicy) -> Self {
        self.mix_policy = mix_policy;
        self
    }
}
