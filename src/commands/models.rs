use crate::trial_graph::GraphMode;
use crate::tree::MixPolicy;
use crate::utils::config::DEFAULT_SUMMARY_LINES;
use std::path::PathBuf;

/// Arguments for the graph command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct GraphArgs {
    /// Activation trace JSON file
    pub input: PathBuf,

    /// Output path for the JSON graph report
    pub output_json: PathBuf,

    /// Graph view to render
    pub mode: GraphMode,

    /// How collapsed node durations combine
    pub mix_policy: MixPolicy,

    /// Print text summary to stdout
    pub print_summary: bool,

    /// Rows in the text summary
    pub summary_lines: usize,
}

impl Default for GraphArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("trace.json"),
            output_json: PathBuf::from("graph.json"),
            mode: GraphMode::Tree,
            mix_policy: MixPolicy::default(),
            print_summary: false,
            summary_lines: DEFAULT_SUMMARY_LINES,
        }
    }
}
