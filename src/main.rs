//! Trial Graph CLI
//!
//! Rebuilds the call tree of a recorded trial and writes
//! one of its graph views as JSON.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use trial_graph::commands::{
    display_schema, display_version, execute_graph, validate_args, validate_report_file, GraphArgs,
};
use trial_graph::tree::MixPolicy;
use trial_graph::utils::config::DEFAULT_SUMMARY_LINES;
use trial_graph::GraphMode;

/// Trial Graph - call graph views of provenance traces
#[derive(Parser, Debug)]
#[command(name = "trial-graph")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a graph view of one trial
    Graph {
        /// Activation trace JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for JSON graph report
        #[arg(short, long, default_value = "graph.json")]
        output: PathBuf,

        /// Graph view to render
        #[arg(short, long, value_enum, default_value_t = GraphMode::Tree)]
        mode: GraphMode,

        /// How durations of collapsed subtrees combine
        #[arg(long, value_enum, default_value_t = MixPolicy::Sum, env = "TRIAL_GRAPH_MIX_POLICY")]
        mix_policy: MixPolicy,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,

        /// Number of rows in the text summary
        #[arg(long, default_value_t = DEFAULT_SUMMARY_LINES)]
        summary_lines: usize,
    },

    /// Validate a graph report JSON file
    Validate {
        /// Path to graph report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Graph {
            input,
            output,
            mode,
            mix_policy,
            summary,
            summary_lines,
        } => {
            let args = GraphArgs {
                input,
                output_json: output,
                mode,
                mix_policy,
                print_summary: summary,
                summary_lines,
            };

            // Validate args first
            validate_args(&args)?;

            execute_graph(args)?;
        }

        Commands::Validate { file } => {
            validate_report_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
