//! Graph command implementation.
//!
//! The graph command:
//! 1. Loads the activation trace
//! 2. Builds the call tree
//! 3. Renders the requested view
//! 4. Writes the report

use super::models::GraphArgs;
use crate::output::{generate_text_summary, to_report, validate_output_path, write_report};
use crate::parser::load_trace;
use crate::trial_graph::TrialGraph;
use crate::utils::config::{GraphConfig, MAX_SUMMARY_LINES};
use anyhow::{Context, Result};
use log::{debug, info};
use std::time::Instant;

/// Execute the graph command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Trace file missing or malformed
/// * Trace that cannot be turned into a call tree
/// * File write errors
pub fn execute_graph(args: GraphArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Starting {} graph for trace: {}", args.mode, args.input.display());

    // Step 1: Load trace
    info!("Step 1/4: Loading activation trace...");
    let trace = load_trace(&args.input)
        .with_context(|| format!("Failed to load trace from {}", args.input.display()))?;
    let activation_count = trace.len();
    debug!(
        "Loaded trial {} with {} activations",
        trace.trial_id, activation_count
    );

    // Step 2: Build tree
    info!("Step 2/4: Building activation tree...");
    let config = GraphConfig::new().with_mix_policy(args.mix_policy);
    let mut trial = TrialGraph::new(trace, config);
    let structural_nodes = trial
        .graph()
        .context("Failed to build activation tree")?
        .structural_count();
    debug!("Tree has {} structural nodes", structural_nodes);

    // Step 3: Render view
    info!("Step 3/4: Rendering {} view...", args.mode);
    let graph = trial
        .render(args.mode)
        .with_context(|| format!("Failed to render {} view", args.mode))?;
    info!(
        "Graph has {} nodes and {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );

    // Step 4: Write report
    info!("Step 4/4: Writing output files...");
    let summary = args
        .print_summary
        .then(|| generate_text_summary(&graph, args.summary_lines));
    let report = to_report(trial.trial_id(), args.mode, activation_count, graph);
    write_report(&report, &args.output_json).context("Failed to write graph report")?;

    info!("✓ Report written to: {}", args.output_json.display());

    if let Some(summary) = summary {
        println!("\n{}", "=".repeat(84));
        println!("TRIAL {} - {} VIEW", report.trial_id, report.mode);
        println!("{}", "=".repeat(84));
        println!("Activations: {}", activation_count);
        println!("Graph Nodes: {}", report.graph.nodes.len());
        println!("\n{}", summary);
        println!("{}", "=".repeat(84));
    }

    let elapsed = start_time.elapsed();
    info!("Graph completed in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

/// Validate graph arguments
///
/// **Public** - can be called before execute_graph for early validation
pub fn validate_args(args: &GraphArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Input trace path cannot be empty");
    }

    if !args.input.is_file() {
        anyhow::bail!("Input trace not found: {}", args.input.display());
    }

    validate_output_path(&args.output_json).context("Invalid output path")?;

    if args.summary_lines == 0 {
        anyhow::bail!("summary_lines must be greater than 0");
    }

    if args.summary_lines > MAX_SUMMARY_LINES {
        anyhow::bail!("summary_lines is too large (max {})", MAX_SUMMARY_LINES);
    }

    Ok(())
}
