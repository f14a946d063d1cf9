//! Output writers for graph reports.
//!
//! This module handles:
//! - The versioned report envelope
//! - JSON reports (pretty)
//! - Text summaries

pub mod json;
pub mod report;
pub mod summary;

// Re-export main functions
pub use json::{read_report, report_to_string, validate_output_path, write_report};
pub use report::{to_report, GraphReport};
pub use summary::generate_text_summary;
