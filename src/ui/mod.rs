//! User interface module - terminal output for the CLI.
//!
//! Progress and results go to the terminal through here; `log` output is
//! diagnostic only.

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_boundary_warning, display_error, display_manual_push_instruction, display_plan,
    display_status, display_success, display_version_change, format_entry,
    format_publish_summary,
};
