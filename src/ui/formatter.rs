//! Formatting functions for UI output.
//!
//! `format_*` functions are pure and return the text; `display_*` functions
//! print it.

use console::style;

use crate::boundary::BoundaryWarning;
use crate::domain::Version;
use crate::publish::PublishResult;
use crate::reconcile::{ReconciliationEntry, ReconciliationPlan};

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// One line describing a reconciliation entry, e.g. `move v1 abc1234 -> def5678`
pub fn format_entry(entry: &ReconciliationEntry) -> String {
    match entry {
        ReconciliationEntry::Create(tag) => {
            format!("create {} at {}", tag.name, tag.commit.short())
        }
        ReconciliationEntry::Move { from, to } => {
            format!("move {} {} -> {}", to.name, from.short(), to.commit.short())
        }
        ReconciliationEntry::Unchanged(tag) => {
            format!("keep {} at {}", tag.name, tag.commit.short())
        }
    }
}

/// Display the version change (or initial release).
///
/// # Arguments
/// * `current` - Latest released version (None for the first release)
/// * `next` - The version being released
pub fn display_version_change(current: Option<&Version>, next: &Version) {
    match current {
        Some(current) => {
            println!("\n{}", style("Release:").bold());
            println!("  From: {}", style(current).red());
            println!("  To:   {}", style(next).green());
        }
        None => {
            println!("\n{}", style("Initial Release:").bold());
            println!("  New version: {}", style(next).green());
        }
    }
}

/// Display the tag actions a publish run will take.
pub fn display_plan(plan: &ReconciliationPlan) {
    println!("\n{}", style("Tags:").bold());
    for entry in plan.entries() {
        let line = format_entry(entry);
        if entry.is_change() {
            println!("  {}", style(line).cyan());
        } else {
            println!("  {}", style(line).dim());
        }
    }
}

/// Summary line for a finished publish run
pub fn format_publish_summary(result: &PublishResult) -> String {
    let mut parts = Vec::new();
    if let Some(commit) = &result.commit {
        parts.push(format!("committed {}", commit.short()));
    }
    parts.push(format!("{} tag(s) written", result.tags_applied.len()));
    parts.push(format!("{} push(es)", result.pushed.len()));
    if let Some(release) = &result.release {
        parts.push(format!("release {}", release));
    }
    parts.join(", ")
}

/// Display manual push instruction for tags left local.
///
/// # Arguments
/// * `tags` - The tags that were created or moved locally
/// * `remote` - The remote name (e.g., "origin")
pub fn display_manual_push_instruction(tags: &[String], remote: &str) {
    if tags.is_empty() {
        return;
    }
    println!(
        "\n{} To push these tags later, run:\n  {}",
        style("→").yellow(),
        style(format!("git push --force {} {}", remote, tags.join(" "))).cyan()
    );
}
