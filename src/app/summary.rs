//! End-of-run output: dry-run listing, completion summary, JSON report.

use std::path::Path;

use anyhow::{Context, Result};
use objdl_core::{PathResolver, RemoteObject, RunReport};
use tracing::{info, warn};

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub(crate) fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

/// One line per object: `<size>  <key> -> <destination>`.
pub(crate) fn render_dry_run_lines(objects: &[RemoteObject], resolver: &PathResolver) -> Vec<String> {
    objects
        .iter()
        .map(|object| match resolver.destination(&object.key) {
            Ok(path) => format!("{:>12}  {} -> {}", object.size, object.key, path.display()),
            Err(error) => format!("{:>12}  {} -> skipped: {error}", object.size, object.key),
        })
        .collect()
}

pub(crate) fn print_dry_run(objects: &[RemoteObject], resolver: &PathResolver) {
    for line in render_dry_run_lines(objects, resolver) {
        println!("{line}");
    }
    let bytes: u64 = objects.iter().map(|object| object.size).sum();
    info!(objects = objects.len(), bytes, "Dry run: nothing downloaded");
}

/// Lines describing failed and unstarted objects, truncated to `width`.
pub(crate) fn render_failure_lines(report: &RunReport, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.failed.is_empty() {
        lines.push(truncate_to_width(
            &format!("Failed objects ({}):", report.failed.len()),
            width,
        ));
        for failed in &report.failed {
            lines.push(truncate_to_width(
                &format!("- {}: {}", failed.key, failed.reason),
                width,
            ));
        }
    }
    if !report.not_started.is_empty() {
        lines.push(truncate_to_width(
            &format!("Not started after interruption: {}", report.not_started.len()),
            width,
        ));
    }
    lines
}

pub(crate) fn print_completion_summary(report: &RunReport, output_dir: &Path) {
    info!(
        completed = report.completed.len(),
        failed = report.failed.len(),
        bytes = report.total_bytes(),
        waves = report.waves,
        output_dir = %output_dir.display(),
        "Download Summary"
    );
    if report.interrupted {
        warn!(
            not_started = report.not_started.len(),
            "Interrupted between waves. Run again to fetch the rest."
        );
    }
    for line in render_failure_lines(report, terminal_width()) {
        println!("{line}");
    }
}

/// Writes `report` as pretty JSON.
pub(crate) fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write run report '{}'", path.display()))?;
    info!(path = %path.display(), "Run report written");
    Ok(())
}
