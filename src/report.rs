//! Run summary and its text/JSON renderings.

use crate::delete_queue::DrainReport;
use crate::rename::RenameReport;
use crate::tree::node::{human_size, EntryCounts};
use crate::types::HashAlgorithm;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;

/// What a finished run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: PathBuf,
    pub root_id: String,
    pub id_algorithm: HashAlgorithm,
    pub counts: EntryCounts,
    pub total_bytes: u64,
    pub skipped: usize,
    pub hidden_sidecars: usize,
    pub queued_sidecars: usize,
    pub extractor_available: bool,
    /// Set when the user declined sidecar removal.
    pub deletion_declined: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drain: Option<DrainReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<RenameReport>,
}

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Human-readable summary.
pub fn format_run_text(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Index Summary")));
    out.push_str(&format!("  Target: {}\n", report.target.display()));
    out.push_str(&format!(
        "  Root id ({}): {}\n\n",
        report.id_algorithm, report.root_id
    ));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);
    let rows: Vec<(&str, String)> = vec![
        ("Files", report.counts.files.to_string()),
        ("Links", report.counts.links.to_string()),
        ("Directories", report.counts.directories.to_string()),
        ("Metadata records", report.counts.records.to_string()),
        ("Skipped items", report.skipped.to_string()),
        ("Merged sidecars", report.hidden_sidecars.to_string()),
        ("Queued for removal", report.queued_sidecars.to_string()),
        (
            "Total size",
            format!("{} ({} bytes)", human_size(report.total_bytes), report.total_bytes),
        ),
        ("Extractor", yes_no(report.extractor_available).to_string()),
    ];
    for (metric, value) in rows {
        table.add_row(vec![metric.to_string(), value]);
    }
    out.push_str(&format!("{}\n", table));

    if report.deletion_declined {
        out.push_str(&format!(
            "\n  {}\n",
            "Sidecar removal declined; no files were deleted.".yellow()
        ));
    }
    if let Some(drain) = &report.drain {
        out.push_str(&format!(
            "\n{}\n  Removed: {}  Missing: {}  Kept: {}  Failed: {}\n",
            format_section_heading("Sidecar removal"),
            drain.removed.len(),
            drain.missing.len(),
            drain.kept.len(),
            drain.failed.len()
        ));
        for (path, error) in &drain.failed {
            out.push_str(&format!("  {} {}: {}\n", "x".red(), path.display(), error));
        }
    }
    if let Some(rename) = &report.rename {
        out.push_str(&format!("\n{}\n", format_section_heading("Rename")));
        if !rename.planned.is_empty() {
            out.push_str(&format!("  Dry run, {} planned:\n", rename.planned.len()));
            for plan in &rename.planned {
                out.push_str(&format!(
                    "  {} -> {}\n",
                    plan.from.display(),
                    plan.to.display()
                ));
            }
        } else {
            out.push_str(&format!(
                "  Renamed: {}  Collisions: {}  Failed: {}\n",
                rename.renamed.len(),
                rename.collisions.len(),
                rename.failed.len()
            ));
        }
        for plan in &rename.collisions {
            out.push_str(&format!(
                "  {} {} exists\n",
                "!".yellow(),
                plan.to.display()
            ));
        }
    }
    out
}

pub fn format_run_json(report: &RunReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
