//! Human-readable summary rendering.

use super::CompatibilityReport;
use crate::classify::{ClassifiedChange, Severity};
use crate::error::Result;
use std::io::Write;

/// Write the report as a plain-text summary.
pub fn render<W: Write>(report: &CompatibilityReport, writer: &mut W) -> Result<()> {
    writeln!(
        writer,
        "{} -> {}: {}",
        report.sources.old, report.sources.new, report.verdict
    )?;
    writeln!(
        writer,
        "{} changes ({} breaking, {} compatible, {} informational)",
        report.summary.total,
        report.summary.breaking,
        report.summary.compatible,
        report.summary.informational
    )?;

    for severity in [
        Severity::Breaking,
        Severity::Compatible,
        Severity::Informational,
    ] {
        let changes: Vec<&ClassifiedChange> = report.changes_with_severity(severity).collect();
        if changes.is_empty() {
            continue;
        }
        writeln!(writer)?;
        writeln!(writer, "{severity}:")?;
        for classified in changes {
            write!(
                writer,
                "  {} {} [{}]",
                kind_marker(classified),
                classified.change.location,
                classified.rule
            )?;
            match (&classified.change.before, &classified.change.after) {
                (Some(before), Some(after)) => write!(writer, ": {before} -> {after}")?,
                (Some(before), None) => write!(writer, ": was {before}")?,
                (None, Some(after)) => write!(writer, ": now {after}")?,
                (None, None) => {}
            }
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn kind_marker(classified: &ClassifiedChange) -> &'static str {
    use crate::diff::ChangeKind;
    match classified.change.kind {
        ChangeKind::Added => "+",
        ChangeKind::Removed => "-",
        ChangeKind::Modified => "~",
    }
}
