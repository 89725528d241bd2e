//! Report assembly and rendering.
//!
//! The builder turns classified changes into a [`CompatibilityReport`] with a
//! verdict and per-severity counts. Rendering the same report twice yields
//! byte-identical output: changes are stably sorted by location, counts are
//! derived, and no timestamps or environment data are included.

mod json;
mod summary;

use crate::classify::{ClassifiedChange, Severity};
use crate::error::{CompatError, Result};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Overall outcome of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        })
    }
}

/// Names of the two compared documents.
#[derive(Debug, Clone, Serialize)]
pub struct SourcePair {
    pub old: String,
    pub new: String,
}

/// Per-severity change counts.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ChangeSummary {
    pub total: usize,
    pub breaking: usize,
    pub compatible: usize,
    pub informational: usize,
}

/// The complete result of one comparison.
#[derive(Debug, Clone, Serialize)]
pub struct CompatibilityReport {
    pub verdict: Verdict,
    pub sources: SourcePair,
    pub summary: ChangeSummary,
    pub changes: Vec<ClassifiedChange>,
}

impl CompatibilityReport {
    /// Changes of one severity, in report order.
    pub fn changes_with_severity(
        &self,
        severity: Severity,
    ) -> impl Iterator<Item = &ClassifiedChange> {
        self.changes.iter().filter(move |c| c.severity == severity)
    }

    pub fn has_breaking_changes(&self) -> bool {
        self.summary.breaking > 0
    }
}

/// Assembles classified changes into a report.
#[derive(Debug)]
pub struct ReportBuilder {
    old_name: String,
    new_name: String,
}

impl ReportBuilder {
    pub fn new(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Build the report. The verdict is a pure function of the changes:
    /// FAIL iff at least one is BREAKING.
    pub fn build(self, mut changes: Vec<ClassifiedChange>) -> CompatibilityReport {
        // Stable: discovery order is kept among changes at the same location.
        changes.sort_by(|a, b| a.change.location.cmp(&b.change.location));

        let mut summary = ChangeSummary {
            total: changes.len(),
            ..Default::default()
        };
        for classified in &changes {
            match classified.severity {
                Severity::Breaking => summary.breaking += 1,
                Severity::Compatible => summary.compatible += 1,
                Severity::Informational => summary.informational += 1,
            }
        }

        let verdict = if summary.breaking > 0 {
            Verdict::Fail
        } else {
            Verdict::Pass
        };

        CompatibilityReport {
            verdict,
            sources: SourcePair {
                old: self.old_name,
                new: self.new_name,
            },
            summary,
            changes,
        }
    }
}

/// Output formats for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Machine-readable JSON
    Json,
    /// Human-readable text summary
    #[default]
    Summary,
}

impl FromStr for ReportFormat {
    type Err = CompatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "summary" | "text" => Ok(Self::Summary),
            other => Err(CompatError::report(
                "format selection",
                crate::error::ReportErrorKind::UnsupportedFormat(other.to_string()),
            )),
        }
    }
}

/// Render a report to a writer in the given format.
pub fn render<W: Write>(
    report: &CompatibilityReport,
    format: ReportFormat,
    writer: &mut W,
) -> Result<()> {
    match format {
        ReportFormat::Json => json::render(report, writer),
        ReportFormat::Summary => summary::render(report, writer),
    }
}

/// Render a report to a string.
pub fn render_to_string(report: &CompatibilityReport, format: ReportFormat) -> Result<String> {
    let mut buffer = Vec::new();
    render(report, format, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| {
        CompatError::report(
            "output buffer",
            crate::error::ReportErrorKind::JsonSerializationError(e.to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, Severity};
    use crate::diff::{Change, ChangeDetail, ChangeKind};
    use crate::model::{HttpMethod, Location};

    fn classified(location: Location, kind: ChangeKind, detail: ChangeDetail) -> ClassifiedChange {
        classify(Change::new(location, kind, detail))
    }

    #[test]
    fn test_verdict_fail_iff_breaking() {
        let report = ReportBuilder::new("old", "new").build(vec![classified(
            Location::operation(HttpMethod::Get, "/users"),
            ChangeKind::Added,
            ChangeDetail::Operation,
        )]);
        assert_eq!(report.verdict, Verdict::Pass);

        let report = ReportBuilder::new("old", "new").build(vec![classified(
            Location::operation(HttpMethod::Get, "/users"),
            ChangeKind::Removed,
            ChangeDetail::Operation,
        )]);
        assert_eq!(report.verdict, Verdict::Fail);
        assert_eq!(report.summary.breaking, 1);
    }

    #[test]
    fn test_empty_report_passes() {
        let report = ReportBuilder::new("old", "new").build(Vec::new());
        assert_eq!(report.verdict, Verdict::Pass);
        assert_eq!(report.summary.total, 0);
    }

    #[test]
    fn test_changes_sorted_by_location() {
        let report = ReportBuilder::new("old", "new").build(vec![
            classified(
                Location::component("Zebra"),
                ChangeKind::Added,
                ChangeDetail::Component,
            ),
            classified(
                Location::component("Alpha"),
                ChangeKind::Added,
                ChangeDetail::Component,
            ),
        ]);
        assert_eq!(report.changes[0].change.location.to_string(), "components.Alpha");
        assert_eq!(report.changes[1].change.location.to_string(), "components.Zebra");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let build = || {
            ReportBuilder::new("old", "new").build(vec![
                classified(
                    Location::component("User").child("email"),
                    ChangeKind::Removed,
                    ChangeDetail::Field {
                        required: true,
                        has_default: false,
                    },
                ),
                classified(
                    Location::operation(HttpMethod::Get, "/health"),
                    ChangeKind::Added,
                    ChangeDetail::Operation,
                ),
            ])
        };
        let first = render_to_string(&build(), ReportFormat::Json).unwrap();
        let second = render_to_string(&build(), ReportFormat::Json).unwrap();
        assert_eq!(first, second);

        let first = render_to_string(&build(), ReportFormat::Summary).unwrap();
        let second = render_to_string(&build(), ReportFormat::Summary).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_severity_filter() {
        let report = ReportBuilder::new("old", "new").build(vec![
            classified(
                Location::component("User").child("email"),
                ChangeKind::Removed,
                ChangeDetail::Field {
                    required: true,
                    has_default: false,
                },
            ),
            classified(
                Location::component("User").child("description"),
                ChangeKind::Modified,
                ChangeDetail::Metadata,
            ),
        ]);
        assert_eq!(report.changes_with_severity(Severity::Breaking).count(), 1);
        assert_eq!(
            report.changes_with_severity(Severity::Informational).count(),
            1
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!(
            "SUMMARY".parse::<ReportFormat>().unwrap(),
            ReportFormat::Summary
        );
        assert!("yaml".parse::<ReportFormat>().is_err());
    }
}
