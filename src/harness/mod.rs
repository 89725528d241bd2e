//! Test harness adapter.
//!
//! Turns a report into one assertable unit per change category, so a CI suite
//! surfaces "parameters are compatible: FAILED" instead of one opaque boolean
//! for the whole comparison. Only BREAKING changes fail a category; compatible
//! and informational changes are listed but do not affect the outcome.

use crate::classify::{ClassifiedChange, Severity};
use crate::diff::ChangeCategory;
use crate::report::CompatibilityReport;
use serde::Serialize;
use std::fmt::Write as _;

/// Outcome of one category of changes.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCheck {
    pub category: ChangeCategory,
    pub passed: bool,
    /// Breaking changes attributed to this category, in report order
    pub breaking: Vec<ClassifiedChange>,
}

impl CategoryCheck {
    /// One-line assertion message for test output.
    pub fn message(&self) -> String {
        if self.passed {
            return format!("{}: ok", self.category);
        }
        let mut message = format!(
            "{}: {} breaking change(s)",
            self.category,
            self.breaking.len()
        );
        for classified in &self.breaking {
            let _ = write!(
                message,
                "\n  {} [{}]",
                classified.change.location, classified.rule
            );
        }
        message
    }
}

/// Split a report into per-category checks.
///
/// Every category appears exactly once, in a fixed order, whether or not any
/// change touched it. A category with no breaking changes passes.
pub fn category_checks(report: &CompatibilityReport) -> Vec<CategoryCheck> {
    ChangeCategory::ALL
        .iter()
        .map(|&category| {
            let breaking: Vec<ClassifiedChange> = report
                .changes
                .iter()
                .filter(|c| c.severity == Severity::Breaking && c.change.category() == category)
                .cloned()
                .collect();
            CategoryCheck {
                category,
                passed: breaking.is_empty(),
                breaking,
            }
        })
        .collect()
}

/// Assert-style helper: `Ok(())` when no category fails, otherwise an error
/// listing every failing category with its breaking locations.
pub fn assert_compatible(report: &CompatibilityReport) -> Result<(), String> {
    let failed: Vec<CategoryCheck> = category_checks(report)
        .into_iter()
        .filter(|check| !check.passed)
        .collect();
    if failed.is_empty() {
        return Ok(());
    }
    let mut message = format!(
        "{} of {} categories have breaking changes",
        failed.len(),
        ChangeCategory::ALL.len()
    );
    for check in &failed {
        let _ = write!(message, "\n{}", check.message());
    }
    Err(message)
}
