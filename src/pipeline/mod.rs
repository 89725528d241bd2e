//! End-to-end check pipeline.
//!
//! Wires the stages together: resolve two schema sources, load them in
//! parallel, diff, classify, and assemble the report. Loading failures abort
//! before any diffing starts; a report is only ever produced from two fully
//! loaded documents.

use crate::classify::classify_all;
use crate::config::CompareOptions;
use crate::diff::DiffEngine;
use crate::error::{CompatError, Result};
use crate::loader::{load_document, load_document_str};
use crate::model::SchemaDocument;
use crate::report::{CompatibilityReport, ReportBuilder, Verdict};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

/// Process exit codes. BREAKING changes are a FAIL result, not an error.
pub mod exit_codes {
    pub const PASS: i32 = 0;
    pub const FAIL: i32 = 1;
    pub const ERROR: i32 = 2;
}

/// Where a schema document comes from.
#[derive(Debug, Clone)]
pub enum SchemaSource {
    /// A JSON file on disk
    File(PathBuf),
    /// An already-parsed document, named for reporting
    Inline {
        name: String,
        value: serde_json::Value,
    },
}

impl SchemaSource {
    /// Display name used in reports and errors.
    pub fn name(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Inline { name, .. } => name.clone(),
        }
    }
}

/// Load a single schema document from its source.
pub fn load_schema(source: &SchemaSource) -> Result<SchemaDocument> {
    match source {
        SchemaSource::File(path) => {
            let content =
                std::fs::read_to_string(path).map_err(|e| CompatError::io(path.clone(), e))?;
            load_document_str(&path.display().to_string(), &content)
        }
        SchemaSource::Inline { name, value } => load_document(name, value),
    }
}

/// Load a schema, aborting if it takes longer than `timeout`.
///
/// The load runs on its own thread; on timeout the thread is abandoned and a
/// [`CompatError::FetchTimeout`] is returned so a hung or slow source is
/// never mistaken for a compatibility verdict.
pub fn load_schema_with_timeout(source: SchemaSource, timeout: Duration) -> Result<SchemaDocument> {
    let source_name = source.name();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(load_schema(&source));
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(CompatError::FetchTimeout {
            source_name,
            timeout,
        }),
    }
}

/// Load both documents in parallel. The comparison only proceeds once both
/// loads have succeeded; the first error aborts the whole check.
pub fn load_pair(
    old: SchemaSource,
    new: SchemaSource,
    timeout: Option<Duration>,
) -> Result<(SchemaDocument, SchemaDocument)> {
    let load = |source: SchemaSource| match timeout {
        Some(timeout) => load_schema_with_timeout(source, timeout),
        None => load_schema(&source),
    };
    let (old_result, new_result) = rayon::join(|| load(old), || load(new));
    Ok((old_result?, new_result?))
}

/// Run one complete check: load, diff, classify, report.
pub fn run_check(
    old: SchemaSource,
    new: SchemaSource,
    options: CompareOptions,
    timeout: Option<Duration>,
) -> Result<CompatibilityReport> {
    let (old_name, new_name) = (old.name(), new.name());
    let (old_doc, new_doc) = load_pair(old, new, timeout)?;

    tracing::info!(
        old = %old_name,
        new = %new_name,
        old_operations = old_doc.operation_count(),
        new_operations = new_doc.operation_count(),
        "comparing schemas"
    );

    let changes = DiffEngine::with_options(options).diff(&old_doc, &new_doc);
    let classified = classify_all(changes);
    let report = ReportBuilder::new(old_name, new_name).build(classified);

    tracing::info!(
        verdict = %report.verdict,
        breaking = report.summary.breaking,
        total = report.summary.total,
        "check complete"
    );
    Ok(report)
}

/// Map a verdict to a process exit code.
pub fn exit_code(verdict: Verdict) -> i32 {
    match verdict {
        Verdict::Pass => exit_codes::PASS,
        Verdict::Fail => exit_codes::FAIL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inline(name: &str, value: serde_json::Value) -> SchemaSource {
        SchemaSource::Inline {
            name: name.to_string(),
            value,
        }
    }

    fn minimal() -> serde_json::Value {
        json!({
            "paths": {
                "/health": {"get": {"responses": {"200": {"description": "ok"}}}}
            }
        })
    }

    #[test]
    fn test_run_check_identical_passes() {
        let report = run_check(
            inline("old", minimal()),
            inline("new", minimal()),
            CompareOptions::new(),
            None,
        )
        .unwrap();
        assert_eq!(report.verdict, Verdict::Pass);
        assert_eq!(report.summary.total, 0);
        assert_eq!(exit_code(report.verdict), exit_codes::PASS);
    }

    #[test]
    fn test_run_check_removed_operation_fails() {
        let report = run_check(
            inline("old", minimal()),
            inline("new", json!({"paths": {}})),
            CompareOptions::new(),
            None,
        )
        .unwrap();
        assert_eq!(report.verdict, Verdict::Fail);
        assert_eq!(exit_code(report.verdict), exit_codes::FAIL);
    }

    #[test]
    fn test_load_error_aborts_before_report() {
        let result = run_check(
            inline("old", json!({"not_paths": {}})),
            inline("new", minimal()),
            CompareOptions::new(),
            None,
        );
        assert!(matches!(result, Err(CompatError::Load { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_schema(&SchemaSource::File(PathBuf::from(
            "/nonexistent/schema.json",
        )));
        assert!(matches!(result, Err(CompatError::Io { .. })));
    }

    #[test]
    fn test_file_source_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, minimal().to_string()).unwrap();

        let doc = load_schema(&SchemaSource::File(path)).unwrap();
        assert_eq!(doc.operation_count(), 1);
    }

    #[test]
    fn test_blocked_source_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.pipe");
        let status = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success(), "mkfifo failed");

        // Opening a pipe with no writer blocks, so the load thread never
        // finishes and the deadline must fire.
        let err = load_schema_with_timeout(SchemaSource::File(path), Duration::from_millis(50))
            .unwrap_err();
        assert!(err.is_timeout(), "{err}");
        match err {
            CompatError::FetchTimeout {
                source_name,
                timeout,
            } => {
                assert!(source_name.ends_with("schema.pipe"));
                assert_eq!(timeout, Duration::from_millis(50));
            }
            other => panic!("expected fetch timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_generous_timeout_still_loads() {
        let doc = load_schema_with_timeout(
            inline("old", minimal()),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(doc.operation_count(), 1);
    }
}
