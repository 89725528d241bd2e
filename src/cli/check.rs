//! Check command handler.
//!
//! Implements the `check` subcommand for comparing two schema documents.

use crate::config::CompareOptions;
use crate::pipeline::{self, SchemaSource};
use crate::report::{self, ReportFormat};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Everything the `check` subcommand needs, assembled by main.rs.
#[derive(Debug)]
pub struct CheckConfig {
    pub old: PathBuf,
    pub new: PathBuf,
    pub format: ReportFormat,
    pub output_file: Option<PathBuf>,
    pub options_file: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

/// Run the check command, returning the desired exit code.
///
/// The caller is responsible for calling `std::process::exit()` with the
/// returned code when it is non-zero.
pub fn run_check(config: CheckConfig) -> Result<i32> {
    let options = match &config.options_file {
        Some(path) => CompareOptions::from_file(path)
            .with_context(|| format!("loading compare options from {}", path.display()))?,
        None => CompareOptions::new(),
    };

    let report = pipeline::run_check(
        SchemaSource::File(config.old),
        SchemaSource::File(config.new),
        options,
        config.timeout,
    )?;

    match &config.output_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            let mut writer = std::io::BufWriter::new(file);
            report::render(&report, config.format, &mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            report::render(&report, config.format, &mut writer)?;
        }
    }

    Ok(pipeline::exit_code(report.verdict))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::exit_codes;
    use serde_json::json;

    fn write_schema(dir: &std::path::Path, name: &str, value: serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_check_writes_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let schema = json!({
            "paths": {"/health": {"get": {"responses": {"200": {"description": "ok"}}}}}
        });
        let old = write_schema(dir.path(), "old.json", schema.clone());
        let new = write_schema(dir.path(), "new.json", schema);
        let output = dir.path().join("report.json");

        let code = run_check(CheckConfig {
            old,
            new,
            format: ReportFormat::Json,
            output_file: Some(output.clone()),
            options_file: None,
            timeout: None,
        })
        .unwrap();

        assert_eq!(code, exit_codes::PASS);
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(value["verdict"], "PASS");
    }

    #[test]
    fn test_check_breaking_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let old = write_schema(
            dir.path(),
            "old.json",
            json!({
                "paths": {"/users": {"get": {"responses": {"200": {"description": "ok"}}}}}
            }),
        );
        let new = write_schema(dir.path(), "new.json", json!({"paths": {}}));
        let output = dir.path().join("report.json");

        let code = run_check(CheckConfig {
            old,
            new,
            format: ReportFormat::Json,
            output_file: Some(output),
            options_file: None,
            timeout: None,
        })
        .unwrap();
        assert_eq!(code, exit_codes::FAIL);
    }

    #[test]
    fn test_missing_input_is_error() {
        let result = run_check(CheckConfig {
            old: PathBuf::from("/nonexistent/old.json"),
            new: PathBuf::from("/nonexistent/new.json"),
            format: ReportFormat::Summary,
            output_file: None,
            options_file: None,
            timeout: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_options_file_applied() {
        let dir = tempfile::tempdir().unwrap();
        let old = write_schema(
            dir.path(),
            "old.json",
            json!({
                "paths": {
                    "/internal/debug": {"get": {"responses": {"200": {"description": "ok"}}}},
                    "/users": {"get": {"responses": {"200": {"description": "ok"}}}}
                }
            }),
        );
        let new = write_schema(
            dir.path(),
            "new.json",
            json!({
                "paths": {"/users": {"get": {"responses": {"200": {"description": "ok"}}}}}
            }),
        );
        let options = dir.path().join("options.json");
        std::fs::write(&options, r#"{"ignore_paths": ["^/internal/"]}"#).unwrap();
        let output = dir.path().join("report.json");

        let code = run_check(CheckConfig {
            old,
            new,
            format: ReportFormat::Json,
            output_file: Some(output),
            options_file: Some(options),
            timeout: None,
        })
        .unwrap();
        assert_eq!(code, exit_codes::PASS);
    }
}
