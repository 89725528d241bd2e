//! JSON report rendering.

use super::CompatibilityReport;
use crate::error::{CompatError, ReportErrorKind, Result};
use std::io::Write;

/// Write the report as pretty-printed JSON with a trailing newline.
pub fn render<W: Write>(report: &CompatibilityReport, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report).map_err(|e| {
        CompatError::report(
            "JSON report",
            ReportErrorKind::JsonSerializationError(e.to_string()),
        )
    })?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::diff::{Change, ChangeDetail, ChangeKind};
    use crate::model::Location;
    use crate::report::ReportBuilder;

    #[test]
    fn test_json_shape() {
        let report = ReportBuilder::new("old.json", "new.json").build(vec![classify(
            Change::new(
                Location::component("User").child("email"),
                ChangeKind::Removed,
                ChangeDetail::Field {
                    required: true,
                    has_default: false,
                },
            )
            .with_before("string"),
        )]);

        let mut buffer = Vec::new();
        render(&report, &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(value["verdict"], "FAIL");
        assert_eq!(value["sources"]["old"], "old.json");
        assert_eq!(value["summary"]["breaking"], 1);
        assert_eq!(value["changes"][0]["location"], "components.User.email");
        assert_eq!(value["changes"][0]["kind"], "REMOVED");
        assert_eq!(value["changes"][0]["severity"], "BREAKING");
        assert_eq!(value["changes"][0]["rule"], "field-removed");
        assert_eq!(value["changes"][0]["before"], "string");
    }
}
