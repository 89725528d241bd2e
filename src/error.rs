//! Unified error types for oas-compat.
//!
//! Loading and reference-resolution failures are fatal and abort a run before
//! any report is produced. A FAIL verdict is *not* an error: detecting
//! incompatibility is the tool working as intended, and it is carried in a
//! complete [`crate::report::CompatibilityReport`] instead of being thrown.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for oas-compat operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CompatError {
    /// Errors while loading a schema document
    #[error("Failed to load schema: {context}")]
    Load {
        context: String,
        #[source]
        source: LoadErrorKind,
    },

    /// A `$ref` names a component that does not exist.
    ///
    /// Raised eagerly at the end of loading, never during diffing.
    #[error("Unresolved reference to component '{component}' at {location}")]
    Reference { component: String, location: String },

    /// Retrieval of a schema document exceeded its deadline.
    ///
    /// This is an infrastructure failure, distinct from a compatibility FAIL.
    #[error("Fetching '{source_name}' timed out after {timeout:?}")]
    FetchTimeout {
        source_name: String,
        timeout: Duration,
    },

    /// Errors during report generation
    #[error("Report generation failed: {context}")]
    Report {
        context: String,
        #[source]
        source: ReportErrorKind,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors (compare options, CLI flags)
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Specific load error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LoadErrorKind {
    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Missing required key: {key} in {context}")]
    MissingKey { key: String, context: String },

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Operation {operation} defines no responses")]
    NoResponses { operation: String },

    #[error("Malformed reference '{reference}': expected #/components/schemas/<name>")]
    MalformedRef { reference: String },
}

/// Specific report error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReportErrorKind {
    #[error("JSON serialization failed: {0}")]
    JsonSerializationError(String),

    #[error("Output format not supported for this operation: {0}")]
    UnsupportedFormat(String),
}

/// Convenient Result type for oas-compat operations
pub type Result<T> = std::result::Result<T, CompatError>;

impl CompatError {
    /// Create a load error with context
    pub fn load(context: impl Into<String>, source: LoadErrorKind) -> Self {
        Self::Load {
            context: context.into(),
            source,
        }
    }

    /// Create a load error for a missing key
    pub fn missing_key(key: impl Into<String>, context: impl Into<String>) -> Self {
        let key = key.into();
        let context = context.into();
        Self::Load {
            context: format!("missing '{key}' in {context}"),
            source: LoadErrorKind::MissingKey { key, context },
        }
    }

    /// Create a reference-resolution error
    pub fn unresolved(component: impl Into<String>, location: impl Into<String>) -> Self {
        Self::Reference {
            component: component.into(),
            location: location.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a report error
    pub fn report(context: impl Into<String>, source: ReportErrorKind) -> Self {
        Self::Report {
            context: context.into(),
            source,
        }
    }

    /// Whether this error is fatal infrastructure (fetch timeout) rather than
    /// malformed input.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::FetchTimeout { .. })
    }
}

impl From<std::io::Error> for CompatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for CompatError {
    fn from(err: serde_json::Error) -> Self {
        Self::load(
            "JSON deserialization",
            LoadErrorKind::InvalidJson(err.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_display() {
        let err = CompatError::missing_key("paths", "document root");
        let display = err.to_string();
        assert!(display.contains("paths"), "should name the key: {display}");
    }

    #[test]
    fn test_unresolved_reference_display() {
        let err = CompatError::unresolved("UserFilter", "paths./users.get.requestBody");
        let display = err.to_string();
        assert!(display.contains("UserFilter"));
        assert!(display.contains("requestBody"));
    }

    #[test]
    fn test_timeout_is_timeout() {
        let err = CompatError::FetchTimeout {
            source_name: "cloud".into(),
            timeout: Duration::from_secs(30),
        };
        assert!(err.is_timeout());
        assert!(!CompatError::config("x").is_timeout());
    }

    #[test]
    fn test_io_error_includes_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CompatError::io("/tmp/schema.json", io_err);
        assert!(err.to_string().contains("/tmp/schema.json"));
    }
}
