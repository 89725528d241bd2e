//! Compare options: policy knobs applied before and during diffing.
//!
//! Options cover the operational realities of comparing two deployments of
//! the same logical API: the candidate may nest paths under a tenancy prefix,
//! inject its own parameters, or intentionally lack experimental baseline
//! routes. All options default to off; with none set, the diff is a plain
//! structural comparison.

use crate::error::{CompatError, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options controlling which differences are considered at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Rewrite applied to baseline paths before probing the candidate
    pub path_rewrite: Option<PathRewrite>,
    /// Baseline paths matching any of these patterns are skipped entirely
    pub ignore_paths: Vec<String>,
    /// Operations carrying any of these tags are skipped
    pub skip_tags: Vec<String>,
    /// Parameter names excluded from comparison on both sides
    /// (e.g. tenancy parameters the candidate injects everywhere)
    pub ignore_parameters: Vec<String>,
    /// Component fields the baseline may carry that the candidate does not
    /// have yet, keyed by component name (forward-compatible additions)
    pub allowed_missing_fields: IndexMap<String, Vec<String>>,

    #[serde(skip)]
    compiled_ignores: Vec<Regex>,
}

/// Prefix rewrite mapping baseline paths into the candidate's namespace.
///
/// Example: `prefix = "/api"`, `replacement =
/// "/api/accounts/{account_id}/workspaces/{workspace_id}"` maps
/// `/api/flows/{id}` to the tenancy-nested candidate route. Paths listed in
/// `exempt` are probed unrewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRewrite {
    pub prefix: String,
    pub replacement: String,
    #[serde(default)]
    pub exempt: Vec<String>,
}

impl PathRewrite {
    /// Apply the rewrite to one path. Paths outside the prefix pass through.
    pub fn apply(&self, path: &str) -> String {
        if self.exempt.iter().any(|e| e == path) {
            return path.to_string();
        }
        match path.strip_prefix(&self.prefix) {
            Some(rest) => format!("{}{rest}", self.replacement),
            None => path.to_string(),
        }
    }
}

impl CompareOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file and compile the ignore patterns.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CompatError::io(path, e))?;
        let mut options: Self = serde_json::from_str(&content)
            .map_err(|e| CompatError::config(format!("invalid compare options: {e}")))?;
        options.compile()?;
        Ok(options)
    }

    /// Compile ignore patterns. Must be called after deserialization and
    /// before use; [`CompareOptions::from_file`] does this automatically.
    pub fn compile(&mut self) -> Result<()> {
        self.compiled_ignores = self
            .ignore_paths
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    CompatError::config(format!("invalid ignore pattern '{pattern}': {e}"))
                })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    /// Whether a raw path is excluded from comparison.
    pub fn is_path_ignored(&self, path: &str) -> bool {
        self.compiled_ignores.iter().any(|re| re.is_match(path))
    }

    /// Whether an operation's tags exclude it from comparison.
    pub fn is_tag_skipped(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.skip_tags.contains(tag))
    }

    /// Whether a parameter name is excluded from comparison.
    pub fn is_parameter_ignored(&self, name: &str) -> bool {
        self.ignore_parameters.iter().any(|p| p == name)
    }

    /// Whether a baseline-only field on a component is a known
    /// forward-compatible addition the candidate is allowed to lack.
    pub fn is_missing_field_allowed(&self, component: &str, field: &str) -> bool {
        self.allowed_missing_fields
            .get(component)
            .is_some_and(|fields| fields.iter().any(|f| f == field))
    }

    /// Map a baseline path into the candidate's namespace.
    pub fn rewrite_path(&self, path: &str) -> String {
        match &self.path_rewrite {
            Some(rewrite) => rewrite.apply(path),
            None => path.to_string(),
        }
    }

    /// Builder-style helpers, mainly for tests and embedding.
    pub fn with_ignored_paths(mut self, patterns: Vec<String>) -> Result<Self> {
        self.ignore_paths = patterns;
        self.compile()?;
        Ok(self)
    }

    pub fn with_skip_tags(mut self, tags: Vec<String>) -> Self {
        self.skip_tags = tags;
        self
    }

    pub fn with_ignored_parameters(mut self, names: Vec<String>) -> Self {
        self.ignore_parameters = names;
        self
    }

    pub fn with_path_rewrite(mut self, rewrite: PathRewrite) -> Self {
        self.path_rewrite = Some(rewrite);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_pass_everything_through() {
        let options = CompareOptions::new();
        assert!(!options.is_path_ignored("/api/flows"));
        assert!(!options.is_tag_skipped(&["Admin".to_string()]));
        assert_eq!(options.rewrite_path("/api/flows"), "/api/flows");
    }

    #[test]
    fn test_path_rewrite() {
        let rewrite = PathRewrite {
            prefix: "/api".to_string(),
            replacement: "/api/accounts/{account_id}/workspaces/{workspace_id}".to_string(),
            exempt: vec!["/api/collections/views/{view}".to_string()],
        };
        assert_eq!(
            rewrite.apply("/api/flows/{id}"),
            "/api/accounts/{account_id}/workspaces/{workspace_id}/flows/{id}"
        );
        assert_eq!(
            rewrite.apply("/api/collections/views/{view}"),
            "/api/collections/views/{view}"
        );
        assert_eq!(rewrite.apply("/health"), "/health");
    }

    #[test]
    fn test_ignore_patterns() {
        let options = CompareOptions::new()
            .with_ignored_paths(vec![
                r"^/api/csrf-token$".to_string(),
                r".*experimental.*".to_string(),
            ])
            .unwrap();
        assert!(options.is_path_ignored("/api/csrf-token"));
        assert!(options.is_path_ignored("/api/experimental/things"));
        assert!(!options.is_path_ignored("/api/flows"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = CompareOptions::new().with_ignored_paths(vec!["[".to_string()]);
        assert!(matches!(result, Err(CompatError::Config(_))));
    }

    #[test]
    fn test_allowed_missing_fields() {
        let mut options = CompareOptions::new();
        options.allowed_missing_fields.insert(
            "DeploymentCreate".to_string(),
            vec!["job_variables".to_string()],
        );
        assert!(options.is_missing_field_allowed("DeploymentCreate", "job_variables"));
        assert!(!options.is_missing_field_allowed("DeploymentCreate", "name"));
        assert!(!options.is_missing_field_allowed("FlowCreate", "job_variables"));
    }

    #[test]
    fn test_options_deserialize_and_compile() {
        let json = r#"{
            "ignore_paths": ["^/internal/.*"],
            "ignore_parameters": ["account_id", "workspace_id"],
            "skip_tags": ["Admin"]
        }"#;
        let mut options: CompareOptions = serde_json::from_str(json).unwrap();
        options.compile().unwrap();
        assert!(options.is_path_ignored("/internal/metrics"));
        assert!(options.is_parameter_ignored("account_id"));
        assert!(options.is_tag_skipped(&["Admin".to_string()]));
    }
}
