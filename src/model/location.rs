//! Location path expressions for changes.
//!
//! Every detected change carries a location identifying the exact operation,
//! parameter, or field it applies to, e.g. `GET /users/{}.responses.200` or
//! `components.User.address.city`. Locations serialize as plain strings and
//! order lexicographically, which gives reports a stable sort key.

use crate::model::{HttpMethod, OperationKey};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A structured path expression identifying a change site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub struct Location {
    segments: Vec<String>,
}

impl Location {
    /// Root location for an operation, using the normalized path.
    pub fn operation(method: HttpMethod, normalized_path: &str) -> Self {
        Self {
            segments: vec![format!("{method} {normalized_path}")],
        }
    }

    /// Root location for a component schema.
    pub fn component(name: &str) -> Self {
        Self {
            segments: vec!["components".to_string(), name.to_string()],
        }
    }

    /// Extend with a child segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Whether this location has any segments. Diff invariant: never empty.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First segment: the operation or `components` root.
    pub fn root(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or("")
    }
}

impl From<OperationKey> for Location {
    fn from(key: OperationKey) -> Self {
        Self {
            segments: vec![key.to_string()],
        }
    }
}

impl From<String> for Location {
    fn from(s: String) -> Self {
        Self {
            segments: s.split('.').map(str::to_string).collect(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.segments.cmp(&other.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_location() {
        let loc = Location::operation(HttpMethod::Get, "/users/{}");
        assert_eq!(loc.to_string(), "GET /users/{}");
        assert_eq!(loc.child("parameters").child("limit").to_string(), "GET /users/{}.parameters.limit");
    }

    #[test]
    fn test_component_location() {
        let loc = Location::component("User").child("email");
        assert_eq!(loc.to_string(), "components.User.email");
        assert_eq!(loc.root(), "components");
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let a = Location::component("Alpha");
        let b = Location::component("Beta");
        assert!(a < b);
    }

    #[test]
    fn test_serializes_as_string() {
        let loc = Location::component("User").child("email");
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, "\"components.User.email\"");
    }
}
