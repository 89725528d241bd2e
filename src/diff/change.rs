//! Raw change structures produced by the diff engine.
//!
//! A [`Change`] records *what* differs and *where*, with before/after
//! descriptors. It carries no severity: judging whether a change breaks
//! clients is the classifier's job, keeping detection separate from policy.

use crate::model::Location;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Kind of difference detected at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One detected difference between the two documents.
#[derive(Debug, Clone, Serialize)]
pub struct Change {
    /// Exact operation/parameter/field the change applies to. Never empty.
    pub location: Location,
    pub kind: ChangeKind,
    /// Structured detail the classifier's rule table matches on
    #[serde(skip)]
    pub detail: ChangeDetail,
    /// Descriptor of the old value, when one existed
    pub before: Option<String>,
    /// Descriptor of the new value, when one exists
    pub after: Option<String>,
}

impl Change {
    pub fn new(location: Location, kind: ChangeKind, detail: ChangeDetail) -> Self {
        debug_assert!(!location.is_empty(), "change location must not be empty");
        Self {
            location,
            kind,
            detail,
            before: None,
            after: None,
        }
    }

    pub fn with_before(mut self, before: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self
    }

    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    /// Rule category this change belongs to, for harness attribution.
    pub fn category(&self) -> ChangeCategory {
        match &self.detail {
            ChangeDetail::Operation => ChangeCategory::Operations,
            ChangeDetail::Parameter { .. }
            | ChangeDetail::ParameterRequired { .. }
            | ChangeDetail::ParameterType { .. } => ChangeCategory::Parameters,
            ChangeDetail::RequestMediaType | ChangeDetail::RequestSchema { .. } => {
                ChangeCategory::RequestBodies
            }
            ChangeDetail::ResponseStatus
            | ChangeDetail::ResponseMediaType
            | ChangeDetail::ResponseSchema { .. } => ChangeCategory::Responses,
            ChangeDetail::Component { .. }
            | ChangeDetail::Field { .. }
            | ChangeDetail::FieldRequired { .. }
            | ChangeDetail::FieldType { .. }
            | ChangeDetail::FieldDefault { .. } => ChangeCategory::ComponentFields,
            ChangeDetail::EnumValue => ChangeCategory::Enums,
            ChangeDetail::Deprecation | ChangeDetail::Metadata => ChangeCategory::Metadata,
        }
    }
}

/// Structured description of what changed, consumed by the rule table.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeDetail {
    /// An entire operation (for ADDED/REMOVED kinds)
    Operation,
    /// A parameter appeared or disappeared
    Parameter { required: bool },
    /// A parameter's required flag flipped
    ParameterRequired { old: bool, new: bool },
    /// A parameter's type changed
    ParameterType { old: TypeShape, new: TypeShape },
    /// A request body media type appeared or disappeared
    RequestMediaType,
    /// A request body schema reference changed to a non-equivalent type
    RequestSchema,
    /// A response status pattern appeared or disappeared
    ResponseStatus,
    /// A response media type appeared or disappeared
    ResponseMediaType,
    /// A response body schema reference changed to a non-equivalent type
    ResponseSchema,
    /// A whole component schema (added, removed, or definition kind changed)
    Component,
    /// An object field appeared or disappeared
    Field { required: bool, has_default: bool },
    /// A field's required flag flipped
    FieldRequired { old: bool, new: bool },
    /// A field's type changed
    FieldType { old: TypeShape, new: TypeShape },
    /// A field's declared default changed
    FieldDefault { required: bool },
    /// A field's deprecated marker flipped
    Deprecation,
    /// An enum literal appeared or disappeared
    EnumValue,
    /// Description/example-only drift
    Metadata,
}

/// Harness-level change categories: one assertable unit per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCategory {
    Operations,
    Parameters,
    RequestBodies,
    Responses,
    ComponentFields,
    Enums,
    Metadata,
}

impl ChangeCategory {
    pub const ALL: [ChangeCategory; 7] = [
        Self::Operations,
        Self::Parameters,
        Self::RequestBodies,
        Self::Responses,
        Self::ComponentFields,
        Self::Enums,
        Self::Metadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operations => "operations",
            Self::Parameters => "parameters",
            Self::RequestBodies => "request_bodies",
            Self::Responses => "responses",
            Self::ComponentFields => "component_fields",
            Self::Enums => "enums",
            Self::Metadata => "metadata",
        }
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flattened view of a type for widening/narrowing decisions.
///
/// Unions are collapsed into a set of primitive type names, so
/// `anyOf[string, null]` and a nullable string compare alike. Named object
/// and enum references appear as `$Name` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeShape {
    pub types: BTreeSet<String>,
    pub format: Option<String>,
    pub nullable: bool,
}

impl TypeShape {
    /// Whether `self` can be replaced by `new` without rejecting any value a
    /// client of `self` may produce: the type set may only grow, a format
    /// constraint may only relax, nullability may only be added.
    pub fn widens_to(&self, new: &TypeShape) -> bool {
        let types_covered = self.types.iter().all(|t| {
            new.types.contains(t)
                // integer is a semantic subtype of number
                || (t == "integer" && new.types.contains("number"))
        });
        types_covered && format_widens(self.format.as_deref(), new.format.as_deref())
            && (!self.nullable || new.nullable)
    }

    pub fn describe(&self) -> String {
        let mut parts: Vec<&str> = self.types.iter().map(String::as_str).collect();
        if parts.is_empty() {
            parts.push("any");
        }
        let mut s = parts.join("|");
        if let Some(format) = &self.format {
            s.push_str(&format!("({format})"));
        }
        if self.nullable {
            s.push('?');
        }
        s
    }
}

/// Whether a format constraint change only relaxes the old constraint.
fn format_widens(old: Option<&str>, new: Option<&str>) -> bool {
    match (old, new) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(a), Some(b)) if a == b => true,
        (Some("int32"), Some("int64")) => true,
        (Some("float"), Some("double")) => true,
        _ => false,
    }
}
