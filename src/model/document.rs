//! Normalized OpenAPI document model.
//!
//! Input documents are normalized into [`SchemaDocument`] regardless of the
//! exact OpenAPI flavor they came from. The model is immutable once loaded:
//! every later stage (index, diff, classify, report) only borrows it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fully loaded and validated schema document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// OpenAPI version string (e.g. "3.0.2")
    pub openapi: String,
    /// Document title from the info block, used as the source label in reports
    pub title: String,
    /// Operations keyed by (path, method), in document order
    pub operations: IndexMap<OperationKey, Operation>,
    /// Reusable component schemas by name, in document order
    pub components: IndexMap<String, TypeDefinition>,
    /// xxh3 hash of the raw document, for the identical-input fast path
    #[serde(default)]
    pub content_hash: u64,
}

impl SchemaDocument {
    /// Create an empty document with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            openapi: "3.0.0".to_string(),
            title: title.into(),
            operations: IndexMap::new(),
            components: IndexMap::new(),
            content_hash: 0,
        }
    }

    /// Number of operations in the document.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Number of component schemas in the document.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Look up a component definition by name.
    pub fn component(&self, name: &str) -> Option<&TypeDefinition> {
        self.components.get(name)
    }
}

/// Identity of an operation: raw path template plus HTTP method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationKey {
    pub path: String,
    pub method: HttpMethod,
}

impl OperationKey {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// HTTP methods recognized in path items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
            Self::Trace => "TRACE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "put" => Ok(Self::Put),
            "post" => Ok(Self::Post),
            "delete" => Ok(Self::Delete),
            "options" => Ok(Self::Options),
            "head" => Ok(Self::Head),
            "patch" => Ok(Self::Patch),
            "trace" => Ok(Self::Trace),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single API operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    /// operationId, when present
    pub operation_id: Option<String>,
    /// Tags attached to the operation (used by skip-tag compare options)
    pub tags: Vec<String>,
    /// Parameters in declaration order
    pub parameters: Vec<ParameterDef>,
    /// Request body, when the operation accepts one
    pub request_body: Option<BodyDef>,
    /// Responses keyed by status-code pattern ("200", "4XX", "default")
    pub responses: IndexMap<String, BodyDef>,
    /// Description metadata (informational only)
    pub description: Option<String>,
}

impl Operation {
    /// Find a parameter by name and location.
    pub fn parameter(&self, name: &str, location: ParamLocation) -> Option<&ParameterDef> {
        self.parameters
            .iter()
            .find(|p| p.name == name && p.location == location)
    }
}

/// A single operation parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub schema: TypeReference,
    pub description: Option<String>,
}

/// Where a parameter lives in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        };
        f.write_str(s)
    }
}

impl FromStr for ParamLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(Self::Path),
            "query" => Ok(Self::Query),
            "header" => Ok(Self::Header),
            "cookie" => Ok(Self::Cookie),
            other => Err(other.to_string()),
        }
    }
}

/// Request or response body: media type to schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyDef {
    /// Media type (e.g. "application/json") to schema reference.
    ///
    /// Empty for responses that carry no content.
    pub content: IndexMap<String, TypeReference>,
}

impl BodyDef {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// A pointer to a type: either a named component reference or an inline shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ref_kind", rename_all = "snake_case")]
pub enum TypeReference {
    /// `$ref` into the component map, by bare name
    Named { name: String },
    /// Inline primitive/array/object shape
    Inline(InlineType),
    /// anyOf/oneOf union of alternatives
    Union { variants: Vec<TypeReference> },
}

impl TypeReference {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named { name: name.into() }
    }

    pub fn inline(kind: TypeKind) -> Self {
        Self::Inline(InlineType::new(kind))
    }

    /// The component name, if this is a named reference.
    pub fn component_name(&self) -> Option<&str> {
        match self {
            Self::Named { name } => Some(name),
            _ => None,
        }
    }

    /// Short human-readable descriptor used in change before/after fields.
    pub fn describe(&self) -> String {
        match self {
            Self::Named { name } => format!("${name}"),
            Self::Inline(inline) => inline.describe(),
            Self::Union { variants } => {
                let parts: Vec<String> = variants.iter().map(TypeReference::describe).collect();
                format!("anyOf[{}]", parts.join(", "))
            }
        }
    }
}

/// An inline (non-referenced) type shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineType {
    pub kind: TypeKind,
    /// Format qualifier (e.g. "int32", "date-time")
    pub format: Option<String>,
    pub nullable: bool,
    /// Element type for arrays
    pub items: Option<Box<TypeReference>>,
    /// Field definitions for inline objects
    #[serde(default)]
    pub fields: IndexMap<String, FieldDef>,
    /// Allowed literal values when this inline type is an enum
    #[serde(default)]
    pub enum_values: Vec<serde_json::Value>,
}

impl InlineType {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            format: None,
            nullable: false,
            items: None,
            fields: IndexMap::new(),
            enum_values: Vec::new(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    fn describe(&self) -> String {
        let mut s = self.kind.as_str().to_string();
        if let Some(fmt) = &self.format {
            s.push_str(&format!("({fmt})"));
        }
        if let Some(items) = &self.items {
            s.push_str(&format!("[{}]", items.describe()));
        }
        if self.nullable {
            s.push_str("?");
        }
        s
    }
}

/// Primitive JSON schema kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }
}

impl FromStr for TypeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            "null" => Ok(Self::Null),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, possibly-recursive component definition.
///
/// Recursion is always by reference: a definition may name itself or another
/// definition, and cycles are legal. Traversal code must carry a visited set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "def_kind", rename_all = "snake_case")]
pub enum TypeDefinition {
    /// An object with named fields
    Object(ObjectDef),
    /// An enumeration of allowed literal values
    Enum(EnumDef),
    /// A oneOf/anyOf union of alternatives
    Union { variants: Vec<TypeReference> },
    /// A component that aliases a primitive or array shape
    Alias { target: TypeReference },
}

impl TypeDefinition {
    /// Short label for the definition kind, used in change descriptors.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Enum(_) => "enum",
            Self::Union { .. } => "union",
            Self::Alias { .. } => "alias",
        }
    }

    /// Every type reference reachable directly from this definition.
    pub fn direct_references(&self) -> Vec<&TypeReference> {
        match self {
            Self::Object(obj) => obj.fields.values().map(|f| &f.schema).collect(),
            Self::Enum(_) => Vec::new(),
            Self::Union { variants } => variants.iter().collect(),
            Self::Alias { target } => vec![target],
        }
    }
}

/// Object component: ordered fields plus metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDef {
    pub fields: IndexMap<String, FieldDef>,
    pub description: Option<String>,
}

/// A single object field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub schema: TypeReference,
    pub required: bool,
    /// Declared default value, when present
    pub default: Option<serde_json::Value>,
    pub deprecated: bool,
    pub description: Option<String>,
    /// Declared example value (informational only)
    pub example: Option<serde_json::Value>,
}

impl FieldDef {
    pub fn new(schema: TypeReference) -> Self {
        Self {
            schema,
            required: false,
            default: None,
            deprecated: false,
            description: None,
            example: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Enum component: ordered set of allowed literal values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnumDef {
    /// Underlying primitive kind, when declared
    pub kind: Option<TypeKind>,
    pub values: Vec<serde_json::Value>,
    pub description: Option<String>,
}
