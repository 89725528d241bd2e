//! Schema loader: raw JSON trees into validated [`SchemaDocument`]s.
//!
//! The loader owns all structural validation. References are resolved eagerly:
//! a `$ref` naming a component absent from the component map is a load-time
//! [`CompatError::Reference`], never a diff-time surprise. Cyclic *structural*
//! recursion among valid names is legal and left for traversal code to handle.

use crate::error::{CompatError, LoadErrorKind, Result};
use crate::model::{
    BodyDef, EnumDef, FieldDef, HttpMethod, InlineType, ObjectDef, Operation, OperationKey,
    ParamLocation, ParameterDef, SchemaDocument, TypeDefinition, TypeKind, TypeReference,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::str::FromStr;
use xxhash_rust::xxh3::xxh3_64;

const REF_PREFIX: &str = "#/components/schemas/";

/// Load a schema document from an already-decoded JSON tree.
///
/// `name` labels the document in errors and in the final report (falls back
/// to `info.title` when present).
pub fn load_document(name: &str, raw: &Value) -> Result<SchemaDocument> {
    let root = raw
        .as_object()
        .ok_or_else(|| invalid("document root", "expected a JSON object"))?;

    let openapi = root
        .get("openapi")
        .and_then(Value::as_str)
        .unwrap_or("3.0.0")
        .to_string();

    let title = root
        .get("info")
        .and_then(|info| info.get("title"))
        .and_then(Value::as_str)
        .unwrap_or(name)
        .to_string();

    let paths = root
        .get("paths")
        .ok_or_else(|| CompatError::missing_key("paths", "document root"))?
        .as_object()
        .ok_or_else(|| invalid("paths", "expected an object"))?;

    let mut doc = SchemaDocument::new(title);
    doc.openapi = openapi;
    doc.content_hash = xxh3_64(raw.to_string().as_bytes());

    for (path, item) in paths {
        let item = item
            .as_object()
            .ok_or_else(|| invalid(path, "path item must be an object"))?;

        // Path-level parameters apply to every operation under the path.
        let shared_params = match item.get("parameters") {
            Some(params) => parse_parameters(params, path)?,
            None => Vec::new(),
        };

        for (key, value) in item {
            if key == "parameters"
                || key == "servers"
                || key == "summary"
                || key == "description"
                || key.starts_with("x-")
            {
                continue;
            }
            let method = HttpMethod::from_str(key).map_err(|m| {
                CompatError::load(
                    format!("in path {path}"),
                    LoadErrorKind::UnsupportedMethod(m),
                )
            })?;
            let op_key = OperationKey::new(method, path.clone());
            let operation = parse_operation(value, &op_key, &shared_params)?;
            doc.operations.insert(op_key, operation);
        }
    }

    if let Some(schemas) = root
        .get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_object)
    {
        for (comp_name, schema) in schemas {
            let def = parse_definition(schema, comp_name)?;
            doc.components.insert(comp_name.clone(), def);
        }
    }

    tracing::debug!(
        document = name,
        operations = doc.operations.len(),
        components = doc.components.len(),
        "loaded schema document"
    );

    resolve_references(&doc)?;
    Ok(doc)
}

/// Load a schema document from a JSON string.
pub fn load_document_str(name: &str, content: &str) -> Result<SchemaDocument> {
    let raw: Value = serde_json::from_str(content)?;
    load_document(name, &raw)
}

fn parse_operation(
    value: &Value,
    key: &OperationKey,
    shared_params: &[ParameterDef],
) -> Result<Operation> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(&key.to_string(), "operation must be an object"))?;

    let mut op = Operation {
        operation_id: obj
            .get("operationId")
            .and_then(Value::as_str)
            .map(str::to_string),
        tags: obj
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        parameters: shared_params.to_vec(),
        request_body: None,
        responses: IndexMap::new(),
        description: obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    if let Some(params) = obj.get("parameters") {
        let own = parse_parameters(params, &key.to_string())?;
        // Operation-level parameters override path-level ones of the same identity.
        for param in own {
            op.parameters
                .retain(|p| !(p.name == param.name && p.location == param.location));
            op.parameters.push(param);
        }
    }

    if let Some(body) = obj.get("requestBody") {
        op.request_body = Some(parse_body(body, &format!("{key}.requestBody"))?);
    }

    let responses = obj
        .get("responses")
        .and_then(Value::as_object)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            CompatError::load(
                format!("in {key}"),
                LoadErrorKind::NoResponses {
                    operation: key.to_string(),
                },
            )
        })?;
    for (status, response) in responses {
        let body = parse_body(response, &format!("{key}.responses.{status}"))?;
        op.responses.insert(status.clone(), body);
    }

    Ok(op)
}

fn parse_parameters(value: &Value, context: &str) -> Result<Vec<ParameterDef>> {
    let list = value
        .as_array()
        .ok_or_else(|| invalid(context, "parameters must be an array"))?;

    let mut params = Vec::with_capacity(list.len());
    for entry in list {
        let obj = entry
            .as_object()
            .ok_or_else(|| invalid(context, "parameter must be an object"))?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CompatError::missing_key("name", format!("parameter in {context}")))?;
        let location_str = obj
            .get("in")
            .and_then(Value::as_str)
            .ok_or_else(|| CompatError::missing_key("in", format!("parameter {name}")))?;
        let location = ParamLocation::from_str(location_str).map_err(|loc| {
            CompatError::load(
                format!("parameter {name}"),
                LoadErrorKind::InvalidValue {
                    key: "in".to_string(),
                    message: format!("unknown location '{loc}'"),
                },
            )
        })?;
        let schema = match obj.get("schema") {
            Some(schema) => parse_reference(schema, &format!("{context}.{name}"))?,
            None => TypeReference::inline(TypeKind::String),
        };

        params.push(ParameterDef {
            name: name.to_string(),
            location,
            // Path parameters are always required in OpenAPI.
            required: obj.get("required").and_then(Value::as_bool).unwrap_or(false)
                || location == ParamLocation::Path,
            schema,
            description: obj
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }
    Ok(params)
}

fn parse_body(value: &Value, context: &str) -> Result<BodyDef> {
    let mut body = BodyDef::default();
    let Some(content) = value.get("content").and_then(Value::as_object) else {
        return Ok(body);
    };
    for (media_type, media) in content {
        let schema = match media.get("schema") {
            Some(schema) => parse_reference(schema, &format!("{context}.{media_type}"))?,
            None => TypeReference::inline(TypeKind::Object),
        };
        body.content.insert(media_type.clone(), schema);
    }
    Ok(body)
}

/// Parse a schema node into a [`TypeReference`].
fn parse_reference(value: &Value, context: &str) -> Result<TypeReference> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(context, "schema must be an object"))?;

    if let Some(reference) = obj.get("$ref") {
        let reference = reference
            .as_str()
            .ok_or_else(|| invalid(context, "$ref must be a string"))?;
        let name = reference.strip_prefix(REF_PREFIX).ok_or_else(|| {
            CompatError::load(
                format!("in {context}"),
                LoadErrorKind::MalformedRef {
                    reference: reference.to_string(),
                },
            )
        })?;
        return Ok(TypeReference::named(name));
    }

    if let Some(variants) = obj.get("anyOf").or_else(|| obj.get("oneOf")) {
        let list = variants
            .as_array()
            .ok_or_else(|| invalid(context, "anyOf/oneOf must be an array"))?;
        let mut parsed = Vec::with_capacity(list.len());
        for (i, variant) in list.iter().enumerate() {
            parsed.push(parse_reference(variant, &format!("{context}.anyOf[{i}]"))?);
        }
        return Ok(TypeReference::Union { variants: parsed });
    }

    let kind = match obj.get("type").and_then(Value::as_str) {
        Some(kind_str) => TypeKind::from_str(kind_str).map_err(|k| {
            CompatError::load(
                format!("in {context}"),
                LoadErrorKind::InvalidValue {
                    key: "type".to_string(),
                    message: format!("unknown type '{k}'"),
                },
            )
        })?,
        // Untyped schema: treat as an unconstrained object.
        None => TypeKind::Object,
    };

    let mut inline = InlineType::new(kind);
    inline.format = obj.get("format").and_then(Value::as_str).map(str::to_string);
    inline.nullable = obj.get("nullable").and_then(Value::as_bool).unwrap_or(false);

    if let Some(values) = obj.get("enum").and_then(Value::as_array) {
        inline.enum_values = values.clone();
    }

    if kind == TypeKind::Array {
        if let Some(items) = obj.get("items") {
            inline.items = Some(Box::new(parse_reference(items, &format!("{context}.items"))?));
        }
    }

    if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        let required = required_set(obj);
        for (field_name, field_schema) in props {
            let field = parse_field(field_schema, &required, field_name, context)?;
            inline.fields.insert(field_name.clone(), field);
        }
    }

    Ok(TypeReference::Inline(inline))
}

fn parse_field(
    field_schema: &Value,
    required: &[&str],
    field_name: &str,
    context: &str,
) -> Result<FieldDef> {
    let schema = parse_reference(field_schema, &format!("{context}.{field_name}"))?;
    let mut field = FieldDef::new(schema);
    field.required = required.contains(&field_name);
    field.default = field_schema.get("default").cloned();
    field.deprecated = field_schema
        .get("deprecated")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    field.description = field_schema
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    field.example = field_schema.get("example").cloned();
    Ok(field)
}

/// Parse a component schema node into a [`TypeDefinition`].
fn parse_definition(value: &Value, name: &str) -> Result<TypeDefinition> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(name, "component schema must be an object"))?;

    if let Some(values) = obj.get("enum").and_then(Value::as_array) {
        let kind = match obj.get("type").and_then(Value::as_str) {
            Some(kind_str) => Some(TypeKind::from_str(kind_str).map_err(|k| {
                CompatError::load(
                    format!("in component {name}"),
                    LoadErrorKind::InvalidValue {
                        key: "type".to_string(),
                        message: format!("unknown type '{k}'"),
                    },
                )
            })?),
            None => None,
        };
        return Ok(TypeDefinition::Enum(EnumDef {
            kind,
            values: values.clone(),
            description: obj
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        }));
    }

    if let Some(variants) = obj.get("anyOf").or_else(|| obj.get("oneOf")) {
        let list = variants
            .as_array()
            .ok_or_else(|| invalid(name, "anyOf/oneOf must be an array"))?;
        let mut parsed = Vec::with_capacity(list.len());
        for (i, variant) in list.iter().enumerate() {
            parsed.push(parse_reference(variant, &format!("{name}.anyOf[{i}]"))?);
        }
        return Ok(TypeDefinition::Union { variants: parsed });
    }

    let is_object = obj.get("properties").is_some()
        || obj.get("type").and_then(Value::as_str) == Some("object");
    if is_object {
        let mut def = ObjectDef {
            fields: IndexMap::new(),
            description: obj
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        let required = required_set(obj);
        if let Some(props) = obj.get("properties").and_then(Value::as_object) {
            for (field_name, field_schema) in props {
                let field = parse_field(field_schema, &required, field_name, name)?;
                def.fields.insert(field_name.clone(), field);
            }
        }
        return Ok(TypeDefinition::Object(def));
    }

    // Primitive or array alias component.
    let target = parse_reference(value, name)?;
    Ok(TypeDefinition::Alias { target })
}

fn required_set(obj: &serde_json::Map<String, Value>) -> Vec<&str> {
    obj.get("required")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Validate that every named reference in the document resolves.
///
/// Runs at load end, after the full component map is available, so forward
/// references and cycles among defined names are fine.
fn resolve_references(doc: &SchemaDocument) -> Result<()> {
    for (key, op) in &doc.operations {
        for param in &op.parameters {
            check_reference(doc, &param.schema, &format!("{key}.parameters.{}", param.name))?;
        }
        if let Some(body) = &op.request_body {
            for (media, schema) in &body.content {
                check_reference(doc, schema, &format!("{key}.requestBody.{media}"))?;
            }
        }
        for (status, body) in &op.responses {
            for (media, schema) in &body.content {
                check_reference(doc, schema, &format!("{key}.responses.{status}.{media}"))?;
            }
        }
    }
    for (name, def) in &doc.components {
        for reference in def.direct_references() {
            check_reference(doc, reference, &format!("components.{name}"))?;
        }
        if let TypeDefinition::Object(obj) = def {
            for (field_name, field) in &obj.fields {
                check_nested(doc, &field.schema, &format!("components.{name}.{field_name}"))?;
            }
        }
    }
    Ok(())
}

fn check_reference(doc: &SchemaDocument, schema: &TypeReference, location: &str) -> Result<()> {
    check_nested(doc, schema, location)
}

fn check_nested(doc: &SchemaDocument, schema: &TypeReference, location: &str) -> Result<()> {
    match schema {
        TypeReference::Named { name } => {
            if !doc.components.contains_key(name) {
                return Err(CompatError::unresolved(name, location));
            }
        }
        TypeReference::Inline(inline) => {
            if let Some(items) = &inline.items {
                check_nested(doc, items, location)?;
            }
            for (field_name, field) in &inline.fields {
                check_nested(doc, &field.schema, &format!("{location}.{field_name}"))?;
            }
        }
        TypeReference::Union { variants } => {
            for variant in variants {
                check_nested(doc, variant, location)?;
            }
        }
    }
    Ok(())
}

fn invalid(context: &str, message: &str) -> CompatError {
    CompatError::load(
        format!("in {context}"),
        LoadErrorKind::InvalidValue {
            key: context.to_string(),
            message: message.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_doc() -> Value {
        json!({
            "openapi": "3.0.2",
            "info": {"title": "Test API", "version": "1.0"},
            "paths": {
                "/users/{id}": {
                    "get": {
                        "operationId": "read_user",
                        "tags": ["Users"],
                        "parameters": [
                            {"name": "id", "in": "path", "required": true,
                             "schema": {"type": "string", "format": "uuid"}}
                        ],
                        "responses": {
                            "200": {
                                "description": "ok",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/User"}
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "required": ["email"],
                        "properties": {
                            "email": {"type": "string"},
                            "age": {"type": "integer", "format": "int32"}
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_load_minimal_document() {
        let doc = load_document("oss", &minimal_doc()).unwrap();
        assert_eq!(doc.title, "Test API");
        assert_eq!(doc.operation_count(), 1);
        assert_eq!(doc.component_count(), 1);

        let key = OperationKey::new(HttpMethod::Get, "/users/{id}");
        let op = &doc.operations[&key];
        assert_eq!(op.operation_id.as_deref(), Some("read_user"));
        assert_eq!(op.parameters.len(), 1);
        assert!(op.parameters[0].required);
        assert!(op.responses.contains_key("200"));
    }

    #[test]
    fn test_required_flags_applied() {
        let doc = load_document("oss", &minimal_doc()).unwrap();
        let TypeDefinition::Object(user) = &doc.components["User"] else {
            panic!("User should be an object");
        };
        assert!(user.fields["email"].required);
        assert!(!user.fields["age"].required);
    }

    #[test]
    fn test_missing_paths_is_load_error() {
        let result = load_document("bad", &json!({"openapi": "3.0.0"}));
        assert!(matches!(result, Err(CompatError::Load { .. })));
    }

    #[test]
    fn test_operation_without_responses_is_load_error() {
        let raw = json!({
            "paths": {"/x": {"get": {"responses": {}}}}
        });
        let result = load_document("bad", &raw);
        assert!(matches!(result, Err(CompatError::Load { .. })));
    }

    #[test]
    fn test_unresolved_reference_is_fatal() {
        let raw = json!({
            "paths": {
                "/x": {
                    "get": {
                        "responses": {
                            "200": {
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Ghost"}
                                    }
                                }
                            }
                        }
                    }
                }
            }
        });
        let result = load_document("bad", &raw);
        assert!(matches!(result, Err(CompatError::Reference { component, .. }) if component == "Ghost"));
    }

    #[test]
    fn test_malformed_ref_is_load_error() {
        let raw = json!({
            "paths": {
                "/x": {
                    "get": {
                        "responses": {
                            "200": {
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/definitions/Old"}
                                    }
                                }
                            }
                        }
                    }
                }
            }
        });
        assert!(load_document("bad", &raw).is_err());
    }

    #[test]
    fn test_cyclic_components_load() {
        let raw = json!({
            "paths": {"/n": {"get": {"responses": {"200": {"description": "ok"}}}}},
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "next": {"$ref": "#/components/schemas/Node"}
                        }
                    }
                }
            }
        });
        let doc = load_document("cyclic", &raw).unwrap();
        assert_eq!(doc.component_count(), 1);
    }

    #[test]
    fn test_anyof_parsed_as_union() {
        let raw = json!({
            "paths": {
                "/x": {
                    "get": {
                        "parameters": [
                            {"name": "q", "in": "query",
                             "schema": {"anyOf": [{"type": "string"}, {"type": "null"}]}}
                        ],
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            }
        });
        let doc = load_document("u", &raw).unwrap();
        let key = OperationKey::new(HttpMethod::Get, "/x");
        let param = &doc.operations[&key].parameters[0];
        assert!(matches!(param.schema, TypeReference::Union { ref variants } if variants.len() == 2));
    }

    #[test]
    fn test_path_level_parameters_inherited() {
        let raw = json!({
            "paths": {
                "/items/{id}": {
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}
                    ],
                    "get": {"responses": {"200": {"description": "ok"}}},
                    "delete": {"responses": {"204": {"description": "gone"}}}
                }
            }
        });
        let doc = load_document("p", &raw).unwrap();
        for op in doc.operations.values() {
            assert_eq!(op.parameters.len(), 1);
            assert_eq!(op.parameters[0].name, "id");
        }
    }

    #[test]
    fn test_content_hash_stable() {
        let a = load_document("a", &minimal_doc()).unwrap();
        let b = load_document("b", &minimal_doc()).unwrap();
        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.content_hash, 0);
    }
}
