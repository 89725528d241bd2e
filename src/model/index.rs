//! Index structures for efficient schema comparison.
//!
//! Building a [`SchemaIndex`] once per document avoids repeated tree walks
//! during diffing: operations are addressable by (method, normalized path),
//! components by name, and each component carries a precomputed flattened
//! field-path enumeration (`User.address.city`) computed cycle-safely.

use super::{
    HttpMethod, Operation, OperationKey, SchemaDocument, TypeDefinition, TypeReference,
};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Maximum nesting depth for the flattened field-path enumeration.
///
/// Cyclic component graphs are cut off by the visited set; the depth bound
/// additionally caps pathological non-cyclic nesting.
const MAX_FLATTEN_DEPTH: usize = 8;

/// Precomputed index over one schema document.
///
/// Pure transformation: building an index cannot fail and never mutates the
/// document it borrows.
#[derive(Debug)]
#[must_use]
pub struct SchemaIndex<'a> {
    doc: &'a SchemaDocument,
    /// Operations keyed by (method, placeholder-normalized path)
    operations: IndexMap<OperationKey, &'a Operation>,
    /// Normalized key back to the document's raw key
    raw_keys: HashMap<OperationKey, &'a OperationKey>,
    /// Flattened field paths per component, in field order
    field_paths: HashMap<&'a str, Vec<String>>,
}

impl<'a> SchemaIndex<'a> {
    /// Build an index from a loaded document. O(n) in document size.
    pub fn build(doc: &'a SchemaDocument) -> Self {
        let mut operations = IndexMap::new();
        let mut raw_keys = HashMap::new();
        for (key, op) in &doc.operations {
            let normalized = OperationKey::new(key.method, normalize_path(&key.path));
            raw_keys.insert(normalized.clone(), key);
            operations.insert(normalized, op);
        }

        let mut field_paths = HashMap::new();
        for (name, def) in &doc.components {
            let mut paths = Vec::new();
            let mut visited = HashSet::new();
            visited.insert(name.as_str());
            flatten_definition(doc, def, name, &mut visited, 0, &mut paths);
            field_paths.insert(name.as_str(), paths);
        }

        Self {
            doc,
            operations,
            raw_keys,
            field_paths,
        }
    }

    /// The underlying document.
    pub fn document(&self) -> &'a SchemaDocument {
        self.doc
    }

    /// All operations keyed by normalized (method, path).
    pub fn operations(&self) -> &IndexMap<OperationKey, &'a Operation> {
        &self.operations
    }

    /// Look up an operation by method and normalized path.
    pub fn operation(&self, method: HttpMethod, normalized_path: &str) -> Option<&'a Operation> {
        self.operations
            .get(&OperationKey::new(method, normalized_path))
            .copied()
    }

    /// The raw (document) key behind a normalized key.
    pub fn raw_key(&self, normalized: &OperationKey) -> Option<&'a OperationKey> {
        self.raw_keys.get(normalized).copied()
    }

    /// Look up a component by name. O(1).
    pub fn component(&self, name: &str) -> Option<&'a TypeDefinition> {
        self.doc.components.get(name)
    }

    /// Precomputed flattened field paths for a component.
    pub fn field_paths(&self, component: &str) -> &[String] {
        self.field_paths
            .get(component)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }
}

/// Normalize a path template so that syntactically different but semantically
/// equivalent paths compare equal: every `{placeholder}` segment becomes `{}`.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn flatten_definition<'a>(
    doc: &'a SchemaDocument,
    def: &'a TypeDefinition,
    prefix: &str,
    visited: &mut HashSet<&'a str>,
    depth: usize,
    out: &mut Vec<String>,
) {
    if depth >= MAX_FLATTEN_DEPTH {
        return;
    }
    let TypeDefinition::Object(obj) = def else {
        return;
    };
    for (field_name, field) in &obj.fields {
        let path = format!("{prefix}.{field_name}");
        out.push(path.clone());
        flatten_reference(doc, &field.schema, &path, visited, depth + 1, out);
    }
}

fn flatten_reference<'a>(
    doc: &'a SchemaDocument,
    schema: &'a TypeReference,
    prefix: &str,
    visited: &mut HashSet<&'a str>,
    depth: usize,
    out: &mut Vec<String>,
) {
    if depth >= MAX_FLATTEN_DEPTH {
        return;
    }
    match schema {
        TypeReference::Named { name } => {
            // Revisiting a component along this path means a cycle; stop.
            if let Some(def) = doc.components.get(name) {
                if visited.insert(name.as_str()) {
                    flatten_definition(doc, def, prefix, visited, depth, out);
                    visited.remove(name.as_str());
                }
            }
        }
        TypeReference::Inline(inline) => {
            for (field_name, field) in &inline.fields {
                let path = format!("{prefix}.{field_name}");
                out.push(path.clone());
                flatten_reference(doc, &field.schema, &path, visited, depth + 1, out);
            }
            if let Some(items) = &inline.items {
                flatten_reference(doc, items, prefix, visited, depth + 1, out);
            }
        }
        TypeReference::Union { variants } => {
            for variant in variants {
                flatten_reference(doc, variant, prefix, visited, depth + 1, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, ObjectDef, TypeKind};
    use indexmap::IndexMap;

    fn doc_with_components(components: Vec<(&str, TypeDefinition)>) -> SchemaDocument {
        let mut doc = SchemaDocument::new("test");
        for (name, def) in components {
            doc.components.insert(name.to_string(), def);
        }
        doc
    }

    fn object(fields: Vec<(&str, TypeReference)>) -> TypeDefinition {
        let mut map = IndexMap::new();
        for (name, schema) in fields {
            map.insert(name.to_string(), FieldDef::new(schema));
        }
        TypeDefinition::Object(ObjectDef {
            fields: map,
            description: None,
        })
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/users/{id}"), "/users/{}");
        assert_eq!(normalize_path("/users/{user_id}/posts/{post_id}"), "/users/{}/posts/{}");
        assert_eq!(normalize_path("/health"), "/health");
    }

    #[test]
    fn test_operation_lookup_across_placeholder_names() {
        let mut doc = SchemaDocument::new("test");
        doc.operations.insert(
            OperationKey::new(HttpMethod::Get, "/users/{user_id}"),
            Operation::default(),
        );
        let index = SchemaIndex::build(&doc);

        assert!(index.operation(HttpMethod::Get, "/users/{}").is_some());
        assert!(index.operation(HttpMethod::Post, "/users/{}").is_none());
    }

    #[test]
    fn test_flattened_field_paths() {
        let doc = doc_with_components(vec![
            (
                "User",
                object(vec![
                    ("email", TypeReference::inline(TypeKind::String)),
                    ("address", TypeReference::named("Address")),
                ]),
            ),
            (
                "Address",
                object(vec![("city", TypeReference::inline(TypeKind::String))]),
            ),
        ]);
        let index = SchemaIndex::build(&doc);

        let paths = index.field_paths("User");
        assert!(paths.contains(&"User.email".to_string()));
        assert!(paths.contains(&"User.address".to_string()));
        assert!(paths.contains(&"User.address.city".to_string()));
    }

    #[test]
    fn test_cyclic_components_terminate() {
        // Node -> next: Node is a self-cycle; flattening must not recurse forever.
        let doc = doc_with_components(vec![(
            "Node",
            object(vec![
                ("value", TypeReference::inline(TypeKind::Integer)),
                ("next", TypeReference::named("Node")),
            ]),
        )]);
        let index = SchemaIndex::build(&doc);

        let paths = index.field_paths("Node");
        assert!(paths.contains(&"Node.value".to_string()));
        assert!(paths.contains(&"Node.next".to_string()));
        // Bounded: at most the direct fields, no infinite expansion.
        assert!(paths.len() < 100);
    }

    #[test]
    fn test_mutually_recursive_components_terminate() {
        let doc = doc_with_components(vec![
            ("A", object(vec![("b", TypeReference::named("B"))])),
            ("B", object(vec![("a", TypeReference::named("A"))])),
        ]);
        let index = SchemaIndex::build(&doc);

        assert!(!index.field_paths("A").is_empty());
        assert!(!index.field_paths("B").is_empty());
    }
}
