//! Deep type equivalence across two documents.
//!
//! Comparison recurses through component references with a visited set keyed
//! by the (old name, new name) pair. A pair seen twice along one comparison
//! path is treated as equivalent without re-expansion; this guarantees
//! termination on cyclic component graphs at the cost of not distinguishing
//! infinitely-differing cyclic structures, a documented approximation.

use crate::diff::TypeShape;
use crate::model::{
    EnumDef, InlineType, ObjectDef, SchemaDocument, TypeDefinition, TypeReference,
};
use std::collections::HashSet;

/// Pairwise structural comparator over two documents' type graphs.
pub struct TypeComparator<'a> {
    old_doc: &'a SchemaDocument,
    new_doc: &'a SchemaDocument,
    visited: HashSet<(String, String)>,
}

impl<'a> TypeComparator<'a> {
    pub fn new(old_doc: &'a SchemaDocument, new_doc: &'a SchemaDocument) -> Self {
        Self {
            old_doc,
            new_doc,
            visited: HashSet::new(),
        }
    }

    pub fn old_document(&self) -> &'a SchemaDocument {
        self.old_doc
    }

    pub fn new_document(&self) -> &'a SchemaDocument {
        self.new_doc
    }

    /// Whether two references describe equivalent types.
    pub fn equivalent(&mut self, old: &TypeReference, new: &TypeReference) -> bool {
        match (old, new) {
            (TypeReference::Named { name: old_name }, TypeReference::Named { name: new_name }) => {
                let pair = (old_name.clone(), new_name.clone());
                if self.visited.contains(&pair) {
                    // Cycle along this comparison path: assume equivalent.
                    return true;
                }
                self.visited.insert(pair.clone());
                let result = match (
                    self.old_doc.component(old_name),
                    self.new_doc.component(new_name),
                ) {
                    (Some(old_def), Some(new_def)) => self.definitions_equivalent(old_def, new_def),
                    // Loader guarantees resolution; missing here means the
                    // reference points into the *other* document's namespace.
                    _ => false,
                };
                self.visited.remove(&pair);
                result
            }
            (TypeReference::Named { name }, _) => match self.old_doc.component(name) {
                Some(TypeDefinition::Alias { target }) => {
                    let target = target.clone();
                    self.equivalent(&target, new)
                }
                _ => false,
            },
            (_, TypeReference::Named { name }) => match self.new_doc.component(name) {
                Some(TypeDefinition::Alias { target }) => {
                    let target = target.clone();
                    self.equivalent(old, &target)
                }
                _ => false,
            },
            (TypeReference::Inline(old_inline), TypeReference::Inline(new_inline)) => {
                self.inline_equivalent(old_inline, new_inline)
            }
            (
                TypeReference::Union { variants: old_vars },
                TypeReference::Union { variants: new_vars },
            ) => self.unions_equivalent(old_vars, new_vars),
            _ => false,
        }
    }

    fn definitions_equivalent(&mut self, old: &TypeDefinition, new: &TypeDefinition) -> bool {
        match (old, new) {
            (TypeDefinition::Object(old_obj), TypeDefinition::Object(new_obj)) => {
                self.objects_equivalent(old_obj, new_obj)
            }
            (TypeDefinition::Enum(old_enum), TypeDefinition::Enum(new_enum)) => {
                enums_equivalent(old_enum, new_enum)
            }
            (
                TypeDefinition::Union { variants: old_vars },
                TypeDefinition::Union { variants: new_vars },
            ) => self.unions_equivalent(old_vars, new_vars),
            (TypeDefinition::Alias { target: old_t }, TypeDefinition::Alias { target: new_t }) => {
                let (old_t, new_t) = (old_t.clone(), new_t.clone());
                self.equivalent(&old_t, &new_t)
            }
            _ => false,
        }
    }

    fn objects_equivalent(&mut self, old: &ObjectDef, new: &ObjectDef) -> bool {
        if old.fields.len() != new.fields.len() {
            return false;
        }
        old.fields.iter().all(|(name, old_field)| {
            new.fields.get(name).is_some_and(|new_field| {
                old_field.required == new_field.required
                    && self.equivalent(&old_field.schema, &new_field.schema)
            })
        })
    }

    fn inline_equivalent(&mut self, old: &InlineType, new: &InlineType) -> bool {
        if old.kind != new.kind || old.format != new.format || old.nullable != new.nullable {
            return false;
        }
        if old.enum_values != new.enum_values {
            return false;
        }
        match (&old.items, &new.items) {
            (Some(old_items), Some(new_items)) => {
                if !self.equivalent(old_items, new_items) {
                    return false;
                }
            }
            (None, None) => {}
            _ => return false,
        }
        if old.fields.len() != new.fields.len() {
            return false;
        }
        old.fields.iter().all(|(name, old_field)| {
            new.fields.get(name).is_some_and(|new_field| {
                old_field.required == new_field.required
                    && self.equivalent(&old_field.schema, &new_field.schema)
            })
        })
    }

    /// Order-insensitive union comparison: every old variant must have an
    /// equivalent new variant and vice versa.
    fn unions_equivalent(&mut self, old: &[TypeReference], new: &[TypeReference]) -> bool {
        if old.len() != new.len() {
            return false;
        }
        old.iter()
            .all(|old_var| new.iter().any(|new_var| self.equivalent(old_var, new_var)))
            && new
                .iter()
                .all(|new_var| old.iter().any(|old_var| self.equivalent(old_var, new_var)))
    }
}

fn enums_equivalent(old: &EnumDef, new: &EnumDef) -> bool {
    if old.kind != new.kind || old.values.len() != new.values.len() {
        return false;
    }
    old.values.iter().all(|v| new.values.contains(v))
}

/// Flatten a type reference into a [`TypeShape`] for widening analysis.
///
/// Named references to aliases and enums are resolved one level; object and
/// union components contribute a `$Name` marker so that renamed references
/// never silently compare as compatible.
pub fn shape_of(doc: &SchemaDocument, schema: &TypeReference) -> TypeShape {
    let mut shape = TypeShape::default();
    collect_shape(doc, schema, &mut shape, 0);
    shape
}

fn collect_shape(doc: &SchemaDocument, schema: &TypeReference, shape: &mut TypeShape, depth: usize) {
    // Alias chains are acyclic in practice; the bound is a safety net.
    if depth > 16 {
        return;
    }
    match schema {
        TypeReference::Named { name } => match doc.component(name) {
            Some(TypeDefinition::Alias { target }) => collect_shape(doc, target, shape, depth + 1),
            Some(TypeDefinition::Enum(def)) => {
                if let Some(kind) = def.kind {
                    shape.types.insert(kind.as_str().to_string());
                } else {
                    shape.types.insert(format!("${name}"));
                }
            }
            _ => {
                shape.types.insert(format!("${name}"));
            }
        },
        TypeReference::Inline(inline) => {
            if inline.kind == crate::model::TypeKind::Null {
                shape.types.insert("null".to_string());
            } else {
                shape.types.insert(inline.kind.as_str().to_string());
            }
            if shape.format.is_none() {
                shape.format = inline.format.clone();
            }
            shape.nullable |= inline.nullable;
        }
        TypeReference::Union { variants } => {
            for variant in variants {
                collect_shape(doc, variant, shape, depth + 1);
            }
            // anyOf[T, null] is the union spelling of nullability
            if shape.types.remove("null") {
                shape.nullable = true;
            }
        }
    }
}
