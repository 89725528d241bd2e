//! Structural diff engine.
//!
//! Walks two indexed documents in lock-step and produces raw [`Change`]s:
//! symmetric set difference over operation keys, then per-pair comparison of
//! parameters, request/response bodies, and component definitions. The engine
//! detects; it never judges severity, and it never mutates its inputs.

use super::change::{Change, ChangeDetail, ChangeKind};
use super::types::{shape_of, TypeComparator};
use crate::config::CompareOptions;
use crate::model::{
    normalize_path, BodyDef, EnumDef, FieldDef, Location, ObjectDef, Operation, OperationKey,
    ParamLocation, ParameterDef, SchemaDocument, SchemaIndex, TypeDefinition, TypeKind,
    TypeReference,
};
use std::collections::HashSet;

/// Lock-step comparator over two schema documents.
#[derive(Debug, Default)]
pub struct DiffEngine {
    options: CompareOptions,
}

impl DiffEngine {
    /// Create an engine with no compare options set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with the given compare options.
    ///
    /// Options must already be compiled (see [`CompareOptions::compile`]).
    pub fn with_options(options: CompareOptions) -> Self {
        Self { options }
    }

    /// Compare `old` (baseline) against `new` (candidate).
    ///
    /// Changes come out in discovery order: operations in baseline document
    /// order, then candidate-only operations, then components.
    pub fn diff(&self, old: &SchemaDocument, new: &SchemaDocument) -> Vec<Change> {
        // Identical raw documents cannot differ; skip the walk.
        if old.content_hash != 0 && old.content_hash == new.content_hash {
            return Vec::new();
        }

        let old_index = SchemaIndex::build(old);
        let new_index = SchemaIndex::build(new);
        let mut comparator = TypeComparator::new(old, new);
        let mut changes = Vec::new();

        self.diff_operations(&old_index, &new_index, &mut comparator, &mut changes);
        self.diff_components(old, new, &mut comparator, &mut changes);

        tracing::debug!(
            old = %old.title,
            new = %new.title,
            changes = changes.len(),
            "structural diff complete"
        );
        changes
    }

    fn diff_operations(
        &self,
        old_index: &SchemaIndex<'_>,
        new_index: &SchemaIndex<'_>,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        let mut matched_new: HashSet<OperationKey> = HashSet::new();

        for (norm_key, old_op) in old_index.operations() {
            let raw_path = old_index
                .raw_key(norm_key)
                .map(|k| k.path.as_str())
                .unwrap_or(&norm_key.path);
            if self.options.is_path_ignored(raw_path) || self.options.is_tag_skipped(&old_op.tags)
            {
                continue;
            }

            let target_path = normalize_path(&self.options.rewrite_path(raw_path));
            let target_key = OperationKey::new(norm_key.method, target_path);
            let location = Location::operation(norm_key.method, &norm_key.path);

            match new_index.operations().get(&target_key) {
                None => {
                    changes.push(
                        Change::new(location, ChangeKind::Removed, ChangeDetail::Operation)
                            .with_before(norm_key.to_string()),
                    );
                }
                Some(new_op) => {
                    matched_new.insert(target_key);
                    self.diff_operation_pair(&location, old_op, new_op, comparator, changes);
                }
            }
        }

        for (norm_key, new_op) in new_index.operations() {
            if matched_new.contains(norm_key) {
                continue;
            }
            let raw_path = new_index
                .raw_key(norm_key)
                .map(|k| k.path.as_str())
                .unwrap_or(&norm_key.path);
            if self.options.is_path_ignored(raw_path) || self.options.is_tag_skipped(&new_op.tags)
            {
                continue;
            }
            changes.push(
                Change::new(
                    Location::operation(norm_key.method, &norm_key.path),
                    ChangeKind::Added,
                    ChangeDetail::Operation,
                )
                .with_after(norm_key.to_string()),
            );
        }
    }

    fn diff_operation_pair(
        &self,
        location: &Location,
        old_op: &Operation,
        new_op: &Operation,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        self.diff_parameters(location, old_op, new_op, comparator, changes);
        self.diff_request_bodies(location, old_op, new_op, comparator, changes);
        self.diff_responses(location, old_op, new_op, comparator, changes);

        diff_description(location, &old_op.description, &new_op.description, changes);
    }

    /// Compare parameter lists.
    ///
    /// Path parameters are paired positionally: their names are path-template
    /// placeholders, and renaming a placeholder does not change the URLs
    /// clients send. Everything else is paired by (name, location).
    fn diff_parameters(
        &self,
        location: &Location,
        old_op: &Operation,
        new_op: &Operation,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        let params_loc = location.child("parameters");

        let keep = |p: &&ParameterDef| !self.options.is_parameter_ignored(&p.name);
        let old_path: Vec<_> = old_op
            .parameters
            .iter()
            .filter(|p| p.location == ParamLocation::Path)
            .filter(keep)
            .collect();
        let new_path: Vec<_> = new_op
            .parameters
            .iter()
            .filter(|p| p.location == ParamLocation::Path)
            .filter(keep)
            .collect();

        for i in 0..old_path.len().max(new_path.len()) {
            // Positional slot location: either side may spell the placeholder
            // differently, so neither side's name can identify the slot.
            let slot_loc = params_loc.child(&format!("{{{i}}}"));
            match (old_path.get(i), new_path.get(i)) {
                (Some(old_param), Some(new_param)) => {
                    self.diff_parameter_pair(&slot_loc, old_param, new_param, comparator, changes);
                }
                (Some(old_param), None) => changes.push(
                    Change::new(
                        slot_loc,
                        ChangeKind::Removed,
                        ChangeDetail::Parameter {
                            required: old_param.required,
                        },
                    )
                    .with_before(format!("{} ({})", old_param.name, old_param.location)),
                ),
                (None, Some(new_param)) => changes.push(
                    Change::new(
                        slot_loc,
                        ChangeKind::Added,
                        ChangeDetail::Parameter {
                            required: new_param.required,
                        },
                    )
                    .with_after(format!("{} ({})", new_param.name, new_param.location)),
                ),
                (None, None) => unreachable!(),
            }
        }

        for old_param in &old_op.parameters {
            if old_param.location == ParamLocation::Path
                || self.options.is_parameter_ignored(&old_param.name)
            {
                continue;
            }
            let param_loc = params_loc.child(&old_param.name);
            match new_op.parameter(&old_param.name, old_param.location) {
                None => {
                    changes.push(
                        Change::new(
                            param_loc,
                            ChangeKind::Removed,
                            ChangeDetail::Parameter {
                                required: old_param.required,
                            },
                        )
                        .with_before(format!("{} ({})", old_param.name, old_param.location)),
                    );
                }
                Some(new_param) => {
                    self.diff_parameter_pair(&param_loc, old_param, new_param, comparator, changes);
                }
            }
        }

        for new_param in &new_op.parameters {
            if new_param.location == ParamLocation::Path
                || self.options.is_parameter_ignored(&new_param.name)
            {
                continue;
            }
            if old_op.parameter(&new_param.name, new_param.location).is_none() {
                changes.push(
                    Change::new(
                        params_loc.child(&new_param.name),
                        ChangeKind::Added,
                        ChangeDetail::Parameter {
                            required: new_param.required,
                        },
                    )
                    .with_after(format!("{} ({})", new_param.name, new_param.location)),
                );
            }
        }
    }

    fn diff_parameter_pair(
        &self,
        param_loc: &Location,
        old_param: &ParameterDef,
        new_param: &ParameterDef,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        if old_param.required != new_param.required {
            changes.push(
                Change::new(
                    param_loc.child("required"),
                    ChangeKind::Modified,
                    ChangeDetail::ParameterRequired {
                        old: old_param.required,
                        new: new_param.required,
                    },
                )
                .with_before(old_param.required.to_string())
                .with_after(new_param.required.to_string()),
            );
        }
        if !comparator.equivalent(&old_param.schema, &new_param.schema) {
            let old_shape = shape_of(comparator.old_document(), &old_param.schema);
            let new_shape = shape_of(comparator.new_document(), &new_param.schema);
            changes.push(
                Change::new(
                    param_loc.child("schema"),
                    ChangeKind::Modified,
                    ChangeDetail::ParameterType {
                        old: old_shape.clone(),
                        new: new_shape.clone(),
                    },
                )
                .with_before(old_shape.describe())
                .with_after(new_shape.describe()),
            );
        }
        diff_description(param_loc, &old_param.description, &new_param.description, changes);
    }

    fn diff_request_bodies(
        &self,
        location: &Location,
        old_op: &Operation,
        new_op: &Operation,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        let body_loc = location.child("requestBody");
        let empty = BodyDef::default();
        let old_body = old_op.request_body.as_ref().unwrap_or(&empty);
        let new_body = new_op.request_body.as_ref().unwrap_or(&empty);

        for (media_type, old_schema) in &old_body.content {
            let media_loc = body_loc.child(media_type);
            match new_body.content.get(media_type) {
                None => {
                    changes.push(
                        Change::new(media_loc, ChangeKind::Removed, ChangeDetail::RequestMediaType)
                            .with_before(media_type.clone()),
                    );
                }
                Some(new_schema) => {
                    self.diff_body_schema(
                        &media_loc,
                        old_schema,
                        new_schema,
                        true,
                        comparator,
                        changes,
                    );
                }
            }
        }
        for media_type in new_body.content.keys() {
            if !old_body.content.contains_key(media_type) {
                changes.push(
                    Change::new(
                        body_loc.child(media_type),
                        ChangeKind::Added,
                        ChangeDetail::RequestMediaType,
                    )
                    .with_after(media_type.clone()),
                );
            }
        }
    }

    fn diff_responses(
        &self,
        location: &Location,
        old_op: &Operation,
        new_op: &Operation,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        let responses_loc = location.child("responses");

        for (status, old_body) in &old_op.responses {
            let status_loc = responses_loc.child(status);
            match new_op.responses.get(status) {
                None => {
                    changes.push(
                        Change::new(status_loc, ChangeKind::Removed, ChangeDetail::ResponseStatus)
                            .with_before(status.clone()),
                    );
                }
                Some(new_body) => {
                    for (media_type, old_schema) in &old_body.content {
                        let media_loc = status_loc.child(media_type);
                        match new_body.content.get(media_type) {
                            None => {
                                changes.push(
                                    Change::new(
                                        media_loc,
                                        ChangeKind::Removed,
                                        ChangeDetail::ResponseMediaType,
                                    )
                                    .with_before(media_type.clone()),
                                );
                            }
                            Some(new_schema) => {
                                self.diff_body_schema(
                                    &media_loc,
                                    old_schema,
                                    new_schema,
                                    false,
                                    comparator,
                                    changes,
                                );
                            }
                        }
                    }
                    for media_type in new_body.content.keys() {
                        if !old_body.content.contains_key(media_type) {
                            changes.push(
                                Change::new(
                                    status_loc.child(media_type),
                                    ChangeKind::Added,
                                    ChangeDetail::ResponseMediaType,
                                )
                                .with_after(media_type.clone()),
                            );
                        }
                    }
                }
            }
        }
        for status in new_op.responses.keys() {
            if !old_op.responses.contains_key(status) {
                changes.push(
                    Change::new(
                        responses_loc.child(status),
                        ChangeKind::Added,
                        ChangeDetail::ResponseStatus,
                    )
                    .with_after(status.clone()),
                );
            }
        }
    }

    /// Compare a matched body schema pair.
    ///
    /// Two references to the same component name are covered by the component
    /// diff and produce nothing here; anything else that is not deeply
    /// equivalent is a schema change at the body location.
    fn diff_body_schema(
        &self,
        location: &Location,
        old_schema: &TypeReference,
        new_schema: &TypeReference,
        is_request: bool,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        if let (Some(old_name), Some(new_name)) =
            (old_schema.component_name(), new_schema.component_name())
        {
            if old_name == new_name {
                return;
            }
        }
        if comparator.equivalent(old_schema, new_schema) {
            return;
        }
        let detail = if is_request {
            ChangeDetail::RequestSchema
        } else {
            ChangeDetail::ResponseSchema
        };
        changes.push(
            Change::new(location.child("schema"), ChangeKind::Modified, detail)
                .with_before(old_schema.describe())
                .with_after(new_schema.describe()),
        );
    }

    fn diff_components(
        &self,
        old: &SchemaDocument,
        new: &SchemaDocument,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        for (name, old_def) in &old.components {
            let location = Location::component(name);
            match new.components.get(name) {
                None => {
                    changes.push(
                        Change::new(location, ChangeKind::Removed, ChangeDetail::Component)
                            .with_before(format!("{name} ({})", old_def.kind_label())),
                    );
                }
                Some(new_def) => {
                    self.diff_definition_pair(
                        name, &location, old_def, new_def, comparator, changes,
                    );
                }
            }
        }
        for (name, new_def) in &new.components {
            if !old.components.contains_key(name) {
                changes.push(
                    Change::new(
                        Location::component(name),
                        ChangeKind::Added,
                        ChangeDetail::Component,
                    )
                    .with_after(format!("{name} ({})", new_def.kind_label())),
                );
            }
        }
    }

    fn diff_definition_pair(
        &self,
        component: &str,
        location: &Location,
        old_def: &TypeDefinition,
        new_def: &TypeDefinition,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        match (old_def, new_def) {
            (TypeDefinition::Object(old_obj), TypeDefinition::Object(new_obj)) => {
                self.diff_object_fields(component, location, old_obj, new_obj, comparator, changes);
                diff_description(location, &old_obj.description, &new_obj.description, changes);
            }
            (TypeDefinition::Enum(old_enum), TypeDefinition::Enum(new_enum)) => {
                diff_enum_values(location, old_enum, new_enum, changes);
                diff_description(location, &old_enum.description, &new_enum.description, changes);
            }
            (
                TypeDefinition::Union { variants: old_vars },
                TypeDefinition::Union { variants: new_vars },
            ) => {
                let old_union = TypeReference::Union {
                    variants: old_vars.clone(),
                };
                let new_union = TypeReference::Union {
                    variants: new_vars.clone(),
                };
                if !comparator.equivalent(&old_union, &new_union) {
                    let old_shape = shape_of(comparator.old_document(), &old_union);
                    let new_shape = shape_of(comparator.new_document(), &new_union);
                    changes.push(
                        Change::new(
                            location.clone(),
                            ChangeKind::Modified,
                            ChangeDetail::FieldType {
                                old: old_shape.clone(),
                                new: new_shape.clone(),
                            },
                        )
                        .with_before(old_shape.describe())
                        .with_after(new_shape.describe()),
                    );
                }
            }
            (TypeDefinition::Alias { target: old_t }, TypeDefinition::Alias { target: new_t }) => {
                self.diff_field_schema(location, old_t, new_t, false, comparator, changes);
            }
            _ => {
                changes.push(
                    Change::new(location.clone(), ChangeKind::Modified, ChangeDetail::Component)
                        .with_before(old_def.kind_label())
                        .with_after(new_def.kind_label()),
                );
            }
        }
    }

    fn diff_object_fields(
        &self,
        component: &str,
        location: &Location,
        old_obj: &ObjectDef,
        new_obj: &ObjectDef,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        for (field_name, old_field) in &old_obj.fields {
            let field_loc = location.child(field_name);
            match new_obj.fields.get(field_name) {
                None => {
                    if self.options.is_missing_field_allowed(component, field_name) {
                        continue;
                    }
                    changes.push(
                        Change::new(
                            field_loc,
                            ChangeKind::Removed,
                            ChangeDetail::Field {
                                required: old_field.required,
                                has_default: old_field.default.is_some(),
                            },
                        )
                        .with_before(old_field.schema.describe()),
                    );
                }
                Some(new_field) => {
                    self.diff_field_pair(
                        &field_loc, old_field, new_field, comparator, changes,
                    );
                }
            }
        }
        for (field_name, new_field) in &new_obj.fields {
            if !old_obj.fields.contains_key(field_name) {
                changes.push(
                    Change::new(
                        location.child(field_name),
                        ChangeKind::Added,
                        ChangeDetail::Field {
                            required: new_field.required,
                            has_default: new_field.default.is_some(),
                        },
                    )
                    .with_after(new_field.schema.describe()),
                );
            }
        }
    }

    fn diff_field_pair(
        &self,
        location: &Location,
        old_field: &FieldDef,
        new_field: &FieldDef,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        if old_field.required != new_field.required {
            changes.push(
                Change::new(
                    location.child("required"),
                    ChangeKind::Modified,
                    ChangeDetail::FieldRequired {
                        old: old_field.required,
                        new: new_field.required,
                    },
                )
                .with_before(old_field.required.to_string())
                .with_after(new_field.required.to_string()),
            );
        }

        self.diff_field_schema(
            location,
            &old_field.schema,
            &new_field.schema,
            true,
            comparator,
            changes,
        );

        if old_field.default != new_field.default {
            changes.push(
                Change::new(
                    location.child("default"),
                    ChangeKind::Modified,
                    ChangeDetail::FieldDefault {
                        required: new_field.required,
                    },
                )
                .with_before(describe_value(old_field.default.as_ref()))
                .with_after(describe_value(new_field.default.as_ref())),
            );
        }

        if old_field.deprecated != new_field.deprecated {
            changes.push(
                Change::new(
                    location.child("deprecated"),
                    ChangeKind::Modified,
                    ChangeDetail::Deprecation,
                )
                .with_before(old_field.deprecated.to_string())
                .with_after(new_field.deprecated.to_string()),
            );
        }

        if old_field.example != new_field.example {
            changes.push(
                Change::new(
                    location.child("example"),
                    ChangeKind::Modified,
                    ChangeDetail::Metadata,
                )
                .with_before(describe_value(old_field.example.as_ref()))
                .with_after(describe_value(new_field.example.as_ref())),
            );
        }

        diff_description(location, &old_field.description, &new_field.description, changes);
    }

    /// Compare a matched field schema pair, recursing into inline structure
    /// so nested changes get precise locations (`User.address.city`).
    fn diff_field_schema(
        &self,
        location: &Location,
        old_schema: &TypeReference,
        new_schema: &TypeReference,
        nest: bool,
        comparator: &mut TypeComparator<'_>,
        changes: &mut Vec<Change>,
    ) {
        if comparator.equivalent(old_schema, new_schema) {
            return;
        }

        // Same-name component references are covered by that component's own
        // diff entry; differences inside are reported there, once.
        if let (Some(old_name), Some(new_name)) =
            (old_schema.component_name(), new_schema.component_name())
        {
            if old_name == new_name {
                return;
            }
        }

        if nest {
            if let (TypeReference::Inline(old_inline), TypeReference::Inline(new_inline)) =
                (old_schema, new_schema)
            {
                // Nested inline objects: walk field-by-field.
                if old_inline.kind == TypeKind::Object
                    && new_inline.kind == TypeKind::Object
                    && (!old_inline.fields.is_empty() || !new_inline.fields.is_empty())
                {
                    for (field_name, old_field) in &old_inline.fields {
                        let field_loc = location.child(field_name);
                        match new_inline.fields.get(field_name) {
                            None => changes.push(
                                Change::new(
                                    field_loc,
                                    ChangeKind::Removed,
                                    ChangeDetail::Field {
                                        required: old_field.required,
                                        has_default: old_field.default.is_some(),
                                    },
                                )
                                .with_before(old_field.schema.describe()),
                            ),
                            Some(new_field) => self.diff_field_pair(
                                &field_loc, old_field, new_field, comparator, changes,
                            ),
                        }
                    }
                    for (field_name, new_field) in &new_inline.fields {
                        if !old_inline.fields.contains_key(field_name) {
                            changes.push(
                                Change::new(
                                    location.child(field_name),
                                    ChangeKind::Added,
                                    ChangeDetail::Field {
                                        required: new_field.required,
                                        has_default: new_field.default.is_some(),
                                    },
                                )
                                .with_after(new_field.schema.describe()),
                            );
                        }
                    }
                    return;
                }

                // Inline enums: report membership drift, not a type change.
                if !old_inline.enum_values.is_empty() || !new_inline.enum_values.is_empty() {
                    if old_inline.kind == new_inline.kind {
                        diff_enum_literals(
                            location,
                            &old_inline.enum_values,
                            &new_inline.enum_values,
                            changes,
                        );
                        return;
                    }
                }

                // Arrays: recurse into the element type.
                if old_inline.kind == TypeKind::Array && new_inline.kind == TypeKind::Array {
                    if let (Some(old_items), Some(new_items)) =
                        (&old_inline.items, &new_inline.items)
                    {
                        self.diff_field_schema(
                            &location.child("items"),
                            old_items,
                            new_items,
                            nest,
                            comparator,
                            changes,
                        );
                        return;
                    }
                }
            }
        }

        let old_shape = shape_of(comparator.old_document(), old_schema);
        let new_shape = shape_of(comparator.new_document(), new_schema);
        changes.push(
            Change::new(
                location.clone(),
                ChangeKind::Modified,
                ChangeDetail::FieldType {
                    old: old_shape.clone(),
                    new: new_shape.clone(),
                },
            )
            .with_before(old_shape.describe())
            .with_after(new_shape.describe()),
        );
    }
}

fn diff_enum_values(
    location: &Location,
    old_enum: &EnumDef,
    new_enum: &EnumDef,
    changes: &mut Vec<Change>,
) {
    diff_enum_literals(location, &old_enum.values, &new_enum.values, changes);
}

fn diff_enum_literals(
    location: &Location,
    old_values: &[serde_json::Value],
    new_values: &[serde_json::Value],
    changes: &mut Vec<Change>,
) {
    for value in old_values {
        if !new_values.contains(value) {
            changes.push(
                Change::new(
                    location.child("enum"),
                    ChangeKind::Removed,
                    ChangeDetail::EnumValue,
                )
                .with_before(value.to_string()),
            );
        }
    }
    for value in new_values {
        if !old_values.contains(value) {
            changes.push(
                Change::new(
                    location.child("enum"),
                    ChangeKind::Added,
                    ChangeDetail::EnumValue,
                )
                .with_after(value.to_string()),
            );
        }
    }
}

fn diff_description(
    location: &Location,
    old: &Option<String>,
    new: &Option<String>,
    changes: &mut Vec<Change>,
) {
    if old != new {
        changes.push(
            Change::new(
                location.child("description"),
                ChangeKind::Modified,
                ChangeDetail::Metadata,
            )
            .with_before(old.clone().unwrap_or_default())
            .with_after(new.clone().unwrap_or_default()),
        );
    }
}

fn describe_value(value: Option<&serde_json::Value>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}
