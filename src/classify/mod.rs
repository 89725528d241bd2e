//! Compatibility classification.
//!
//! Severity is assigned by an ordered rule table: the first rule whose
//! predicate matches a change wins, and every classified change records the
//! id of the rule that produced its severity. A change no rule recognizes is
//! BREAKING, so new kinds of structural drift fail loudly until a rule is
//! written for them.

use crate::diff::{Change, ChangeDetail, ChangeKind};
use serde::Serialize;
use std::fmt;

/// Client impact of a single change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Existing clients can break
    Breaking,
    /// Existing clients keep working
    Compatible,
    /// No behavioral impact (descriptions, deprecation markers)
    Informational,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Breaking => "BREAKING",
            Self::Compatible => "COMPATIBLE",
            Self::Informational => "INFORMATIONAL",
        })
    }
}

/// A change together with the verdict of the rule that matched it.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedChange {
    #[serde(flatten)]
    pub change: Change,
    pub severity: Severity,
    /// Stable id of the matching rule, for suppressions and audit
    pub rule: &'static str,
    pub rationale: &'static str,
}

struct Rule {
    id: &'static str,
    severity: Severity,
    rationale: &'static str,
    matches: fn(&Change) -> bool,
}

/// Ordered rule table. First match wins, so specific rules (widening) sit
/// above their catch-all counterparts (type changed).
const RULES: &[Rule] = &[
    Rule {
        id: "operation-removed",
        severity: Severity::Breaking,
        rationale: "clients calling this operation will receive errors",
        matches: |c| c.detail == ChangeDetail::Operation && c.kind == ChangeKind::Removed,
    },
    Rule {
        id: "operation-added",
        severity: Severity::Compatible,
        rationale: "existing clients do not call operations they predate",
        matches: |c| c.detail == ChangeDetail::Operation && c.kind == ChangeKind::Added,
    },
    Rule {
        id: "parameter-removed",
        severity: Severity::Breaking,
        rationale: "requests still sending this parameter may be rejected or silently misread",
        matches: |c| {
            matches!(c.detail, ChangeDetail::Parameter { .. }) && c.kind == ChangeKind::Removed
        },
    },
    Rule {
        id: "required-parameter-added",
        severity: Severity::Breaking,
        rationale: "existing requests omit the new parameter and will be rejected",
        matches: |c| {
            matches!(c.detail, ChangeDetail::Parameter { required: true })
                && c.kind == ChangeKind::Added
        },
    },
    Rule {
        id: "optional-parameter-added",
        severity: Severity::Compatible,
        rationale: "existing requests omit the parameter and keep their behavior",
        matches: |c| {
            matches!(c.detail, ChangeDetail::Parameter { required: false })
                && c.kind == ChangeKind::Added
        },
    },
    Rule {
        id: "parameter-now-required",
        severity: Severity::Breaking,
        rationale: "requests that omit the parameter will start failing",
        matches: |c| matches!(c.detail, ChangeDetail::ParameterRequired { new: true, .. }),
    },
    Rule {
        id: "parameter-now-optional",
        severity: Severity::Compatible,
        rationale: "every existing request already supplies the parameter",
        matches: |c| matches!(c.detail, ChangeDetail::ParameterRequired { new: false, .. }),
    },
    Rule {
        id: "parameter-type-widened",
        severity: Severity::Compatible,
        rationale: "every value accepted before is still accepted",
        matches: |c| {
            matches!(&c.detail, ChangeDetail::ParameterType { old, new } if old.widens_to(new))
        },
    },
    Rule {
        id: "parameter-type-changed",
        severity: Severity::Breaking,
        rationale: "previously valid parameter values may now be rejected",
        matches: |c| matches!(c.detail, ChangeDetail::ParameterType { .. }),
    },
    Rule {
        id: "request-media-type-removed",
        severity: Severity::Breaking,
        rationale: "clients sending this content type will be rejected",
        matches: |c| {
            c.detail == ChangeDetail::RequestMediaType && c.kind == ChangeKind::Removed
        },
    },
    Rule {
        id: "request-media-type-added",
        severity: Severity::Compatible,
        rationale: "existing clients keep using the content types they already send",
        matches: |c| c.detail == ChangeDetail::RequestMediaType && c.kind == ChangeKind::Added,
    },
    Rule {
        id: "request-schema-changed",
        severity: Severity::Breaking,
        rationale: "request bodies valid before may no longer validate",
        matches: |c| c.detail == ChangeDetail::RequestSchema,
    },
    Rule {
        id: "response-status-removed",
        severity: Severity::Breaking,
        rationale: "clients handling this status will no longer see it as documented",
        matches: |c| c.detail == ChangeDetail::ResponseStatus && c.kind == ChangeKind::Removed,
    },
    Rule {
        id: "response-status-added",
        severity: Severity::Compatible,
        rationale: "clients fall back to their default handling for new statuses",
        matches: |c| c.detail == ChangeDetail::ResponseStatus && c.kind == ChangeKind::Added,
    },
    Rule {
        id: "response-media-type-removed",
        severity: Severity::Breaking,
        rationale: "clients negotiating this content type will stop receiving it",
        matches: |c| {
            c.detail == ChangeDetail::ResponseMediaType && c.kind == ChangeKind::Removed
        },
    },
    Rule {
        id: "response-media-type-added",
        severity: Severity::Compatible,
        rationale: "content negotiation keeps serving the types clients ask for",
        matches: |c| c.detail == ChangeDetail::ResponseMediaType && c.kind == ChangeKind::Added,
    },
    Rule {
        id: "response-schema-changed",
        severity: Severity::Breaking,
        rationale: "clients parse responses against the old shape",
        matches: |c| c.detail == ChangeDetail::ResponseSchema,
    },
    Rule {
        id: "component-removed",
        severity: Severity::Breaking,
        rationale: "every use of the component loses its definition",
        matches: |c| c.detail == ChangeDetail::Component && c.kind == ChangeKind::Removed,
    },
    Rule {
        id: "component-added",
        severity: Severity::Compatible,
        rationale: "unused by existing clients until an operation references it",
        matches: |c| c.detail == ChangeDetail::Component && c.kind == ChangeKind::Added,
    },
    Rule {
        id: "component-kind-changed",
        severity: Severity::Breaking,
        rationale: "the component is a different kind of type entirely",
        matches: |c| c.detail == ChangeDetail::Component && c.kind == ChangeKind::Modified,
    },
    Rule {
        id: "field-removed",
        severity: Severity::Breaking,
        rationale: "readers of the field get nothing, writers may be rejected",
        matches: |c| {
            matches!(c.detail, ChangeDetail::Field { .. }) && c.kind == ChangeKind::Removed
        },
    },
    Rule {
        id: "required-field-added-without-default",
        severity: Severity::Breaking,
        rationale: "existing payloads omit the field and cannot be defaulted",
        matches: |c| {
            matches!(
                c.detail,
                ChangeDetail::Field {
                    required: true,
                    has_default: false
                }
            ) && c.kind == ChangeKind::Added
        },
    },
    Rule {
        id: "field-added",
        severity: Severity::Compatible,
        rationale: "optional or defaulted fields do not invalidate existing payloads",
        matches: |c| {
            matches!(c.detail, ChangeDetail::Field { .. }) && c.kind == ChangeKind::Added
        },
    },
    Rule {
        id: "field-now-required",
        severity: Severity::Breaking,
        rationale: "payloads that omit the field will start failing validation",
        matches: |c| matches!(c.detail, ChangeDetail::FieldRequired { new: true, .. }),
    },
    Rule {
        id: "field-now-optional",
        severity: Severity::Compatible,
        rationale: "every existing payload already carries the field",
        matches: |c| matches!(c.detail, ChangeDetail::FieldRequired { new: false, .. }),
    },
    Rule {
        id: "field-type-widened",
        severity: Severity::Compatible,
        rationale: "every value valid before is still valid",
        matches: |c| {
            matches!(&c.detail, ChangeDetail::FieldType { old, new } if old.widens_to(new))
        },
    },
    Rule {
        id: "field-type-changed",
        severity: Severity::Breaking,
        rationale: "previously valid field values may now be rejected or misparsed",
        matches: |c| matches!(c.detail, ChangeDetail::FieldType { .. }),
    },
    Rule {
        id: "required-field-default-changed",
        severity: Severity::Breaking,
        rationale: "validation of payloads relying on the old default shifts",
        matches: |c| matches!(c.detail, ChangeDetail::FieldDefault { required: true }),
    },
    Rule {
        id: "field-default-changed",
        severity: Severity::Informational,
        rationale: "omitted optional values are filled differently",
        matches: |c| matches!(c.detail, ChangeDetail::FieldDefault { .. }),
    },
    Rule {
        id: "deprecation-changed",
        severity: Severity::Informational,
        rationale: "deprecation markers carry no runtime behavior",
        matches: |c| c.detail == ChangeDetail::Deprecation,
    },
    Rule {
        id: "enum-value-removed",
        severity: Severity::Breaking,
        rationale: "payloads carrying the removed literal will be rejected",
        matches: |c| c.detail == ChangeDetail::EnumValue && c.kind == ChangeKind::Removed,
    },
    Rule {
        id: "enum-value-added",
        severity: Severity::Compatible,
        rationale: "existing payloads only use literals that still exist",
        matches: |c| c.detail == ChangeDetail::EnumValue && c.kind == ChangeKind::Added,
    },
    Rule {
        id: "metadata-changed",
        severity: Severity::Informational,
        rationale: "descriptions and examples are documentation only",
        matches: |c| c.detail == ChangeDetail::Metadata,
    },
];

const FALLBACK_RULE: &str = "unclassified";
const FALLBACK_RATIONALE: &str = "no rule recognizes this structural change";

/// Classify one change against the rule table.
pub fn classify(change: Change) -> ClassifiedChange {
    for rule in RULES {
        if (rule.matches)(&change) {
            return ClassifiedChange {
                change,
                severity: rule.severity,
                rule: rule.id,
                rationale: rule.rationale,
            };
        }
    }
    tracing::warn!(location = %change.location, "change matched no rule, treating as breaking");
    ClassifiedChange {
        change,
        severity: Severity::Breaking,
        rule: FALLBACK_RULE,
        rationale: FALLBACK_RATIONALE,
    }
}

/// Classify a batch of changes, preserving order.
pub fn classify_all(changes: Vec<Change>) -> Vec<ClassifiedChange> {
    changes.into_iter().map(classify).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::TypeShape;
    use crate::model::Location;
    use std::collections::BTreeSet;

    fn change(kind: ChangeKind, detail: ChangeDetail) -> Change {
        Change::new(Location::component("User").child("email"), kind, detail)
    }

    fn shape(types: &[&str]) -> TypeShape {
        TypeShape {
            types: types.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            format: None,
            nullable: false,
        }
    }

    #[test]
    fn test_removed_operation_is_breaking() {
        let classified = classify(Change::new(
            Location::operation(crate::model::HttpMethod::Get, "/users"),
            ChangeKind::Removed,
            ChangeDetail::Operation,
        ));
        assert_eq!(classified.severity, Severity::Breaking);
        assert_eq!(classified.rule, "operation-removed");
    }

    #[test]
    fn test_added_operation_is_compatible() {
        let classified = classify(Change::new(
            Location::operation(crate::model::HttpMethod::Get, "/health"),
            ChangeKind::Added,
            ChangeDetail::Operation,
        ));
        assert_eq!(classified.severity, Severity::Compatible);
    }

    #[test]
    fn test_widening_before_catch_all() {
        let widened = classify(change(
            ChangeKind::Modified,
            ChangeDetail::FieldType {
                old: shape(&["integer"]),
                new: shape(&["number"]),
            },
        ));
        assert_eq!(widened.severity, Severity::Compatible);
        assert_eq!(widened.rule, "field-type-widened");

        let narrowed = classify(change(
            ChangeKind::Modified,
            ChangeDetail::FieldType {
                old: shape(&["number"]),
                new: shape(&["integer"]),
            },
        ));
        assert_eq!(narrowed.severity, Severity::Breaking);
        assert_eq!(narrowed.rule, "field-type-changed");
    }

    #[test]
    fn test_required_field_added_without_default_is_breaking() {
        let classified = classify(change(
            ChangeKind::Added,
            ChangeDetail::Field {
                required: true,
                has_default: false,
            },
        ));
        assert_eq!(classified.severity, Severity::Breaking);

        let defaulted = classify(change(
            ChangeKind::Added,
            ChangeDetail::Field {
                required: true,
                has_default: true,
            },
        ));
        assert_eq!(defaulted.severity, Severity::Compatible);
    }

    #[test]
    fn test_required_flip_asymmetry() {
        let tightened = classify(change(
            ChangeKind::Modified,
            ChangeDetail::FieldRequired {
                old: false,
                new: true,
            },
        ));
        assert_eq!(tightened.severity, Severity::Breaking);

        let relaxed = classify(change(
            ChangeKind::Modified,
            ChangeDetail::FieldRequired {
                old: true,
                new: false,
            },
        ));
        assert_eq!(relaxed.severity, Severity::Compatible);
    }

    #[test]
    fn test_enum_membership_asymmetry() {
        let removed = classify(change(ChangeKind::Removed, ChangeDetail::EnumValue));
        assert_eq!(removed.severity, Severity::Breaking);
        let added = classify(change(ChangeKind::Added, ChangeDetail::EnumValue));
        assert_eq!(added.severity, Severity::Compatible);
    }

    #[test]
    fn test_metadata_is_informational() {
        let classified = classify(change(ChangeKind::Modified, ChangeDetail::Metadata));
        assert_eq!(classified.severity, Severity::Informational);
    }

    #[test]
    fn test_every_detail_kind_has_a_rule() {
        // Spot-check that common (kind, detail) combinations never hit the
        // fallback; the fallback is reserved for future detail variants.
        let cases = vec![
            (ChangeKind::Removed, ChangeDetail::ResponseStatus),
            (ChangeKind::Added, ChangeDetail::ResponseMediaType),
            (ChangeKind::Modified, ChangeDetail::RequestSchema),
            (ChangeKind::Modified, ChangeDetail::ResponseSchema),
            (ChangeKind::Modified, ChangeDetail::Deprecation),
            (ChangeKind::Modified, ChangeDetail::Component),
            (ChangeKind::Modified, ChangeDetail::FieldDefault { required: false }),
        ];
        for (kind, detail) in cases {
            let classified = classify(change(kind, detail));
            assert_ne!(classified.rule, FALLBACK_RULE);
        }
    }

    #[test]
    fn test_unknown_combination_fails_closed() {
        // MODIFIED + Operation is a combination the engine never emits.
        let classified = classify(change(ChangeKind::Modified, ChangeDetail::Operation));
        assert_eq!(classified.severity, Severity::Breaking);
        assert_eq!(classified.rule, FALLBACK_RULE);
    }
}
