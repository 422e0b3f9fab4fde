//! Transformation classification
//!
//! Groups a scope's transformations by the top-level field they touch and
//! checks that every group has a shape the synthesizers can build.
//!
//! Grouping is done by [`group_by_segment`], which the synthesizers reuse
//! at every nesting level.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::ir::Transformation;
use crate::path::{FieldPath, Scope};
use crate::value::resolve_value;

/// Group items by the path segment at `index`, keeping first-seen key order
///
/// Items within a group keep their input order. Items whose path is not
/// deeper than `index` have no such segment and are skipped.
pub fn group_by_segment<'a, T, F>(items: &[&'a T], index: usize, path_of: F) -> IndexMap<String, Vec<&'a T>>
where
    F: Fn(&T) -> &FieldPath,
{
    let mut groups: IndexMap<String, Vec<&'a T>> = IndexMap::new();
    for item in items {
        if let Some(segment) = path_of(item).segment(index) {
            groups.entry(segment.to_string()).or_default().push(*item);
        }
    }
    groups
}

/// Transformations touching one top-level field
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationGroup {
    /// Top-level field name
    pub field: String,

    /// Members in synthesis order
    pub members: Vec<Transformation>,
}

impl TransformationGroup {
    /// Whether more than one transformation shares the field
    pub fn is_batched(&self) -> bool {
        self.members.len() > 1
    }

    /// Whether the group writes nested fields
    pub fn is_nested(&self) -> bool {
        self.members.iter().any(|t| t.target.depth() > 1)
    }

    /// Member references, for [`group_by_segment`]
    pub fn member_refs(&self) -> Vec<&Transformation> {
        self.members.iter().collect()
    }
}

/// A scope's transformations, grouped and validated
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Scope of every member
    pub scope: Scope,

    /// Groups keyed by top-level field, in first-seen order
    pub groups: IndexMap<String, TransformationGroup>,
}

impl Classification {
    /// Whether nothing is left to synthesize
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All members in synthesis order
    pub fn transformations(&self) -> impl Iterator<Item = &Transformation> {
        self.groups.values().flat_map(|g| g.members.iter())
    }

    /// Whether any member copies from the parsed impression extension
    pub fn reads_imp_ext(&self) -> bool {
        self.transformations().any(|t| match &t.value {
            crate::ir::ValueSource::Copy(source) => source.is_ext_sourced(),
            crate::ir::ValueSource::Static(_) => false,
        })
    }
}

/// Classify one scope's transformations
///
/// - `staticValue: null` records are dropped with a warning
/// - static values are type-checked up front
/// - groups are keyed by the first target segment in first-seen order
/// - impression groups list static members before copies, each side
///   keeping input order
/// - a field written both as a leaf and as a parent of nested writes is
///   rejected
pub fn classify(transformations: Vec<Transformation>, scope: Scope) -> Result<Classification> {
    let mut kept = Vec::with_capacity(transformations.len());
    for t in transformations {
        if t.is_noop() {
            tracing::warn!(
                target_path = %t.raw_target,
                "Ignoring transformation with null staticValue"
            );
            continue;
        }
        resolve_value(&t)?;
        kept.push(t);
    }

    let refs: Vec<&Transformation> = kept.iter().collect();
    validate_shape(&refs, 0)?;

    let mut groups = IndexMap::new();
    for (field, members) in group_by_segment(&refs, 0, |t| &t.target) {
        let members: Vec<Transformation> = match scope {
            Scope::Impression => {
                let (statics, copies): (Vec<_>, Vec<_>) =
                    members.into_iter().partition(|t| t.is_static());
                statics.into_iter().chain(copies).cloned().collect()
            }
            Scope::Request => members.into_iter().cloned().collect(),
        };

        tracing::debug!(
            scope = %scope,
            field = %field,
            members = members.len(),
            "Classified transformation group"
        );
        groups.insert(field.clone(), TransformationGroup { field, members });
    }

    Ok(Classification { scope, groups })
}

fn validate_shape(members: &[&Transformation], index: usize) -> Result<()> {
    for (field, items) in group_by_segment(members, index, |t| &t.target) {
        let (leaves, nested): (Vec<&Transformation>, Vec<&Transformation>) =
            items.into_iter().partition(|t| t.target.depth() == index + 1);

        if let (Some(leaf), Some(deeper)) = (leaves.first(), nested.first()) {
            return Err(Error::UnsupportedTransformation {
                target: deeper.raw_target.clone(),
                message: format!(
                    "'{}' is assigned directly by '{}' and also has nested fields written",
                    field, leaf.raw_target
                ),
            });
        }

        if !nested.is_empty() {
            validate_shape(&nested, index + 1)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{SourcePath, SourceRoot};
    use serde_json::{Value, json};

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn stat(target: &str, value: Value) -> Transformation {
        Transformation::with_static(target, path(target), value)
    }

    fn copy(target: &str, root: SourceRoot, source: &str) -> Transformation {
        Transformation::with_copy(
            target,
            path(target),
            SourcePath {
                root,
                path: path(source),
            },
        )
    }

    #[test]
    fn test_group_by_segment_keeps_order() {
        let items = [path("site.page"), path("app.id"), path("site.domain"), path("tmax")];
        let refs: Vec<&FieldPath> = items.iter().collect();

        let groups = group_by_segment(&refs, 0, |p| p);
        let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["site", "app", "tmax"]);
        assert_eq!(groups["site"].len(), 2);

        let nested = group_by_segment(&refs, 1, |p| p);
        let keys: Vec<&str> = nested.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["page", "id", "domain"]);
    }

    #[test]
    fn test_impression_statics_before_copies() {
        let classification = classify(
            vec![
                copy("banner.h", SourceRoot::ImpExt, "height"),
                stat("banner.w", json!(300)),
                copy("banner.pos", SourceRoot::ImpExt, "pos"),
                stat("banner.topframe", json!(1)),
            ],
            Scope::Impression,
        )
        .unwrap();

        let banner = &classification.groups["banner"];
        let order: Vec<&str> = banner.members.iter().map(|t| t.raw_target.as_str()).collect();
        assert_eq!(order, vec!["banner.w", "banner.topframe", "banner.h", "banner.pos"]);
        assert!(banner.is_batched());
        assert!(banner.is_nested());
    }

    #[test]
    fn test_request_keeps_input_order() {
        let classification = classify(
            vec![
                copy("site.page", SourceRoot::Request, "app.bundle"),
                stat("site.domain", json!("example.com")),
            ],
            Scope::Request,
        )
        .unwrap();

        let order: Vec<&str> = classification.groups["site"]
            .members
            .iter()
            .map(|t| t.raw_target.as_str())
            .collect();
        assert_eq!(order, vec!["site.page", "site.domain"]);
    }

    #[test]
    fn test_null_static_is_dropped() {
        let classification = classify(
            vec![stat("bidfloor", Value::Null), stat("tagid", json!("x"))],
            Scope::Impression,
        )
        .unwrap();
        assert_eq!(classification.groups.len(), 1);
        assert!(classification.groups.contains_key("tagid"));

        let empty = classify(vec![stat("bidfloor", Value::Null)], Scope::Impression).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_rejects_leaf_and_nested() {
        let err = classify(
            vec![stat("site", json!("x")), stat("site.page", json!("y"))],
            Scope::Request,
        )
        .unwrap_err();
        match err {
            Error::UnsupportedTransformation { target, .. } => assert_eq!(target, "site.page"),
            other => panic!("Expected UnsupportedTransformation, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_leaf_and_nested_at_second_level() {
        let err = classify(
            vec![
                stat("site.content", json!("x")),
                stat("site.content.title", json!("y")),
            ],
            Scope::Request,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedTransformation { .. }));
    }

    #[test]
    fn test_rejects_bad_static_types() {
        let err = classify(vec![stat("banner.w", json!(true))], Scope::Impression).unwrap_err();
        assert!(matches!(err, Error::UnsupportedValueType { kind: "boolean", .. }));
    }

    #[test]
    fn test_reads_imp_ext() {
        let classification = classify(
            vec![copy("site.id", SourceRoot::ImpExt, "siteId")],
            Scope::Request,
        )
        .unwrap();
        assert!(classification.reads_imp_ext());

        let classification = classify(vec![stat("tmax", json!(500))], Scope::Request).unwrap();
        assert!(!classification.reads_imp_ext());
    }
}
