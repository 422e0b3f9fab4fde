//! Expectation synthesis
//!
//! Builds the request a generated test expects, independently of the
//! mutation programs. Where a mutation program walks builders statement by
//! statement, the expectation is a tree of objects, each seeded from the
//! given request and carrying the overrides that apply to it:
//!
//! ```text
//! bidRequest
//! ├── imp = [ imp[0]
//! │           └── banner (from imp[0].banner)
//! │               ├── w = 300
//! │               └── h = 250 ]
//! └── site (from bidRequest.site)
//!     └── page = "p"
//! ```

use crate::classifier::{Classification, group_by_segment};
use crate::error::{Error, Result};
use crate::ir::{ExpectedObject, ExpectedProgram, ExpectedRoot, NestedKind, NestedStep, Override, Transformation};
use crate::value::resolve_value;

/// Build the expectation for the given impression and request classifications
///
/// The expectation describes a request with a single impression.
pub fn synthesize_expected(imp: &Classification, request: &Classification) -> Result<ExpectedProgram> {
    let mut root = ExpectedObject::new(ExpectedRoot::Request, Vec::new());

    if !imp.is_empty() {
        let mut first_imp = ExpectedObject::new(ExpectedRoot::FirstImp, Vec::new());
        for group in imp.groups.values() {
            add_overrides(&mut first_imp, &group.member_refs(), 0)?;
        }
        root.overrides.push(Override::SingleImp(Box::new(first_imp)));
    }

    for group in request.groups.values() {
        add_overrides(&mut root, &group.member_refs(), 0)?;
    }

    tracing::debug!(overrides = root.overrides.len(), "Synthesized expectation");
    Ok(ExpectedProgram { request: root })
}

fn add_overrides(object: &mut ExpectedObject, members: &[&Transformation], index: usize) -> Result<()> {
    let parent_kind = object.steps.last().map(|s| s.kind.clone());

    for (field, items) in group_by_segment(members, index, |t| &t.target) {
        let (leaves, nested): (Vec<&Transformation>, Vec<&Transformation>) =
            items.into_iter().partition(|t| t.target.depth() == index + 1);

        if !leaves.is_empty() && !nested.is_empty() {
            return Err(Error::UnsupportedTransformation {
                target: nested[0].raw_target.clone(),
                message: format!("'{}' is both assigned and rebuilt", field),
            });
        }

        for t in leaves {
            object.overrides.push(Override::Value {
                field: field.clone(),
                value: resolve_value(t)?,
            });
        }

        if !nested.is_empty() {
            let mut steps = object.steps.clone();
            steps.push(NestedStep {
                field: field.clone(),
                kind: NestedKind::of_field(&field, parent_kind.as_ref()),
            });
            let mut child = ExpectedObject::new(object.root, steps);
            add_overrides(&mut child, &nested, index + 1)?;
            object.overrides.push(Override::Object {
                field,
                object: child,
            });
        }
    }
    Ok(())
}
