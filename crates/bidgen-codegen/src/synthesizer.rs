//! Mutation synthesis
//!
//! Lowers a [`Classification`] into the statement sequence of a mutation
//! method. Every nested object that receives writes gets exactly one
//! builder, seeded from the original object when it exists, and is
//! committed into its parent once all of its writes are done:
//!
//! ```text
//! banner.w = 300, banner.h = 250
//!
//!   Open   banner            (copy of imp.banner, or a fresh Banner)
//!   Set    banner.w = 300
//!   Set    banner.h = 250
//!   Commit banner            (impBuilder.banner(bannerBuilder.build()))
//! ```

use crate::classifier::{Classification, group_by_segment};
use crate::error::{Error, Result};
use crate::ir::{BuilderRef, MutationOp, MutationProgram, NestedKind, Transformation};
use crate::path::Scope;
use crate::value::resolve_value;

/// Synthesize the mutation program for one scope
pub fn synthesize(classification: &Classification) -> Result<MutationProgram> {
    let mut ops = Vec::new();

    if classification.scope == Scope::Request && classification.reads_imp_ext() {
        ops.push(MutationOp::LocateImpExt);
    }

    for group in classification.groups.values() {
        tracing::trace!(field = %group.field, members = group.members.len(), "Synthesizing group");
        emit_level(&mut ops, &BuilderRef::Root, None, &group.member_refs(), 0)?;
    }

    let program = MutationProgram {
        scope: classification.scope,
        ops,
    };
    tracing::debug!(
        scope = %program.scope,
        ops = program.ops.len(),
        sets = program.set_count(),
        "Synthesized mutation program"
    );
    Ok(program)
}

fn emit_level(
    ops: &mut Vec<MutationOp>,
    builder: &BuilderRef,
    parent_kind: Option<&NestedKind>,
    members: &[&Transformation],
    index: usize,
) -> Result<()> {
    for (field, items) in group_by_segment(members, index, |t| &t.target) {
        let is_leaf = |t: &&Transformation| t.target.depth() == index + 1;

        if items.iter().all(is_leaf) {
            for t in items {
                ops.push(MutationOp::Set {
                    builder: builder.clone(),
                    field: field.clone(),
                    value: resolve_value(t)?,
                });
            }
            continue;
        }

        if let Some(leaf) = items.iter().find(|t| is_leaf(*t)) {
            return Err(Error::UnsupportedTransformation {
                target: leaf.raw_target.clone(),
                message: format!("'{}' is both assigned and rebuilt", field),
            });
        }

        let path = items[0].target.prefix(index + 1);
        let kind = NestedKind::of_field(&field, parent_kind);

        ops.push(MutationOp::Open {
            path: path.clone(),
            kind: kind.clone(),
        });
        emit_level(ops, &BuilderRef::Nested(path.clone()), Some(&kind), &items, index + 1)?;
        ops.push(MutationOp::Commit { path });
    }
    Ok(())
}
