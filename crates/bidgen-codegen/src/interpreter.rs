//! Program interpreter
//!
//! Executes mutation and expectation programs directly over JSON object
//! graphs, following the semantics of the generated Java:
//!
//! - builders are seeded with a deep copy of the original object, or
//!   start empty when it is absent
//! - writing `null` clears a field
//! - copy sources read the original objects, never the builders
//! - a copy through a missing intermediate object fails with
//!   [`Error::NullDereference`]
//!
//! This is what the consistency tests use to check that the two programs
//! compiled from one transformation set agree.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::ir::{
    BuilderRef, CompiledTransformations, ExpectedObject, ExpectedProgram, ExpectedRoot, MutationOp,
    MutationProgram, Override, ValueExpr,
};
use crate::path::{FieldPath, SourcePath, SourceRoot};
use crate::value::{FIRST_IMP, render_mutation_value};

/// Objects copy sources are read from
#[derive(Debug, Clone, Copy)]
struct Sources<'a> {
    imp: Option<&'a Value>,
    imp_ext: Option<&'a Value>,
    request: Option<&'a Value>,
}

/// Run an impression program against one impression
///
/// `imp_ext` is the impression's parsed bidder extension, if any.
pub fn run_imp_program(program: &MutationProgram, imp: &Value, imp_ext: Option<&Value>) -> Result<Value> {
    let base = as_object(imp, "imp")?;
    let sources = Sources {
        imp: Some(imp),
        imp_ext,
        request: None,
    };
    let result = execute(program, base, base.clone(), sources, &[])?;
    Ok(Value::Object(result))
}

/// Run a request program
///
/// Sources and nested originals are read from `bid_request`; writes go into
/// `builder`, which already carries the modified impressions. `imp_exts`
/// holds the parsed bidder extension of every impression, in order.
pub fn run_request_program(
    program: &MutationProgram,
    bid_request: &Value,
    builder: Value,
    imp_exts: &[Option<Value>],
) -> Result<Value> {
    let base = as_object(bid_request, "bidRequest")?;
    let root = match builder {
        Value::Object(map) => map,
        _ => {
            return Err(Error::InvalidObjectGraph(
                "request builder is not an object".to_string(),
            ));
        }
    };
    let sources = Sources {
        imp: None,
        imp_ext: None,
        request: Some(bid_request),
    };
    let result = execute(program, base, root, sources, imp_exts)?;
    Ok(Value::Object(result))
}

/// Run both compiled mutation programs the way the generated bidder does
///
/// Every impression is modified with its own parsed extension, then the
/// request program runs with the modified impressions already in place.
pub fn run_pipeline(compiled: &CompiledTransformations, bid_request: &Value) -> Result<Value> {
    let request = as_object(bid_request, "bidRequest")?;

    let imps: &[Value] = match request.get("imp") {
        None | Some(Value::Null) => &[],
        Some(Value::Array(imps)) => imps,
        Some(_) => {
            return Err(Error::InvalidObjectGraph(
                "bidRequest.imp is not an array".to_string(),
            ));
        }
    };

    let mut modified = Vec::with_capacity(imps.len());
    let mut imp_exts = Vec::with_capacity(imps.len());
    for imp in imps {
        let imp_ext = bidder_ext(imp).cloned();
        let result = match &compiled.imp {
            Some(program) => run_imp_program(program, imp, imp_ext.as_ref())?,
            None => imp.clone(),
        };
        modified.push(result);
        imp_exts.push(imp_ext);
    }

    let mut builder = request.clone();
    if request.contains_key("imp") {
        builder.insert("imp".to_string(), Value::Array(modified));
    }

    match &compiled.request {
        Some(program) => run_request_program(program, bid_request, Value::Object(builder), &imp_exts),
        None => Ok(Value::Object(builder)),
    }
}

/// Evaluate the expected request for a given bid request
pub fn evaluate_expected(expected: &ExpectedProgram, bid_request: &Value) -> Result<Value> {
    as_object(bid_request, "bidRequest")?;

    let first_imp = bid_request
        .get("imp")
        .and_then(|imps| imps.get(0))
        .filter(|imp| !imp.is_null());
    let sources = Sources {
        imp: first_imp,
        imp_ext: first_imp.and_then(bidder_ext),
        request: Some(bid_request),
    };

    eval_object(&expected.request, bid_request, sources)
}

fn execute<'a>(
    program: &MutationProgram,
    base: &Map<String, Value>,
    mut root: Map<String, Value>,
    mut sources: Sources<'a>,
    imp_exts: &'a [Option<Value>],
) -> Result<Map<String, Value>> {
    let mut builders: HashMap<FieldPath, Map<String, Value>> = HashMap::new();

    for op in &program.ops {
        match op {
            MutationOp::LocateImpExt => {
                let first = imp_exts.first().ok_or_else(|| Error::NullDereference {
                    expression: "impsWithExts.get(0)".to_string(),
                })?;
                sources.imp_ext = first.as_ref();
            }
            MutationOp::Open { path, kind } => {
                let seed = match original_at(base, path) {
                    Some(Value::Object(original)) => original.clone(),
                    Some(_) if !kind.is_json() => {
                        return Err(Error::InvalidObjectGraph(format!(
                            "{}.{} is not an object",
                            program.scope.base_var(),
                            path
                        )));
                    }
                    _ => Map::new(),
                };
                builders.insert(path.clone(), seed);
            }
            MutationOp::Set {
                builder,
                field,
                value,
            } => {
                let value = eval_value(value, sources)?;
                let target = match builder {
                    BuilderRef::Root => &mut root,
                    BuilderRef::Nested(path) => builder_mut(&mut builders, path)?,
                };
                set_field(target, field, value);
            }
            MutationOp::Commit { path } => {
                let child = builders.remove(path).ok_or_else(|| {
                    Error::InvalidObjectGraph(format!("no open builder for {}", path))
                })?;
                let parent = if path.depth() == 1 {
                    &mut root
                } else {
                    builder_mut(&mut builders, &path.prefix(path.depth() - 1))?
                };
                parent.insert(path.leaf().to_string(), Value::Object(child));
            }
        }
    }

    Ok(root)
}

fn eval_object(object: &ExpectedObject, bid_request: &Value, sources: Sources<'_>) -> Result<Value> {
    let root = match object.root {
        ExpectedRoot::Request => Some(bid_request),
        ExpectedRoot::FirstImp => Some(sources.imp.ok_or_else(|| Error::NullDereference {
            expression: FIRST_IMP.to_string(),
        })?),
    };

    let mut current = root;
    for step in &object.steps {
        current = current.and_then(|v| v.get(&step.field)).filter(|v| !v.is_null());
    }

    let mut map = match current {
        Some(Value::Object(original)) => original.clone(),
        Some(_) if !object.kind().is_json() => {
            return Err(Error::InvalidObjectGraph(format!(
                "expected an object at {}",
                object
                    .steps
                    .iter()
                    .map(|s| s.field.as_str())
                    .collect::<Vec<_>>()
                    .join(".")
            )));
        }
        _ => Map::new(),
    };

    for item in &object.overrides {
        match item {
            Override::Value { field, value } => {
                let value = eval_value(value, sources)?;
                set_field(&mut map, field, value);
            }
            Override::Object { field, object } => {
                let value = eval_object(object, bid_request, sources)?;
                map.insert(field.clone(), value);
            }
            Override::SingleImp(first_imp) => {
                let value = eval_object(first_imp, bid_request, sources)?;
                map.insert("imp".to_string(), Value::Array(vec![value]));
            }
        }
    }

    Ok(Value::Object(map))
}

fn eval_value(expr: &ValueExpr, sources: Sources<'_>) -> Result<Value> {
    match expr {
        ValueExpr::Literal(literal) => Ok(literal.to_json()),
        ValueExpr::Field(source) => read_source(source, sources),
    }
}

fn read_source(source: &SourcePath, sources: Sources<'_>) -> Result<Value> {
    let (root, name) = match source.root {
        SourceRoot::Imp => (sources.imp, "imp"),
        SourceRoot::ImpExt => (sources.imp_ext, "impExt"),
        SourceRoot::Request => (sources.request, "bidRequest"),
    };
    let mut current = root.ok_or_else(|| Error::NullDereference {
        expression: name.to_string(),
    })?;

    for (i, segment) in source.path.segments().iter().enumerate() {
        current = match current {
            Value::Object(map) => map.get(segment).unwrap_or(&Value::Null),
            Value::Null => {
                let reached = SourcePath {
                    root: source.root,
                    path: source.path.prefix(i),
                };
                return Err(Error::NullDereference {
                    expression: if i == 0 {
                        name.to_string()
                    } else {
                        render_mutation_value(&ValueExpr::Field(reached))
                    },
                });
            }
            _ => {
                return Err(Error::InvalidObjectGraph(format!(
                    "cannot read '{}' of a non-object in {}",
                    segment,
                    render_mutation_value(&ValueExpr::Field(source.clone()))
                )));
            }
        };
    }

    Ok(current.clone())
}

fn original_at<'a>(base: &'a Map<String, Value>, path: &FieldPath) -> Option<&'a Value> {
    let mut segments = path.segments().iter();
    let first = segments.next()?;
    let mut current = base.get(first.as_str()).filter(|v| !v.is_null())?;
    for segment in segments {
        current = current.get(segment.as_str()).filter(|v| !v.is_null())?;
    }
    Some(current)
}

fn builder_mut<'a>(
    builders: &'a mut HashMap<FieldPath, Map<String, Value>>,
    path: &FieldPath,
) -> Result<&'a mut Map<String, Value>> {
    builders
        .get_mut(path)
        .ok_or_else(|| Error::InvalidObjectGraph(format!("no open builder for {}", path)))
}

fn set_field(map: &mut Map<String, Value>, field: &str, value: Value) {
    if value.is_null() {
        map.remove(field);
    } else {
        map.insert(field.to_string(), value);
    }
}

fn bidder_ext(imp: &Value) -> Option<&Value> {
    imp.get("ext")
        .and_then(|ext| ext.get("bidder"))
        .filter(|bidder| !bidder.is_null())
}

fn as_object<'a>(value: &'a Value, name: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::InvalidObjectGraph(format!("{} is not an object", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::expectation::synthesize_expected;
    use crate::ir::Transformation;
    use crate::path::{PathResolver, Scope};
    use crate::synthesizer::synthesize;
    use rstest::rstest;
    use serde_json::json;

    fn stat(scope: Scope, target: &str, value: Value) -> Transformation {
        let path = PathResolver::new(scope).resolve_target(target).unwrap();
        Transformation::with_static(target, path, value)
    }

    fn copy(scope: Scope, target: &str, from: &str) -> Transformation {
        let resolver = PathResolver::new(scope);
        let path = resolver.resolve_target(target).unwrap();
        let source = resolver.resolve_source(target, from).unwrap();
        Transformation::with_copy(target, path, source)
    }

    fn compile(imp: Vec<Transformation>, request: Vec<Transformation>) -> CompiledTransformations {
        let imp = classify(imp, Scope::Impression).unwrap();
        let request = classify(request, Scope::Request).unwrap();
        CompiledTransformations {
            imp: (!imp.is_empty()).then(|| synthesize(&imp).unwrap()),
            request: (!request.is_empty()).then(|| synthesize(&request).unwrap()),
            expected: synthesize_expected(&imp, &request).unwrap(),
        }
    }

    fn base_request() -> Value {
        json!({
            "id": "req-1",
            "imp": [{
                "id": "123",
                "tagid": "old-tag",
                "banner": {"w": 100, "h": 50, "pos": 3},
                "ext": {"bidder": {"placementId": "pl-1", "siteId": 7}}
            }],
            "site": {
                "page": "https://example.com",
                "content": {"title": "Old", "len": 10},
                "publisher": {"id": "pub"}
            },
            "app": {"bundle": "com.example"},
            "tmax": 1000
        })
    }

    #[test]
    fn test_single_static_sets_only_target() {
        let compiled = compile(vec![stat(Scope::Impression, "imp.banner.w", json!(640))], vec![]);
        let result = run_pipeline(&compiled, &base_request()).unwrap();

        let mut expected = base_request();
        expected["imp"][0]["banner"]["w"] = json!(640);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_missing_nested_object_starts_empty() {
        let compiled = compile(vec![stat(Scope::Impression, "imp.video.w", json!(300))], vec![]);
        let result = run_pipeline(&compiled, &base_request()).unwrap();
        assert_eq!(result["imp"][0]["video"], json!({"w": 300}));
        assert_eq!(result["imp"][0]["banner"], base_request()["imp"][0]["banner"]);
    }

    #[test]
    fn test_copy_from_imp_ext_into_raw_ext() {
        let compiled = compile(
            vec![copy(Scope::Impression, "imp.ext.placementId", "impExt.placementId")],
            vec![],
        );
        let result = run_pipeline(&compiled, &base_request()).unwrap();
        assert_eq!(result["imp"][0]["ext"]["placementId"], json!("pl-1"));
        assert_eq!(result["imp"][0]["ext"]["bidder"]["siteId"], json!(7));
    }

    #[test]
    fn test_request_copy_from_first_imp_ext() {
        let compiled = compile(
            vec![],
            vec![copy(Scope::Request, "site.publisher.id", "impExt.siteId")],
        );
        let result = run_pipeline(&compiled, &base_request()).unwrap();
        assert_eq!(result["site"]["publisher"]["id"], json!(7));
        assert_eq!(result["site"]["page"], json!("https://example.com"));
    }

    #[test]
    fn test_copy_of_missing_leaf_clears_target() {
        let compiled = compile(
            vec![],
            vec![copy(Scope::Request, "site.page", "bidRequest.site.keywords")],
        );
        let result = run_pipeline(&compiled, &base_request()).unwrap();
        assert!(result["site"].get("page").is_none());
    }

    #[test]
    fn test_copy_through_missing_object_fails() {
        let compiled = compile(
            vec![],
            vec![copy(Scope::Request, "site.page", "user.geo.country")],
        );
        let err = run_pipeline(&compiled, &base_request()).unwrap_err();
        match err {
            Error::NullDereference { expression } => assert_eq!(expression, "bidRequest.getUser()"),
            other => panic!("Expected NullDereference, got {other:?}"),
        }
        assert!(matches!(
            evaluate_expected(&compiled.expected, &base_request()),
            Err(Error::NullDereference { .. })
        ));
    }

    #[test]
    fn test_request_program_without_imps_fails_on_ext_lookup() {
        let compiled = compile(vec![], vec![copy(Scope::Request, "tmax", "impExt.siteId")]);
        let err = run_pipeline(&compiled, &json!({"imp": []})).unwrap_err();
        assert!(matches!(err, Error::NullDereference { .. }));
    }

    #[test]
    fn test_rejects_non_object_request() {
        let compiled = compile(vec![], vec![]);
        assert!(matches!(
            run_pipeline(&compiled, &json!([1, 2])),
            Err(Error::InvalidObjectGraph(_))
        ));
    }

    #[test]
    fn test_duplicate_targets_last_write_wins() {
        let compiled = compile(
            vec![],
            vec![
                stat(Scope::Request, "tmax", json!(1)),
                stat(Scope::Request, "tmax", json!(2)),
            ],
        );
        let result = run_pipeline(&compiled, &base_request()).unwrap();
        assert_eq!(result["tmax"], json!(2));
    }

    fn depth_cases() -> Vec<(Vec<Transformation>, Vec<Transformation>)> {
        let i = Scope::Impression;
        let r = Scope::Request;
        vec![
            // depth 1
            (vec![stat(i, "imp.tagid", json!("t"))], vec![stat(r, "tmax", json!(500))]),
            // depth 2, arity 2
            (
                vec![stat(i, "imp.banner.w", json!(300)), stat(i, "imp.banner.h", json!(250))],
                vec![stat(r, "site.page", json!("p")), copy(r, "site.domain", "app.bundle")],
            ),
            // depth 3, arity N
            (
                vec![
                    copy(i, "imp.banner.pos", "imp.banner.h"),
                    stat(i, "imp.banner.w", json!(1)),
                    copy(i, "imp.ext.placementId", "impExt.placementId"),
                    stat(i, "imp.video.minduration", json!(5)),
                ],
                vec![
                    stat(r, "site.content.title", json!("New")),
                    copy(r, "site.content.len", "bidRequest.site.content.len"),
                    copy(r, "site.publisher.id", "impExt.placementId"),
                    stat(r, "app.publisher.name", json!("n")),
                    stat(r, "user.ext.consent", json!("c")),
                    copy(r, "device.geo.country", "site.page"),
                ],
            ),
        ]
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    fn test_pipeline_matches_expectation(#[case] index: usize) {
        let (imp, request) = depth_cases().swap_remove(index);
        let compiled = compile(imp, request);

        let base = base_request();
        let actual = run_pipeline(&compiled, &base).unwrap();
        let expected = evaluate_expected(&compiled.expected, &base).unwrap();
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    fn test_pipeline_matches_expectation_on_sparse_request(#[case] index: usize) {
        let (imp, request) = depth_cases().swap_remove(index);
        let compiled = compile(imp, request);

        let base = json!({
            "imp": [{"id": "1", "banner": {"h": 90}, "ext": {"bidder": {"placementId": "p"}}}],
            "site": {"page": "https://s", "content": {}},
            "app": {}
        });
        let actual = run_pipeline(&compiled, &base).unwrap();
        let expected = evaluate_expected(&compiled.expected, &base).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_idempotent_for_disjoint_paths() {
        let compiled = compile(
            vec![
                stat(Scope::Impression, "imp.banner.w", json!(640)),
                copy(Scope::Impression, "imp.tagid", "impExt.placementId"),
            ],
            vec![
                stat(Scope::Request, "site.content.title", json!("t")),
                copy(Scope::Request, "device.ua", "app.bundle"),
            ],
        );
        let once = run_pipeline(&compiled, &base_request()).unwrap();
        let twice = run_pipeline(&compiled, &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_copies_are_not_shared_with_source() {
        let compiled = compile(vec![], vec![copy(Scope::Request, "device.ext", "site.content")]);
        let result = run_pipeline(&compiled, &base_request()).unwrap();
        assert_eq!(result["device"]["ext"], json!({"title": "Old", "len": 10}));
        assert_eq!(result["site"]["content"], json!({"title": "Old", "len": 10}));
    }
}
