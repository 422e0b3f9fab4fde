//! Test fixture synthesis
//!
//! Derives the bid request a generated test starts from: every field a
//! transformation copies from gets a sample value, and the first
//! impression carries a fully populated bidder extension. The fixture is
//! available both as JSON and as the Java that builds it.

use bidgen_core::{BidderParam, ParamType};
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;

use crate::classifier::group_by_segment;
use crate::ir::{BidderIR, NestedKind, ValueSource};
use crate::java::{RenderContext, kind_of};
use crate::naming::{EXT_FIELD, java_string};
use crate::path::{FieldPath, SourceRoot};

/// Id of the fixture impression
pub const IMP_ID: &str = "123";

/// OpenRTB fields holding integers; every other sampled field gets a string
pub const INTEGER_FIELDS: &[&str] = &[
    "w",
    "h",
    "at",
    "pos",
    "topframe",
    "minduration",
    "maxduration",
    "startdelay",
    "placement",
    "sequence",
    "minbitrate",
    "maxbitrate",
    "secure",
    "tmax",
    "len",
];

/// A sampled field
#[derive(Debug, Clone, PartialEq)]
pub struct SampleField {
    /// Path from the owning object
    pub path: FieldPath,
    /// Sample value
    pub value: Value,
}

/// A sampled extension param
#[derive(Debug, Clone, PartialEq)]
pub struct SampleParam {
    /// The declared param
    pub param: BidderParam,
    /// Sample value
    pub value: Value,
}

/// The given request of a generated test
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fixture {
    /// Fields set on the impression
    pub imp_fields: Vec<SampleField>,

    /// Fields set on the request
    pub request_fields: Vec<SampleField>,

    /// Bidder extension params, in declaration order
    pub ext: Vec<SampleParam>,
}

/// Java fragments building the fixture
#[derive(Debug, Clone, PartialEq)]
pub struct GivenRequest {
    /// `Function<Imp.ImpBuilder, Imp.ImpBuilder>` argument
    pub imp_customizer: String,

    /// `Function<BidRequest.BidRequestBuilder, BidRequest.BidRequestBuilder>` argument
    pub request_customizer: String,

    /// Value of the bidder part of `ExtPrebid.of(null, ...)`
    pub ext: String,
}

/// Build the fixture for a bidder
///
/// Impression fields under `ext` are left out, the bidder extension owns
/// that object. A sampled path that is a prefix of another sampled path
/// is dropped in favour of the deeper one.
pub fn synthesize_fixture(ir: &BidderIR) -> Fixture {
    let mut imp_paths: IndexMap<FieldPath, ()> = IndexMap::new();
    let mut request_paths: IndexMap<FieldPath, ()> = IndexMap::new();

    for t in ir.imp.iter().chain(ir.request.iter()) {
        let ValueSource::Copy(source) = &t.value else {
            continue;
        };
        match source.root {
            SourceRoot::Imp if source.path.first() != EXT_FIELD => {
                imp_paths.insert(source.path.clone(), ());
            }
            SourceRoot::Request => {
                request_paths.insert(source.path.clone(), ());
            }
            _ => {}
        }
    }

    let mut counter = 1;
    let imp_fields = sample_fields(imp_paths.keys(), &mut counter);
    let request_fields = sample_fields(request_paths.keys(), &mut counter);

    let mut counter = 1;
    let ext = ir
        .params()
        .iter()
        .map(|param| {
            let value = sample_param(param, counter);
            if param.param_type.is_numeric() {
                counter += 1;
            }
            SampleParam {
                param: param.clone(),
                value,
            }
        })
        .collect();

    Fixture {
        imp_fields,
        request_fields,
        ext,
    }
}

fn sample_fields<'a>(paths: impl Iterator<Item = &'a FieldPath>, counter: &mut i64) -> Vec<SampleField> {
    let all: Vec<&FieldPath> = paths.collect();
    let mut fields = Vec::new();
    for path in &all {
        let shadowed = all
            .iter()
            .any(|other| other.depth() > path.depth() && other.prefix(path.depth()) == **path);
        if shadowed {
            continue;
        }

        let leaf = path.leaf();
        let value = if INTEGER_FIELDS.contains(&leaf) {
            Value::Number((*counter).into())
        } else {
            Value::String(format!("{}String", leaf))
        };
        *counter += 1;
        fields.push(SampleField {
            path: (*path).clone(),
            value,
        });
    }
    fields
}

fn sample_param(param: &BidderParam, n: i64) -> Value {
    match param.param_type {
        ParamType::String => Value::String(format!("{}String", param.name)),
        ParamType::Integer | ParamType::Long => Value::Number(n.into()),
        ParamType::Double | ParamType::Float => Number::from_f64(n as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ParamType::Boolean => Value::Bool(true),
    }
}

impl Fixture {
    /// The fixture as a JSON bid request with a single impression
    pub fn to_bid_request(&self) -> Value {
        let mut imp = Map::new();
        imp.insert("id".to_string(), Value::String(IMP_ID.to_string()));
        for field in &self.imp_fields {
            set_path(&mut imp, &field.path, field.value.clone());
        }

        let bidder: Map<String, Value> = self
            .ext
            .iter()
            .map(|p| (p.param.name.clone(), p.value.clone()))
            .collect();
        let mut ext = Map::new();
        ext.insert("bidder".to_string(), Value::Object(bidder));
        imp.insert(EXT_FIELD.to_string(), Value::Object(ext));

        let mut request = Map::new();
        request.insert("imp".to_string(), Value::Array(vec![Value::Object(imp)]));
        for field in &self.request_fields {
            set_path(&mut request, &field.path, field.value.clone());
        }
        Value::Object(request)
    }

    /// Model classes the Java fixture builds, for imports
    pub fn model_classes(&self) -> BTreeSet<String> {
        let mut classes = BTreeSet::new();
        for field in self.imp_fields.iter().chain(self.request_fields.iter()) {
            for depth in 1..field.path.depth() {
                if let NestedKind::Model { class } = kind_of(&field.path.prefix(depth)) {
                    classes.insert(class);
                }
            }
        }
        classes
    }

    /// Whether the Java fixture builds JSON nodes
    pub fn uses_json_nodes(&self) -> bool {
        self.imp_fields
            .iter()
            .chain(self.request_fields.iter())
            .any(|f| (1..f.path.depth()).any(|d| kind_of(&f.path.prefix(d)).is_json()))
    }

    /// Java fragments building the fixture
    pub fn render_given(&self, ctx: &RenderContext) -> GivenRequest {
        GivenRequest {
            imp_customizer: customizer("impBuilder", &self.imp_fields),
            request_customizer: customizer("requestBuilder", &self.request_fields),
            ext: self.render_ext(ctx),
        }
    }

    fn render_ext(&self, ctx: &RenderContext) -> String {
        if self.ext.is_empty() {
            return "mapper.createObjectNode()".to_string();
        }

        if self.ext.len() > 4 {
            let calls: String = self
                .ext
                .iter()
                .map(|p| format!(".{}({})", p.param.name, param_literal(p)))
                .collect();
            format!("{}.builder(){}.build()", ctx.ext_class, calls)
        } else {
            let args: Vec<String> = self.ext.iter().map(param_literal).collect();
            format!("{}.of({})", ctx.ext_class, args.join(", "))
        }
    }
}

fn customizer(var: &str, fields: &[SampleField]) -> String {
    if fields.is_empty() {
        return "identity()".to_string();
    }
    let refs: Vec<&SampleField> = fields.iter().collect();
    format!("{} -> {}{}", var, var, render_level(&refs, 0, None))
}

fn render_level(fields: &[&SampleField], index: usize, parent: Option<&NestedKind>) -> String {
    let in_json = matches!(parent, Some(NestedKind::JsonNode));
    let mut calls = String::new();

    for (name, items) in group_by_segment(fields, index, |f| &f.path) {
        if let Some(leaf) = items.iter().find(|f| f.path.depth() == index + 1) {
            let value = value_literal(&leaf.value);
            if in_json {
                calls.push_str(&format!(".put({}, {})", java_string(&name), value));
            } else {
                calls.push_str(&format!(".{}({})", name, value));
            }
            continue;
        }

        let kind = NestedKind::of_field(&name, parent);
        let inner = render_level(&items, index + 1, Some(&kind));
        let object = match &kind {
            NestedKind::Model { class } => format!("{}.builder(){}.build()", class, inner),
            NestedKind::JsonNode => format!("mapper.createObjectNode(){}", inner),
        };
        if in_json {
            calls.push_str(&format!(".<ObjectNode>set({}, {})", java_string(&name), object));
        } else {
            calls.push_str(&format!(".{}({})", name, object));
        }
    }
    calls
}

fn value_literal(value: &Value) -> String {
    match value {
        Value::String(s) => java_string(s),
        other => other.to_string(),
    }
}

fn param_literal(sample: &SampleParam) -> String {
    let n = sample.value.as_f64().unwrap_or_default() as i64;
    match sample.param.param_type {
        ParamType::String => value_literal(&sample.value),
        ParamType::Integer => n.to_string(),
        ParamType::Long => format!("{}L", n),
        ParamType::Double => format!("{}.0", n),
        ParamType::Float => format!("{}.0F", n),
        ParamType::Boolean => "true".to_string(),
    }
}

fn set_path(map: &mut Map<String, Value>, path: &FieldPath, value: Value) {
    let segments = path.segments();
    let mut current = map;
    for segment in &segments[..segments.len() - 1] {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(path.leaf().to_string(), value);
}
