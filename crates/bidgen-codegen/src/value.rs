//! Value resolution
//!
//! Turns the value side of a transformation into a [`ValueExpr`] and
//! renders value expressions as Java for both generated artifacts.

use bidgen_core::{BidderParam, ParamType};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::ir::{Literal, Transformation, ValueExpr, ValueSource};
use crate::naming::{getter, java_string};
use crate::path::{SourcePath, SourceRoot};

/// Access to the first impression of the given request in test code
pub const FIRST_IMP: &str = "bidRequest.getImp().get(0)";

/// Resolve the value written by a transformation
///
/// Only numbers and strings are accepted as literals.
pub fn resolve_value(t: &Transformation) -> Result<ValueExpr> {
    match &t.value {
        ValueSource::Copy(source) => Ok(ValueExpr::Field(source.clone())),
        ValueSource::Static(value) => match value {
            Value::Number(n) => Ok(ValueExpr::Literal(Literal::Number(n.clone()))),
            Value::String(s) => Ok(ValueExpr::Literal(Literal::Text(s.clone()))),
            other => Err(Error::UnsupportedValueType {
                target: t.raw_target.clone(),
                kind: json_kind(other),
            }),
        },
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Java literal
pub fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Number(n) => n.to_string(),
        Literal::Text(s) => java_string(s),
    }
}

/// Java expression for a value inside `modifyImp` / `modifyRequest`
pub fn render_mutation_value(expr: &ValueExpr) -> String {
    match expr {
        ValueExpr::Literal(literal) => render_literal(literal),
        ValueExpr::Field(source) => {
            let base = match source.root {
                SourceRoot::Imp => "imp",
                SourceRoot::ImpExt => "impExt",
                SourceRoot::Request => "bidRequest",
            };
            getter_chain(base, source)
        }
    }
}

/// Java expression for a value inside the test's expected request
///
/// Fields are read from the given request. Extension fields are read from
/// the first impression's raw `ext.bidder` node with the accessor matching
/// the param's declared type.
pub fn render_expected_value(expr: &ValueExpr, params: &[BidderParam]) -> String {
    match expr {
        ValueExpr::Literal(literal) => render_literal(literal),
        ValueExpr::Field(source) => match source.root {
            SourceRoot::Imp => getter_chain(FIRST_IMP, source),
            SourceRoot::Request => getter_chain("bidRequest", source),
            SourceRoot::ImpExt => {
                let mut expr = format!("{}.getExt().get(\"bidder\")", FIRST_IMP);
                for segment in source.path.segments() {
                    expr.push_str(&format!(".get({})", java_string(segment)));
                }
                let param_type = params
                    .iter()
                    .find(|p| p.name == source.path.leaf())
                    .map(|p| p.param_type);
                if param_type.is_none() {
                    tracing::warn!(
                        param = %source.path,
                        "Undeclared bidder param, reading it as text"
                    );
                }
                expr.push_str(&format!(".{}()", node_accessor(param_type)));
                expr
            }
        },
    }
}

/// Jackson `JsonNode` accessor for a declared param type
pub fn node_accessor(param_type: Option<ParamType>) -> &'static str {
    match param_type {
        Some(ParamType::Integer) => "intValue",
        Some(ParamType::Long) => "longValue",
        Some(ParamType::Double) => "doubleValue",
        Some(ParamType::Float) => "floatValue",
        Some(ParamType::Boolean) => "booleanValue",
        Some(ParamType::String) | None => "textValue",
    }
}

fn getter_chain(base: &str, source: &SourcePath) -> String {
    let mut expr = base.to_string();
    for segment in source.path.segments() {
        expr.push('.');
        expr.push_str(&getter(segment));
        expr.push_str("()");
    }
    expr
}
