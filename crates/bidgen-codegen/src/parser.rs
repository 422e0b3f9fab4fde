//! Description to IR parser
//!
//! Parses a bidder description into the intermediate representation:
//! transformations are split by scope and their target and source paths
//! resolved.

use bidgen_core::{BidderDescription, BidderParam, RawTransformation};
use std::path::Path;

use crate::error::{Error, Result};
use crate::ir::{BidderIR, Transformation};
use crate::path::{PathResolver, Scope, SourceRoot};

/// Parser for bidder description files
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser;

impl Parser {
    /// Create a new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse a description file (`.yaml`, `.yml` or `.json`) into IR
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<BidderIR> {
        let description = BidderDescription::load(path)?;
        self.convert_to_ir(description)
    }

    /// Parse a YAML description into IR
    pub fn parse_yaml(&self, yaml: &str) -> Result<BidderIR> {
        let description = BidderDescription::from_yaml_str(yaml)?;
        self.convert_to_ir(description)
    }

    /// Parse a JSON description into IR
    pub fn parse_json(&self, json: &str) -> Result<BidderIR> {
        let description = BidderDescription::from_json_str(json)?;
        self.convert_to_ir(description)
    }

    /// Convert a validated description into IR
    pub fn convert_to_ir(&self, description: BidderDescription) -> Result<BidderIR> {
        let mut imp = Vec::new();
        let mut request = Vec::new();

        for raw in &description.transformations {
            let scope = Scope::of_target(&raw.target);
            let transformation = resolve_transformation(raw, scope)?;
            check_ext_source(&transformation, &description.bidder_params)?;

            match scope {
                Scope::Impression => imp.push(transformation),
                Scope::Request => request.push(transformation),
            }
        }

        tracing::debug!(
            bidder = %description.bidder_name,
            imp = imp.len(),
            request = request.len(),
            "Parsed bidder description"
        );

        Ok(BidderIR {
            name: description.bidder_name.clone(),
            description,
            imp,
            request,
        })
    }
}

/// Resolve one raw transformation in the given scope
///
/// Exactly one of `staticValue` and `from` must be present.
pub fn resolve_transformation(raw: &RawTransformation, scope: Scope) -> Result<Transformation> {
    let resolver = PathResolver::new(scope);

    match (&raw.static_value, &raw.from) {
        (Some(_), Some(_)) => Err(Error::InvalidTransformation {
            target: raw.target.clone(),
            message: "staticValue and from are mutually exclusive".to_string(),
        }),
        (None, None) => Err(Error::InvalidTransformation {
            target: raw.target.clone(),
            message: "one of staticValue or from is required".to_string(),
        }),
        (Some(value), None) => {
            let target = resolver.resolve_target(&raw.target)?;
            Ok(Transformation::with_static(&raw.target, target, value.clone()))
        }
        (None, Some(from)) => {
            let target = resolver.resolve_target(&raw.target)?;
            let source = resolver.resolve_source(&raw.target, from)?;
            Ok(Transformation::with_copy(&raw.target, target, source))
        }
    }
}

/// Check that an extension-sourced copy names a declared bidder param
fn check_ext_source(t: &Transformation, params: &[BidderParam]) -> Result<()> {
    let crate::ir::ValueSource::Copy(source) = &t.value else {
        return Ok(());
    };
    if source.root != SourceRoot::ImpExt {
        return Ok(());
    }

    if source.path.depth() > 1 {
        return Err(Error::UnsupportedTransformation {
            target: t.raw_target.clone(),
            message: format!(
                "extension source '{}' must name a single bidder param",
                source.path
            ),
        });
    }
    if !params.iter().any(|p| p.name == source.path.leaf()) {
        return Err(Error::InvalidTransformation {
            target: t.raw_target.clone(),
            message: format!("'{}' is not a declared bidder param", source.path),
        });
    }
    Ok(())
}
