//! Intermediate Representation for transformations
//!
//! A bidder description is parsed into a [`BidderIR`], whose resolved
//! [`Transformation`]s are compiled into two independent artifacts:
//!
//! - a [`MutationProgram`] per scope, the statement sequence of
//!   `modifyImp` / `modifyRequest`
//! - an [`ExpectedProgram`], the declarative override tree behind the
//!   test's `expectedRequest`
//!
//! Both are rendered to Java by [`crate::java`] and can be evaluated over
//! JSON object graphs by [`crate::interpreter`].

use bidgen_core::{BidderDescription, BidderParam};
use serde_json::Value;

use crate::classifier::classify;
use crate::error::Result;
use crate::expectation::synthesize_expected;
use crate::naming::{self, EXT_FIELD};
use crate::path::{FieldPath, Scope, SourcePath};
use crate::synthesizer::synthesize;

/// Intermediate representation of a complete bidder
#[derive(Debug, Clone)]
pub struct BidderIR {
    /// Bidder name as written in the description
    pub name: String,

    /// The validated description, kept for adapter metadata
    pub description: BidderDescription,

    /// Resolved impression-scope transformations, in input order
    pub imp: Vec<Transformation>,

    /// Resolved request-scope transformations, in input order
    pub request: Vec<Transformation>,
}

impl BidderIR {
    /// Declared impression extension params
    pub fn params(&self) -> &[BidderParam] {
        &self.description.bidder_params
    }

    /// Compile both scopes and the expectation
    pub fn compile(&self) -> Result<CompiledTransformations> {
        let imp = classify(self.imp.clone(), Scope::Impression)?;
        let request = classify(self.request.clone(), Scope::Request)?;

        let expected = synthesize_expected(&imp, &request)?;
        let imp_program = if imp.is_empty() {
            None
        } else {
            Some(synthesize(&imp)?)
        };
        let request_program = if request.is_empty() {
            None
        } else {
            Some(synthesize(&request)?)
        };

        Ok(CompiledTransformations {
            imp: imp_program,
            request: request_program,
            expected,
        })
    }

    /// Get a hash of the IR for change detection
    pub fn content_hash(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.description.strategy.as_str().as_bytes());
        hasher.update(self.description.properties.endpoint_url.as_bytes());
        hasher.update(format!("{:?}", self.description.bidder_params).as_bytes());
        hasher.update(format!("{:?}", self.imp).as_bytes());
        hasher.update(format!("{:?}", self.request).as_bytes());

        hex::encode(hasher.finalize())
    }
}

/// A transformation with resolved paths
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    /// Target exactly as written, for error reporting
    pub raw_target: String,

    /// Target path with the scope marker stripped
    pub target: FieldPath,

    /// What gets written
    pub value: ValueSource,
}

impl Transformation {
    /// Literal-valued transformation
    pub fn with_static(raw_target: impl Into<String>, target: FieldPath, value: Value) -> Self {
        Self {
            raw_target: raw_target.into(),
            target,
            value: ValueSource::Static(value),
        }
    }

    /// Copy transformation
    pub fn with_copy(raw_target: impl Into<String>, target: FieldPath, source: SourcePath) -> Self {
        Self {
            raw_target: raw_target.into(),
            target,
            value: ValueSource::Copy(source),
        }
    }

    /// Whether this writes a literal
    pub fn is_static(&self) -> bool {
        matches!(self.value, ValueSource::Static(_))
    }

    /// Whether this is a `staticValue: null` record, which writes nothing
    pub fn is_noop(&self) -> bool {
        matches!(self.value, ValueSource::Static(Value::Null))
    }
}

/// Value side of a transformation
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// Literal from `staticValue`
    Static(Value),
    /// Field copied from `from`
    Copy(SourcePath),
}

/// A literal accepted by the compiler
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Number, kept exactly as written
    Number(serde_json::Number),
    /// String
    Text(String),
}

impl Literal {
    /// JSON form of the literal
    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Resolved right-hand side of a field write
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    /// Literal value
    Literal(Literal),
    /// Read of another field
    Field(SourcePath),
}

/// Kind of a nested object that is rebuilt rather than assigned
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NestedKind {
    /// Lombok model object with `toBuilder()` / `builder()`
    Model {
        /// Simple class name
        class: String,
    },
    /// Jackson `ObjectNode`, mutated through `put` / `set`
    JsonNode,
}

impl NestedKind {
    /// Kind of `field` when nested under an object of kind `parent`
    ///
    /// `ext` is always a raw JSON node, as is everything beneath one.
    pub fn of_field(field: &str, parent: Option<&NestedKind>) -> Self {
        if field == EXT_FIELD || matches!(parent, Some(NestedKind::JsonNode)) {
            Self::JsonNode
        } else {
            Self::Model {
                class: naming::class_name(field),
            }
        }
    }

    /// Whether this is a JSON node
    pub fn is_json(&self) -> bool {
        matches!(self, Self::JsonNode)
    }
}

/// Builder a `Set` writes into
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuilderRef {
    /// The scope's top-level builder
    Root,
    /// Builder opened for the nested object at this path
    Nested(FieldPath),
}

/// One step of a mutation program
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOp {
    /// Bind the first impression's parsed extension (request scope only)
    LocateImpExt,

    /// Read the original object at `path` and open a builder seeded from it
    Open {
        /// Path of the nested object
        path: FieldPath,
        /// How the object is rebuilt
        kind: NestedKind,
    },

    /// Write a value into a builder
    Set {
        /// Builder written into
        builder: BuilderRef,
        /// Field name
        field: String,
        /// Value written
        value: ValueExpr,
    },

    /// Finish the builder at `path` and store it into its parent builder
    Commit {
        /// Path of the nested object
        path: FieldPath,
    },
}

/// Statement sequence for one scope's mutation method
#[derive(Debug, Clone, PartialEq)]
pub struct MutationProgram {
    /// Scope the program mutates
    pub scope: Scope,

    /// Steps in execution order
    pub ops: Vec<MutationOp>,
}

impl MutationProgram {
    /// Whether the program reads the first impression's parsed extension
    pub fn locates_imp_ext(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, MutationOp::LocateImpExt))
    }

    /// Whether any nested object is a JSON node
    pub fn uses_json_nodes(&self) -> bool {
        self.ops
            .iter()
            .any(|op| matches!(op, MutationOp::Open { kind: NestedKind::JsonNode, .. }))
    }

    /// Number of field writes
    pub fn set_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, MutationOp::Set { .. }))
            .count()
    }
}

/// Object a node of the expectation tree is seeded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedRoot {
    /// The given bid request
    Request,
    /// The given request's first impression
    FirstImp,
}

/// One field on the path from an [`ExpectedRoot`] to a nested object
#[derive(Debug, Clone, PartialEq)]
pub struct NestedStep {
    /// Field name
    pub field: String,
    /// Kind of the object stored in it
    pub kind: NestedKind,
}

/// An object of the expected request: an original copy with overrides applied
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedObject {
    /// Where the original is read from
    pub root: ExpectedRoot,

    /// Fields leading from the root to this object, empty for the root itself
    pub steps: Vec<NestedStep>,

    /// Field overrides, in application order
    pub overrides: Vec<Override>,
}

impl ExpectedObject {
    /// An object with no overrides
    pub fn new(root: ExpectedRoot, steps: Vec<NestedStep>) -> Self {
        Self {
            root,
            steps,
            overrides: Vec::new(),
        }
    }

    /// Kind of this object
    pub fn kind(&self) -> NestedKind {
        match (self.steps.last(), self.root) {
            (Some(step), _) => step.kind.clone(),
            (None, ExpectedRoot::Request) => NestedKind::Model {
                class: "BidRequest".to_string(),
            },
            (None, ExpectedRoot::FirstImp) => NestedKind::Model {
                class: "Imp".to_string(),
            },
        }
    }
}

/// A field override in the expectation tree
#[derive(Debug, Clone, PartialEq)]
pub enum Override {
    /// Field set to a value
    Value {
        /// Field name
        field: String,
        /// Value written
        value: ValueExpr,
    },
    /// Field replaced by a rebuilt nested object
    Object {
        /// Field name
        field: String,
        /// The rebuilt object
        object: ExpectedObject,
    },
    /// `imp` replaced by a one-element list holding the rebuilt first impression
    SingleImp(Box<ExpectedObject>),
}

/// Declarative description of the request a test expects
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedProgram {
    /// The rebuilt bid request
    pub request: ExpectedObject,
}

impl ExpectedProgram {
    /// Whether the expectation equals the given request unchanged
    pub fn is_identity(&self) -> bool {
        self.request.overrides.is_empty()
    }
}

/// Everything compiled from one bidder's transformations
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTransformations {
    /// `modifyImp` program, absent when no impression-scope transformation applies
    pub imp: Option<MutationProgram>,

    /// `modifyRequest` program, absent when no request-scope transformation applies
    pub request: Option<MutationProgram>,

    /// Test expectation
    pub expected: ExpectedProgram,
}

impl CompiledTransformations {
    /// Whether the request program needs the parsed extensions of the impressions
    pub fn needs_imps_with_exts(&self) -> bool {
        self.request
            .as_ref()
            .is_some_and(MutationProgram::locates_imp_ext)
    }

    /// Whether any generated code mutates JSON nodes
    pub fn uses_json_nodes(&self) -> bool {
        self.imp.as_ref().is_some_and(MutationProgram::uses_json_nodes)
            || self
                .request
                .as_ref()
                .is_some_and(MutationProgram::uses_json_nodes)
    }
}
