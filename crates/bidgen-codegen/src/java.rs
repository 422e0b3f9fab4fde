//! Java rendering
//!
//! Renders compiled programs as Java source fragments: the `modifyImp` and
//! `modifyRequest` overrides of the bidder class and the `expectedRequest`
//! statement of its test. Fragments are complete members or statements,
//! indented for their place in the templates.

use bidgen_core::{BidderDescription, BidderParam, CodegenConfig};
use std::collections::BTreeSet;

use crate::ir::{
    BuilderRef, CompiledTransformations, ExpectedObject, ExpectedProgram, ExpectedRoot, MutationOp,
    MutationProgram, NestedKind, Override, ValueExpr,
};
use crate::naming::{builder_var, ext_class, getter, java_string, local_var};
use crate::path::{FieldPath, Scope};
use crate::value::{FIRST_IMP, render_expected_value, render_mutation_value};

/// Utility that incrementally constructs Java source code with indentation handling
#[derive(Debug, Default, Clone)]
pub struct JavaSourceBuilder {
    content: String,
    indent_level: usize,
    indent: String,
}

impl JavaSourceBuilder {
    /// Create a builder using `indent` as the indentation unit
    pub fn new(indent: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            indent_level: 0,
            indent: indent.into(),
        }
    }

    /// Start at the given indentation level
    pub fn at_level(mut self, level: usize) -> Self {
        self.indent_level = level;
        self
    }

    /// Append an indented line
    pub fn push_line(&mut self, line: &str) {
        if !line.is_empty() {
            self.push_indent();
            self.content.push_str(line);
        }
        self.content.push('\n');
    }

    /// Append a line at `extra` levels deeper than the current one
    pub fn push_continuation(&mut self, extra: usize, line: &str) {
        self.indent_level += extra;
        self.push_line(line);
        self.indent_level -= extra;
    }

    fn push_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.content.push_str(&self.indent);
        }
    }

    /// Increase indentation
    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    /// Decrease indentation
    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    /// Finish and return the source text
    pub fn build(self) -> String {
        self.content
    }
}

/// Per-bidder rendering settings
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Indentation unit
    pub indent: String,

    /// Simple name of the impression extension class, `Void` without params
    pub ext_class: String,

    /// Declared extension params
    pub params: Vec<BidderParam>,
}

impl RenderContext {
    /// Context for one bidder
    pub fn new(config: &CodegenConfig, description: &BidderDescription) -> Self {
        let ext_class = if description.bidder_params.is_empty() {
            "Void".to_string()
        } else {
            ext_class(&description.bidder_name)
        };
        Self {
            indent: config.indent.clone(),
            ext_class,
            params: description.bidder_params.clone(),
        }
    }
}

/// Kind of the nested object at `path`, as decided level by level
pub fn kind_of(path: &FieldPath) -> NestedKind {
    let mut kind: Option<NestedKind> = None;
    for segment in path.segments() {
        kind = Some(NestedKind::of_field(segment, kind.as_ref()));
    }
    kind.unwrap_or(NestedKind::JsonNode)
}

/// Model classes referenced by the compiled programs, for imports
pub fn model_classes(compiled: &CompiledTransformations) -> BTreeSet<String> {
    let mut classes = BTreeSet::new();
    for program in compiled.imp.iter().chain(compiled.request.iter()) {
        for op in &program.ops {
            if let MutationOp::Open {
                kind: NestedKind::Model { class },
                ..
            } = op
            {
                classes.insert(class.clone());
            }
        }
    }
    collect_expected_classes(&compiled.expected.request, &mut classes);
    classes
}

fn collect_expected_classes(object: &ExpectedObject, classes: &mut BTreeSet<String>) {
    for step in &object.steps {
        if let NestedKind::Model { class } = &step.kind {
            classes.insert(class.clone());
        }
    }
    for item in &object.overrides {
        match item {
            Override::Object { object, .. } => collect_expected_classes(object, classes),
            Override::SingleImp(first_imp) => collect_expected_classes(first_imp, classes),
            Override::Value { .. } => {}
        }
    }
}

/// Render the `modifyImp` override
pub fn render_modify_imp(program: &MutationProgram, ctx: &RenderContext) -> String {
    let mut java = JavaSourceBuilder::new(&ctx.indent).at_level(1);
    java.push_line("@Override");
    java.push_line(&format!(
        "protected Imp modifyImp(Imp imp, {} impExt) {{",
        ctx.ext_class
    ));
    java.indent();
    java.push_line("final Imp.ImpBuilder impBuilder = imp.toBuilder();");
    render_ops(&mut java, program, ctx);
    java.push_line("");
    java.push_line("return impBuilder.build();");
    java.dedent();
    java.push_line("}");
    java.build()
}

/// Render the `modifyRequest` override
pub fn render_modify_request(program: &MutationProgram, ctx: &RenderContext) -> String {
    let mut java = JavaSourceBuilder::new(&ctx.indent).at_level(1);
    java.push_line("@Override");
    java.push_line(
        "protected void modifyRequest(BidRequest bidRequest, BidRequest.BidRequestBuilder requestBuilder,",
    );
    java.push_continuation(
        2,
        &format!("List<ImpWithExt<{}>> impsWithExts) {{", ctx.ext_class),
    );
    java.indent();
    render_ops(&mut java, program, ctx);
    java.dedent();
    java.push_line("}");
    java.build()
}

fn render_ops(java: &mut JavaSourceBuilder, program: &MutationProgram, ctx: &RenderContext) {
    let scope = program.scope;
    for (index, op) in program.ops.iter().enumerate() {
        match op {
            MutationOp::LocateImpExt => {
                java.push_line(&format!(
                    "final {} impExt = impsWithExts.get(0).getImpExt();",
                    ctx.ext_class
                ));
            }
            MutationOp::Open { path, kind } => {
                // modifyImp always opens with the impBuilder declaration
                if index > 0 || scope == Scope::Impression {
                    java.push_line("");
                }
                render_open(java, scope, path, kind);
            }
            MutationOp::Set {
                builder,
                field,
                value,
            } => {
                let (var, kind) = builder_of(scope, builder);
                let rendered = render_mutation_value(value);
                java.push_line(&format!("{};", write_call(&var, &kind, field, value, &rendered)));
            }
            MutationOp::Commit { path } => {
                let child = builder_var(path);
                let child_expr = match kind_of(path) {
                    NestedKind::Model { .. } => format!("{}.build()", child),
                    NestedKind::JsonNode => child,
                };
                let parent = if path.depth() == 1 {
                    BuilderRef::Root
                } else {
                    BuilderRef::Nested(path.prefix(path.depth() - 1))
                };
                let (var, kind) = builder_of(scope, &parent);
                let line = match kind {
                    NestedKind::Model { .. } => format!("{}.{}({});", var, path.leaf(), child_expr),
                    NestedKind::JsonNode => format!(
                        "{}.set({}, {});",
                        var,
                        java_string(path.leaf()),
                        child_expr
                    ),
                };
                java.push_line(&line);
            }
        }
    }
}

fn render_open(java: &mut JavaSourceBuilder, scope: Scope, path: &FieldPath, kind: &NestedKind) {
    let var = local_var(path);
    let field = path.leaf();
    let local_type = match kind {
        NestedKind::Model { class } => class.as_str(),
        NestedKind::JsonNode => "ObjectNode",
    };

    if path.depth() == 1 {
        java.push_line(&format!(
            "final {} {} = {}.{}();",
            local_type,
            var,
            scope.base_var(),
            getter(field)
        ));
    } else {
        let parent_path = path.prefix(path.depth() - 1);
        let parent = local_var(&parent_path);
        match kind_of(&parent_path) {
            NestedKind::Model { .. } => java.push_line(&format!(
                "final {} {} = {} != null ? {}.{}() : null;",
                local_type,
                var,
                parent,
                parent,
                getter(field)
            )),
            NestedKind::JsonNode => {
                let node = format!("{}Node", var);
                java.push_line(&format!(
                    "final JsonNode {} = {} != null ? {}.get({}) : null;",
                    node,
                    parent,
                    parent,
                    java_string(field)
                ));
                java.push_line(&format!(
                    "final ObjectNode {} = {} != null && {}.isObject() ? (ObjectNode) {} : null;",
                    var, node, node, node
                ));
            }
        }
    }

    let builder = builder_var(path);
    match kind {
        NestedKind::Model { class } => java.push_line(&format!(
            "final {}.{}Builder {} = {} != null ? {}.toBuilder() : {}.builder();",
            class, class, builder, var, var, class
        )),
        NestedKind::JsonNode => java.push_line(&format!(
            "final ObjectNode {} = {} != null ? {}.deepCopy() : mapper.createObjectNode();",
            builder, var, var
        )),
    }
}

fn builder_of(scope: Scope, builder: &BuilderRef) -> (String, NestedKind) {
    match builder {
        BuilderRef::Root => (
            scope.builder_var().to_string(),
            NestedKind::Model {
                class: String::new(),
            },
        ),
        BuilderRef::Nested(path) => (builder_var(path), kind_of(path)),
    }
}

/// A field write on a builder or JSON node, without the trailing `;`
fn write_call(target: &str, kind: &NestedKind, field: &str, value: &ValueExpr, rendered: &str) -> String {
    match (kind, value) {
        (NestedKind::Model { .. }, _) => format!("{}.{}({})", target, field, rendered),
        (NestedKind::JsonNode, ValueExpr::Literal(_)) => {
            format!("{}.put({}, {})", target, java_string(field), rendered)
        }
        (NestedKind::JsonNode, ValueExpr::Field(_)) => format!(
            "{}.set({}, mapper.valueToTree({}))",
            target,
            java_string(field),
            rendered
        ),
    }
}

/// Render the `expectedRequest` declaration at the given indentation level
pub fn render_expected(expected: &ExpectedProgram, ctx: &RenderContext, level: usize) -> String {
    let lines = object_lines(&expected.request, ctx);
    let mut java = JavaSourceBuilder::new(&ctx.indent).at_level(level);
    let last = lines.len() - 1;
    for (i, (depth, text)) in lines.iter().enumerate() {
        let mut line = if i == 0 {
            format!("final BidRequest expectedRequest = {}", text)
        } else {
            text.clone()
        };
        if i == last {
            line.push(';');
        }
        java.push_continuation(*depth, &line);
    }
    java.build()
}

type Lines = Vec<(usize, String)>;

fn object_lines(object: &ExpectedObject, ctx: &RenderContext) -> Lines {
    let mut lines = seed_lines(object);
    let kind = object.kind();

    for item in &object.overrides {
        match item {
            Override::Value { field, value } => {
                let rendered = render_expected_value(value, &ctx.params);
                let call = match (&kind, value) {
                    (NestedKind::Model { .. }, _) => format!(".{}({})", field, rendered),
                    (NestedKind::JsonNode, ValueExpr::Literal(_)) => {
                        format!(".put({}, {})", java_string(field), rendered)
                    }
                    (NestedKind::JsonNode, ValueExpr::Field(_)) => format!(
                        ".<ObjectNode>set({}, mapper.valueToTree({}))",
                        java_string(field),
                        rendered
                    ),
                };
                lines.push((2, call));
            }
            Override::Object { field, object } => {
                let open = match kind {
                    NestedKind::Model { .. } => format!(".{}(", field),
                    NestedKind::JsonNode => format!(".<ObjectNode>set({}, ", java_string(field)),
                };
                nest(&mut lines, &open, object_lines(object, ctx), ")");
            }
            Override::SingleImp(first_imp) => {
                nest(&mut lines, ".imp(singletonList(", object_lines(first_imp, ctx), "))");
            }
        }
    }

    if let NestedKind::Model { .. } = kind {
        lines.push((2, ".build()".to_string()));
    }
    lines
}

fn nest(lines: &mut Lines, open: &str, child: Lines, close: &str) {
    let last = child.len() - 1;
    for (i, (depth, text)) in child.into_iter().enumerate() {
        let mut text = if i == 0 { format!("{}{}", open, text) } else { text };
        if i == last {
            text.push_str(close);
        }
        lines.push((depth + 2, text));
    }
}

fn seed_lines(object: &ExpectedObject) -> Lines {
    let base = match object.root {
        ExpectedRoot::Request => "bidRequest",
        ExpectedRoot::FirstImp => FIRST_IMP,
    };

    let Some((first, rest)) = object.steps.split_first() else {
        return vec![(0, format!("{}.toBuilder()", base))];
    };

    let mut lines = vec![(0, format!("Optional.ofNullable({}.{}())", base, getter(&first.field)))];
    let mut parent = &first.kind;
    for step in rest {
        match parent {
            NestedKind::Model { class } => {
                lines.push((2, format!(".map({}::{})", class, getter(&step.field))));
            }
            NestedKind::JsonNode => {
                lines.push((2, format!(".map(node -> node.get({}))", java_string(&step.field))));
                lines.push((2, ".filter(JsonNode::isObject)".to_string()));
                lines.push((2, ".map(ObjectNode.class::cast)".to_string()));
            }
        }
        parent = &step.kind;
    }

    match parent {
        NestedKind::Model { class } => {
            lines.push((2, format!(".map({}::toBuilder)", class)));
            lines.push((2, format!(".orElseGet({}::builder)", class)));
        }
        NestedKind::JsonNode => {
            lines.push((2, ".map(ObjectNode::deepCopy)".to_string()));
            lines.push((2, ".orElseGet(mapper::createObjectNode)".to_string()));
        }
    }
    lines
}
