//! Java source generation
//!
//! Renders a bidder's compiled transformations into the files of an
//! adapter: the bidder class, its impression extension class and a unit
//! test, plus the adapter's `bidder-config` properties and its params
//! JSON schema. Fragments with non-trivial structure come from
//! [`crate::java`]; the surrounding boilerplate is kept in embedded
//! minijinja templates.

use bidgen_core::{CodegenConfig, ParamType};
use minijinja::{AutoEscape, Environment, context};
use serde::Serialize;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::Result;
use crate::fixture::{IMP_ID, synthesize_fixture};
use crate::ir::{BidderIR, CompiledTransformations, ExpectedObject, MutationOp, Override};
use crate::java::{
    RenderContext, kind_of, model_classes, render_expected, render_modify_imp,
    render_modify_request,
};
use crate::naming::{bidder_class, capitalize, java_string};

const BIDDER_TEMPLATE: &str = "bidder.java";
const EXT_TEMPLATE: &str = "ext_imp.java";
const TEST_TEMPLATE: &str = "bidder_test.java";
const CONFIG_TEMPLATE: &str = "bidder_config.yaml";

/// Params above which the extension class gets a Lombok builder
const BUILDER_THRESHOLD: usize = 4;

/// A generated file, relative to the output root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the server project root
    pub path: PathBuf,

    /// File contents
    pub contents: String,
}

/// All files generated for one bidder
#[derive(Debug, Clone)]
pub struct GeneratedBidder {
    /// Bidder name
    pub name: String,

    /// Generated files
    pub files: Vec<GeneratedFile>,

    /// The compiled programs the files were rendered from
    pub compiled: CompiledTransformations,

    /// SHA-256 over every file path and its contents
    pub fingerprint: String,
}

impl GeneratedBidder {
    /// Look up a generated file by its file name
    pub fn file(&self, name: &str) -> Option<&GeneratedFile> {
        self.files
            .iter()
            .find(|f| f.path.file_name().is_some_and(|n| n == name))
    }
}

#[derive(Serialize)]
struct ParamView {
    name: String,
    java_type: &'static str,
}

/// Java source generator
pub struct Generator {
    config: CodegenConfig,
    env: Environment<'static>,
}

impl Generator {
    /// Create a generator with the embedded templates
    pub fn new(config: CodegenConfig) -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template(BIDDER_TEMPLATE, include_str!("../templates/bidder.java.j2"))?;
        env.add_template(EXT_TEMPLATE, include_str!("../templates/ext_imp.java.j2"))?;
        env.add_template(TEST_TEMPLATE, include_str!("../templates/bidder_test.java.j2"))?;
        env.add_template(CONFIG_TEMPLATE, include_str!("../templates/bidder_config.yaml.j2"))?;
        Ok(Self { config, env })
    }

    /// Compile and render every file of a bidder
    pub fn generate(&self, ir: &BidderIR) -> Result<GeneratedBidder> {
        let compiled = ir.compile()?;
        let ctx = RenderContext::new(&self.config, &ir.description);
        let package = self.bidder_package(ir);
        let class = bidder_class(&ir.name);

        let mut files = vec![GeneratedFile {
            path: java_path("main", &package, &class),
            contents: self.render_bidder(ir, &compiled, &ctx, &package, &class)?,
        }];

        if !ir.params().is_empty() {
            let ext_package = self.ext_package(ir);
            files.push(GeneratedFile {
                path: java_path("main", &ext_package, &ctx.ext_class),
                contents: self.render_ext(ir, &ctx, &ext_package)?,
            });
        }

        files.push(GeneratedFile {
            path: java_path("test", &package, &format!("{}Test", class)),
            contents: self.render_test(ir, &compiled, &ctx, &package, &class)?,
        });

        let lower = ir.name.to_lowercase();
        files.push(GeneratedFile {
            path: PathBuf::from("src/main/resources/bidder-config").join(format!("{}.yaml", lower)),
            contents: self.render_config(ir)?,
        });
        files.push(GeneratedFile {
            path: PathBuf::from("src/main/resources/static/bidder-params").join(format!("{}.json", lower)),
            contents: render_schema(ir),
        });

        let fingerprint = fingerprint(&files);
        tracing::debug!(
            bidder = %ir.name,
            files = files.len(),
            fingerprint = %fingerprint,
            "Generated bidder sources"
        );

        Ok(GeneratedBidder {
            name: ir.name.clone(),
            files,
            compiled,
            fingerprint,
        })
    }

    fn render_bidder(
        &self,
        ir: &BidderIR,
        compiled: &CompiledTransformations,
        ctx: &RenderContext,
        package: &str,
        class: &str,
    ) -> Result<String> {
        let model = &self.config.model_package;
        let mut imports = BTreeSet::new();
        let mut java_imports = BTreeSet::new();

        imports.insert(format!("{}.OpenrtbBidder", self.config.bidder_package));
        for name in model_classes(compiled) {
            imports.insert(format!("{}.{}", model, name));
        }
        if compiled.imp.is_some() {
            imports.insert(format!("{}.Imp", model));
        }
        if compiled.request.is_some() {
            imports.insert(format!("{}.BidRequest", model));
            imports.insert(format!("{}.model.ImpWithExt", self.config.bidder_package));
            java_imports.insert("java.util.List".to_string());
        }
        if !ir.params().is_empty() {
            imports.insert(format!("{}.{}", self.ext_package(ir), ctx.ext_class));
        }
        if compiled.uses_json_nodes() {
            imports.insert("com.fasterxml.jackson.databind.ObjectMapper".to_string());
            imports.insert("com.fasterxml.jackson.databind.node.ObjectNode".to_string());
        }
        if reads_nested_json(compiled) {
            imports.insert("com.fasterxml.jackson.databind.JsonNode".to_string());
        }

        let template = self.env.get_template(BIDDER_TEMPLATE)?;
        let rendered = template.render(context! {
            package => package,
            imports => imports,
            java_imports => java_imports,
            bidder_name => ir.name,
            bidder_class => class,
            ext_class => ctx.ext_class,
            strategy => ir.description.strategy.as_str(),
            uses_mapper => compiled.uses_json_nodes(),
            modify_imp => compiled.imp.as_ref().map(|p| render_modify_imp(p, ctx)),
            modify_request => compiled.request.as_ref().map(|p| render_modify_request(p, ctx)),
        })?;
        Ok(rendered)
    }

    fn render_ext(&self, ir: &BidderIR, ctx: &RenderContext, package: &str) -> Result<String> {
        let params: Vec<ParamView> = ir
            .params()
            .iter()
            .map(|p| ParamView {
                name: p.name.clone(),
                java_type: p.param_type.java_type(),
            })
            .collect();

        let template = self.env.get_template(EXT_TEMPLATE)?;
        let rendered = template.render(context! {
            package => package,
            bidder_name => ir.name,
            ext_class => ctx.ext_class,
            use_builder => params.len() > BUILDER_THRESHOLD,
            params => params,
        })?;
        Ok(rendered)
    }

    fn render_test(
        &self,
        ir: &BidderIR,
        compiled: &CompiledTransformations,
        ctx: &RenderContext,
        package: &str,
        class: &str,
    ) -> Result<String> {
        let fixture = synthesize_fixture(ir);
        let given = fixture.render_given(ctx);
        let model = &self.config.model_package;
        let bidder_model = format!("{}.model", self.config.bidder_package);

        let mut imports: BTreeSet<String> = [
            format!("{}.BidRequest", model),
            format!("{}.Imp", model),
            format!("{}.HttpRequest", bidder_model),
            format!("{}.Result", bidder_model),
            "org.junit.Before".to_string(),
            "org.junit.Test".to_string(),
            "org.prebid.server.VertxTest".to_string(),
            "org.prebid.server.proto.openrtb.ext.ExtPrebid".to_string(),
        ]
        .into_iter()
        .collect();
        for name in model_classes(compiled).union(&fixture.model_classes()) {
            imports.insert(format!("{}.{}", model, name));
        }
        if !ir.params().is_empty() {
            imports.insert(format!("{}.{}", self.ext_package(ir), ctx.ext_class));
        }
        if compiled.uses_json_nodes() || fixture.uses_json_nodes() {
            imports.insert("com.fasterxml.jackson.databind.JsonNode".to_string());
            imports.insert("com.fasterxml.jackson.databind.node.ObjectNode".to_string());
        }

        let mut java_imports: BTreeSet<String> =
            ["java.io.IOException", "java.util.List", "java.util.function.Function"]
                .into_iter()
                .map(String::from)
                .collect();
        if has_nested_override(&compiled.expected.request) {
            java_imports.insert("java.util.Optional".to_string());
        }

        let mut static_imports = vec!["java.util.Collections.singletonList".to_string()];
        if given.imp_customizer == "identity()" || given.request_customizer == "identity()" {
            static_imports.push("java.util.function.Function.identity".to_string());
        }
        static_imports.push("org.assertj.core.api.Assertions.assertThat".to_string());

        let template = self.env.get_template(TEST_TEMPLATE)?;
        let rendered = template.render(context! {
            package => package,
            imports => imports,
            java_imports => java_imports,
            static_imports => static_imports,
            test_class => format!("{}Test", class),
            bidder_class => class,
            bidder_var => lower_first(class),
            endpoint_url => java_string(&ir.description.properties.endpoint_url),
            imp_id => java_string(IMP_ID),
            imp_customizer => given.imp_customizer,
            request_customizer => given.request_customizer,
            ext => given.ext,
            expected => render_expected(&compiled.expected, ctx, 2),
        })?;
        Ok(rendered)
    }

    fn render_config(&self, ir: &BidderIR) -> Result<String> {
        let description = &ir.description;
        let meta = &description.meta_info;
        let usersync_url = format!(
            "{}{}",
            description.properties.usersyncer_url.as_deref().unwrap_or_default(),
            description.usersyncer.url_params.as_deref().unwrap_or_default()
        );
        let cookie_family = description
            .usersyncer
            .cookie_family_name
            .as_deref()
            .unwrap_or(ir.name.as_str());

        let template = self.env.get_template(CONFIG_TEMPLATE)?;
        let rendered = template.render(context! {
            bidder_name => ir.name.to_lowercase(),
            endpoint_url => yaml_string(&description.properties.endpoint_url),
            maintainer_email => yaml_string(meta.maintainer_email.as_deref().unwrap_or_default()),
            app_media_types => meta.app_media_types.iter().map(|t| yaml_string(t)).collect::<Vec<_>>(),
            site_media_types => meta.site_media_types.iter().map(|t| yaml_string(t)).collect::<Vec<_>>(),
            vendor_id => meta.vendor_id.unwrap_or(0),
            usersync_url => yaml_string(&usersync_url),
            cookie_family_name => yaml_string(cookie_family),
        })?;
        Ok(rendered)
    }

    fn bidder_package(&self, ir: &BidderIR) -> String {
        format!("{}.{}", self.config.bidder_package, ir.name.to_lowercase())
    }

    fn ext_package(&self, ir: &BidderIR) -> String {
        format!("{}.{}", self.config.ext_package, ir.name.to_lowercase())
    }
}

/// JSON schema validating the bidder's `imp[].ext.bidder` object
fn render_schema(ir: &BidderIR) -> String {
    let properties: Map<String, Value> = ir
        .params()
        .iter()
        .map(|p| {
            let schema = json!({
                "type": json_type(p.param_type),
                "description": format!("{} parameter", p.name),
            });
            (p.name.clone(), schema)
        })
        .collect();

    let schema = json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "title": format!("{} Adapter Params", capitalize(&ir.name)),
        "description": format!("A schema which validates params accepted by the {} adapter", capitalize(&ir.name)),
        "type": "object",
        "properties": properties,
    });
    format!("{:#}\n", schema)
}

fn json_type(param_type: ParamType) -> &'static str {
    match param_type {
        ParamType::String => "string",
        ParamType::Integer | ParamType::Long => "integer",
        ParamType::Double | ParamType::Float => "number",
        ParamType::Boolean => "boolean",
    }
}

/// A double-quoted YAML scalar
fn yaml_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn java_path(source_set: &str, package: &str, class: &str) -> PathBuf {
    let mut path = PathBuf::from("src").join(source_set).join("java");
    for part in package.split('.') {
        path.push(part);
    }
    path.push(format!("{}.java", class));
    path
}

fn fingerprint(files: &[GeneratedFile]) -> String {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.path.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(file.contents.as_bytes());
        hasher.update([0]);
    }
    hex::encode(hasher.finalize())
}

/// Whether a mutation program reads a JSON child of a JSON node
fn reads_nested_json(compiled: &CompiledTransformations) -> bool {
    compiled
        .imp
        .iter()
        .chain(compiled.request.iter())
        .flat_map(|p| p.ops.iter())
        .any(|op| match op {
            MutationOp::Open { path, .. } if path.depth() > 1 => {
                kind_of(&path.prefix(path.depth() - 1)).is_json()
            }
            _ => false,
        })
}

fn has_nested_override(object: &ExpectedObject) -> bool {
    object.overrides.iter().any(|item| match item {
        Override::Object { .. } => true,
        Override::SingleImp(first_imp) => has_nested_override(first_imp),
        Override::Value { .. } => false,
    })
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
