//! Bidder compiler
//!
//! Turns bidder description files into Java sources written under the
//! server project root.

use bidgen_core::CodegenConfig;
use bidgen_core::config::is_description_file;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::generator::{GeneratedBidder, Generator};
use crate::ir::BidderIR;
use crate::parser::Parser;

/// Options for the compiler
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Root of the server project generated files are written into
    pub output_dir: PathBuf,

    /// Rewrite files even when their contents are unchanged
    pub force: bool,

    /// Generate without writing anything
    pub dry_run: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            force: false,
            dry_run: false,
        }
    }
}

/// Description-to-Java compiler
pub struct Compiler {
    options: CompileOptions,
    parser: Parser,
    generator: Generator,
}

impl Compiler {
    /// Create a new compiler with the given options
    pub fn new(options: CompileOptions, config: CodegenConfig) -> Result<Self> {
        Ok(Self {
            options,
            parser: Parser::new(),
            generator: Generator::new(config)?,
        })
    }

    /// Compile one description file
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompiledBidder> {
        let path = path.as_ref();
        tracing::info!("Compiling bidder: {}", path.display());
        let ir = self.parser.parse_file(path)?;
        self.compile_ir(&ir)
    }

    /// Compile an already parsed bidder
    pub fn compile_ir(&self, ir: &BidderIR) -> Result<CompiledBidder> {
        let generated = self.generator.generate(ir)?;
        let mut written = Vec::new();
        let mut skipped = Vec::new();

        for file in &generated.files {
            let target = self.options.output_dir.join(&file.path);

            if !self.options.force && is_unchanged(&target, &file.contents) {
                tracing::debug!("Unchanged, skipping: {}", target.display());
                skipped.push(target);
                continue;
            }
            if self.options.dry_run {
                tracing::debug!("Dry run, not writing: {}", target.display());
                written.push(target);
                continue;
            }

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, &file.contents)?;
            tracing::debug!("Wrote {}", target.display());
            written.push(target);
        }

        tracing::info!(
            bidder = %ir.name,
            written = written.len(),
            skipped = skipped.len(),
            "Compiled bidder"
        );

        Ok(CompiledBidder {
            name: ir.name.clone(),
            hash: ir.content_hash(),
            generated,
            written,
            skipped,
        })
    }

    /// Compile every description in a directory
    pub fn compile_all(&self, bidders_dir: impl AsRef<Path>) -> Result<Vec<CompiledBidder>> {
        let bidders_dir = bidders_dir.as_ref();
        let mut paths = Vec::new();
        for entry in walkdir::WalkDir::new(bidders_dir).max_depth(1) {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() && is_description_file(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        paths.sort();

        paths.iter().map(|path| self.compile_file(path)).collect()
    }
}

fn is_unchanged(path: &Path, contents: &str) -> bool {
    std::fs::read_to_string(path).is_ok_and(|existing| existing == contents)
}

/// Result of compiling one bidder
#[derive(Debug)]
pub struct CompiledBidder {
    /// Bidder name
    pub name: String,

    /// Hash of the bidder IR
    pub hash: String,

    /// Everything that was generated
    pub generated: GeneratedBidder,

    /// Files written (or that would be written on a dry run)
    pub written: Vec<PathBuf>,

    /// Files left alone because their contents were unchanged
    pub skipped: Vec<PathBuf>,
}

impl CompiledBidder {
    /// Whether any file was written
    pub fn changed(&self) -> bool {
        !self.written.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FOO: &str = "bidderName: foo
properties:
  endpointUrl: https://foo
bidderParams:
  - name: siteId
    type: Integer
transformations:
  - target: imp.banner.w
    staticValue: 300
  - target: tmax
    staticValue: 500
";

    fn setup() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let bidders = dir.path().join("bidders");
        std::fs::create_dir_all(&bidders).unwrap();
        std::fs::write(bidders.join("foo.yaml"), FOO).unwrap();
        (dir, bidders)
    }

    fn compiler(out: &Path, force: bool) -> Compiler {
        let options = CompileOptions {
            output_dir: out.to_path_buf(),
            force,
            ..CompileOptions::default()
        };
        Compiler::new(options, CodegenConfig::default()).unwrap()
    }

    #[test]
    fn test_compile_options_default() {
        let opts = CompileOptions::default();
        assert!(!opts.force);
        assert!(!opts.dry_run);
        assert_eq!(opts.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_compile_writes_files() {
        let (dir, bidders) = setup();
        let out = dir.path().join("server");
        let compiled = compiler(&out, false).compile_file(bidders.join("foo.yaml")).unwrap();

        assert_eq!(compiled.name, "foo");
        assert_eq!(compiled.written.len(), 5);
        assert!(compiled.skipped.is_empty());

        let bidder = out.join("src/main/java/org/prebid/server/bidder/foo/FooBidder.java");
        let contents = std::fs::read_to_string(bidder).unwrap();
        assert!(contents.contains("public class FooBidder extends OpenrtbBidder<ExtImpFoo>"));
    }

    #[test]
    fn test_unchanged_files_are_skipped() {
        let (dir, bidders) = setup();
        let out = dir.path().join("server");
        compiler(&out, false).compile_all(&bidders).unwrap();

        let second = compiler(&out, false).compile_all(&bidders).unwrap();
        assert_eq!(second.len(), 1);
        assert!(!second[0].changed());
        assert_eq!(second[0].skipped.len(), 5);

        let forced = compiler(&out, true).compile_all(&bidders).unwrap();
        assert_eq!(forced[0].written.len(), 5);
    }

    #[test]
    fn test_changed_description_rewrites() {
        let (dir, bidders) = setup();
        let out = dir.path().join("server");
        let first = compiler(&out, false).compile_all(&bidders).unwrap();

        std::fs::write(bidders.join("foo.yaml"), FOO.replace("500", "800")).unwrap();
        let second = compiler(&out, false).compile_all(&bidders).unwrap();
        assert_ne!(first[0].hash, second[0].hash);
        assert_ne!(first[0].generated.fingerprint, second[0].generated.fingerprint);
        // ext class, properties and schema do not depend on transformations
        assert_eq!(second[0].skipped.len(), 3);
        assert_eq!(second[0].written.len(), 2);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let (dir, bidders) = setup();
        let out = dir.path().join("server");
        let options = CompileOptions {
            output_dir: out.clone(),
            dry_run: true,
            ..CompileOptions::default()
        };
        let compiled = Compiler::new(options, CodegenConfig::default())
            .unwrap()
            .compile_all(&bidders)
            .unwrap();
        assert_eq!(compiled[0].written.len(), 5);
        assert!(!out.exists());
    }

    #[test]
    fn test_compile_all_ignores_other_files() {
        let (dir, bidders) = setup();
        std::fs::write(bidders.join("README.md"), "# bidders").unwrap();
        let compiled = compiler(&dir.path().join("server"), false)
            .compile_all(&bidders)
            .unwrap();
        assert_eq!(compiled.len(), 1);
    }

    #[test]
    fn test_missing_bidders_dir_fails() {
        let dir = TempDir::new().unwrap();
        let result = compiler(&dir.path().join("server"), false).compile_all(dir.path().join("missing"));
        assert!(matches!(result, Err(crate::error::Error::Io(_))));
    }

    #[test]
    fn test_invalid_description_fails() {
        let (dir, bidders) = setup();
        std::fs::write(
            bidders.join("bad.yaml"),
            "bidderName: bad\nproperties:\n  endpointUrl: x\ntransformations:\n  - target: imp.a.b.c\n    staticValue: 1\n",
        )
        .unwrap();
        let result = compiler(&dir.path().join("server"), false).compile_all(&bidders);
        assert!(matches!(
            result,
            Err(crate::error::Error::UnsupportedTransformation { .. })
        ));
    }
}
