//! Generate bidder sources

use anyhow::{Context, Result};
use bidgen_codegen::{CompileOptions, CompiledBidder, Compiler, Parser};
use bidgen_core::Config;

/// Run the generate command
pub fn run(config_path: &str, bidder: Option<&str>, force: bool, dry_run: bool) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    let options = CompileOptions {
        output_dir: config.output_dir(),
        force,
        dry_run,
    };
    let compiler = Compiler::new(options, config.project.codegen.clone())
        .context("Failed to set up code generation")?;

    let results = match bidder {
        Some(name) => {
            let description = config
                .load_description(name)
                .with_context(|| format!("Bidder not found: {}", name))?;
            let ir = Parser::new()
                .convert_to_ir(description)
                .with_context(|| format!("Invalid bidder description: {}", name))?;
            vec![
                compiler
                    .compile_ir(&ir)
                    .with_context(|| format!("Failed to generate bidder {}", name))?,
            ]
        }
        None => {
            let bidders_dir = config.bidders_dir();
            tracing::info!("Generating all bidders in {}", bidders_dir.display());
            compiler
                .compile_all(&bidders_dir)
                .context("Failed to generate bidders")?
        }
    };

    for compiled in &results {
        report(compiled, dry_run);
    }

    tracing::info!("Generated {} bidders", results.len());
    Ok(())
}

fn report(compiled: &CompiledBidder, dry_run: bool) {
    let verb = if dry_run { "would write" } else { "wrote" };
    tracing::info!(
        "✓ {} ({} {}, {} unchanged, fingerprint: {}...)",
        compiled.name,
        verb,
        compiled.written.len(),
        compiled.skipped.len(),
        &compiled.generated.fingerprint[..8]
    );
    for path in &compiled.written {
        tracing::info!("  {}", path.display());
    }
}
