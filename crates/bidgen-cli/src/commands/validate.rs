//! Validate configuration and bidder descriptions

use anyhow::{Context, Result};
use bidgen_codegen::Parser;
use bidgen_core::Config;

/// Run the validate command
///
/// Every description is parsed and its transformations compiled; nothing
/// is written.
pub fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Output directory: {}", config.output_dir().display());

    let paths = config
        .description_paths()
        .context("Failed to list bidder descriptions")?;
    let parser = Parser::new();
    let mut failures = 0;

    for path in &paths {
        let result = parser
            .parse_file(path)
            .and_then(|ir| ir.compile().map(|compiled| (ir, compiled)));
        match result {
            Ok((ir, compiled)) => {
                let statements: usize = compiled
                    .imp
                    .iter()
                    .chain(compiled.request.iter())
                    .map(|p| p.set_count())
                    .sum();
                tracing::info!(
                    "✓ {} ({} transformations, {} assignments)",
                    ir.name,
                    ir.imp.len() + ir.request.len(),
                    statements
                );
            }
            Err(e) => {
                failures += 1;
                tracing::error!("✗ {}: {}", path.display(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} bidder descriptions are invalid", failures, paths.len());
    }

    tracing::info!("✓ {} bidder descriptions are valid", paths.len());
    Ok(())
}
