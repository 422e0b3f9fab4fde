//! Print generated sources

use anyhow::{Context, Result};
use bidgen_codegen::{Generator, Parser};
use bidgen_core::Config;

/// Run the show command
pub fn run(config_path: &str, bidder: &str, file: Option<&str>) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    let description = config
        .load_description(bidder)
        .with_context(|| format!("Bidder not found: {}", bidder))?;
    let ir = Parser::new()
        .convert_to_ir(description)
        .with_context(|| format!("Invalid bidder description: {}", bidder))?;
    let generated = Generator::new(config.project.codegen.clone())?
        .generate(&ir)
        .with_context(|| format!("Failed to generate bidder {}", bidder))?;

    match file {
        Some(name) => {
            let file = generated
                .file(name)
                .with_context(|| format!("No generated file named {}", name))?;
            print!("{}", file.contents);
        }
        None => {
            for file in &generated.files {
                println!("// ==> {} <==", file.path.display());
                print!("{}", file.contents);
                println!();
            }
        }
    }

    Ok(())
}
