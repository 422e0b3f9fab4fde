//! bidgen CLI
//!
//! Developer tool that scaffolds OpenRTB bidder adapters from bidder
//! descriptions.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// bidgen - bidder adapter generator
#[derive(Parser)]
#[command(name = "bidgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file or project directory
    #[arg(short, long, default_value = "bidgen.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new bidgen project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Generate Java sources for bidders
    Generate {
        /// Generate a specific bidder only
        #[arg(short, long)]
        bidder: Option<String>,

        /// Rewrite files even when unchanged
        #[arg(long)]
        force: bool,

        /// Report what would be written without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration and bidder descriptions without writing
    Validate,

    /// Print the generated sources of a bidder
    Show {
        /// Bidder name
        bidder: String,

        /// Print only the file with this name (e.g. FooBidder.java)
        #[arg(short, long)]
        file: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref())?;
        }
        Commands::Generate {
            bidder,
            force,
            dry_run,
        } => {
            commands::generate::run(&cli.config, bidder.as_deref(), force, dry_run)?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config)?;
        }
        Commands::Show { bidder, file } => {
            commands::show::run(&cli.config, &bidder, file.as_deref())?;
        }
    }

    Ok(())
}
