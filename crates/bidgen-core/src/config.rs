//! Configuration parsing and validation
//!
//! This module handles loading bidgen project configuration.
//!
//! # Configuration Files
//!
//! - `bidgen.yaml` - Project root configuration
//! - `bidders/*.yaml|*.yml|*.json` - Individual bidder descriptions

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::description::BidderDescription;
use crate::error::{Error, Result};

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "bidgen.yaml";

/// Root project configuration from `bidgen.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Root of the server project that generated files are written into
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory holding bidder descriptions, relative to the project
    #[serde(default = "default_bidders_dir")]
    pub bidders_dir: String,

    /// Code generation settings
    #[serde(default)]
    pub codegen: CodegenConfig,
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_bidders_dir() -> String {
    "bidders".to_string()
}

/// Settings that shape generated Java sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Indentation unit
    #[serde(default = "default_indent")]
    pub indent: String,

    /// Package of the OpenRTB request model classes
    #[serde(default = "default_model_package")]
    pub model_package: String,

    /// Parent package of generated bidder classes
    #[serde(default = "default_bidder_package")]
    pub bidder_package: String,

    /// Parent package of generated impression extension classes
    #[serde(default = "default_ext_package")]
    pub ext_package: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            model_package: default_model_package(),
            bidder_package: default_bidder_package(),
            ext_package: default_ext_package(),
        }
    }
}

fn default_indent() -> String {
    "    ".to_string()
}

fn default_model_package() -> String {
    "com.iab.openrtb.request".to_string()
}

fn default_bidder_package() -> String {
    "org.prebid.server.bidder".to_string()
}

fn default_ext_package() -> String {
    "org.prebid.server.proto.openrtb.ext.request".to_string()
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or bidgen.yaml file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-project")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(CONFIG_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;

        if project.codegen.indent.chars().any(|c| c != ' ' && c != '\t') {
            return Err(Error::ConfigInvalid {
                message: "codegen.indent may only contain spaces or tabs".to_string(),
            });
        }

        Ok(Self { project, base_path })
    }

    /// Directory holding bidder descriptions
    pub fn bidders_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.bidders_dir)
    }

    /// Root directory generated files are written into
    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.output_dir)
    }

    /// Paths of all bidder descriptions, sorted by file name
    pub fn description_paths(&self) -> Result<Vec<PathBuf>> {
        let dir = self.bidders_dir();
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_description_file(p))
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Load all bidder descriptions from the bidders directory
    pub fn load_descriptions(&self) -> Result<Vec<BidderDescription>> {
        self.description_paths()?
            .iter()
            .map(|path| {
                tracing::debug!("Loading bidder description {}", path.display());
                BidderDescription::load(path)
            })
            .collect()
    }

    /// Load the description of a single bidder by name
    pub fn load_description(&self, bidder: &str) -> Result<BidderDescription> {
        let dir = self.bidders_dir();
        for ext in ["yaml", "yml", "json"] {
            let path = dir.join(format!("{}.{}", bidder, ext));
            if path.exists() {
                return BidderDescription::load(&path);
            }
        }
        Err(Error::ConfigNotFound {
            path: dir.join(format!("{}.yaml", bidder)).display().to_string(),
        })
    }
}

/// Whether a path looks like a bidder description file
pub fn is_description_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml" || ext == "json")
}
