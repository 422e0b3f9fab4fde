//! bidgen Core Library
//!
//! This crate provides the input side of bidgen:
//! - Bidder description parsing and validation
//! - Project configuration (`bidgen.yaml`)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Config    │────▶│   Bidder    │────▶│   Codegen   │
//! │   (YAML)    │     │ Description │     │  (bidgen-   │
//! └─────────────┘     └─────────────┘     │   codegen)  │
//!                                         └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use bidgen_core::Config;
//!
//! let config = Config::load("./bidgen.yaml")?;
//! for bidder in config.load_descriptions()? {
//!     println!("Bidder: {}", bidder.bidder_name);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod description;
pub mod error;

pub use config::{CodegenConfig, Config, ProjectConfig};
pub use description::{BidderDescription, BidderParam, ParamType, RawTransformation};
pub use error::{Error, Result};
