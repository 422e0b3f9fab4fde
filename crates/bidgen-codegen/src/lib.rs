//! bidgen Code Generation
//!
//! This crate handles the description → IR → Java pipeline.
//!
//! # Pipeline Overview
//!
//! ```text
//! ┌─────────┐     ┌─────────┐     ┌────────────┐     ┌─────────┐
//! │  YAML   │────▶│   IR    │────▶│  Mutation  │────▶│  Java   │
//! │ Bidder  │     │ (Parse) │     │ + Expected │     │ (Render)│
//! └─────────┘     └─────────┘     │ (Compile)  │     └─────────┘
//!                                 └────────────┘
//! ```
//!
//! Transformations are classified by their first target segment, then
//! compiled twice: once into the builder statements of `modifyImp` /
//! `modifyRequest`, and once, independently, into the `expectedRequest`
//! of the generated test. The [`interpreter`] runs both over JSON object
//! graphs so their agreement can be checked without a JVM.
//!
//! # Example
//!
//! ```rust,ignore
//! use bidgen_codegen::{CompileOptions, Compiler};
//!
//! let compiler = Compiler::new(CompileOptions::default(), config.project.codegen.clone())?;
//! let compiled = compiler.compile_file("bidders/foo.yaml")?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod compiler;
pub mod error;
pub mod expectation;
pub mod fixture;
pub mod generator;
pub mod interpreter;
pub mod ir;
pub mod java;
pub mod naming;
pub mod parser;
pub mod path;
pub mod synthesizer;
pub mod value;

pub use compiler::{CompileOptions, CompiledBidder, Compiler};
pub use error::{Error, Result};
pub use generator::{GeneratedBidder, GeneratedFile, Generator};
pub use ir::{BidderIR, CompiledTransformations, Transformation};
pub use parser::Parser;
pub use path::Scope;
