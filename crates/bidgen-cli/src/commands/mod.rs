//! CLI command implementations

pub mod generate;
pub mod init;
pub mod show;
pub mod validate;
