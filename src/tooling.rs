//! Tooling Layer
//!
//! Command-line entry points over the library's indexing run.

pub mod cli;

pub use cli::{Cli, CliContext, CommandOutput, Commands, IndexArgs};
