//! Layer composition for configuration sources.

pub mod merge_policy;
pub mod service;
