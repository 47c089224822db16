//! fsdex: Deterministic Filesystem Indexing
//!
//! Walks a file or directory and produces one entry per item: a prefixed content
//! (or name) identity, a multi-algorithm digest set, timestamps, link attributes,
//! embedded metadata from an external extractor, and records read from sidecar
//! files that sit next to the item they describe.

pub mod cancel;
pub mod config;
pub mod delete_queue;
pub mod error;
pub mod events;
pub mod extractor;
pub mod logging;
pub mod rename;
pub mod report;
pub mod run;
pub mod sidecar;
pub mod sink;
pub mod timestamps;
pub mod tooling;
pub mod tree;
pub mod types;

pub use cancel::CancellationToken;
pub use config::{ConfigLoader, IndexerConfig, ResolvedConfig};
pub use error::{BuildError, ConfigError, RunError, SinkError};
pub use report::RunReport;
pub use run::Indexer;
pub use tree::{Entry, IdentityEngine, TreeBuilder};
pub use types::{HashAlgorithm, IdentityPrefix, IdentitySet};
