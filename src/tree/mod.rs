//! Tree construction: listing, identity hashing, entry assembly.

pub mod builder;
pub mod hasher;
pub mod node;
pub mod walker;

pub use builder::{BuildOutcome, TreeBuilder};
pub use hasher::IdentityEngine;
pub use node::{Entry, EntryKind, LinkTarget};
pub use walker::{Exclusions, FilesystemItem, ItemKind, WalkerConfig};
