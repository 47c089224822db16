//! Integration tests for the fsdex filesystem indexer

mod cancellation;
mod run_pipeline;
mod sidecar_merge;
mod support;
mod symlinks;
mod tree_structure;
mod unreadable_items;
