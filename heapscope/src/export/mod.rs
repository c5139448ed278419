//! Heap tree export
//!
//! This module provides functionality for exporting built heap trees.
//! Currently supports nested JSON for treemap and flame-graph viewers.

pub mod tree_json;

pub use tree_json::TreeJsonExporter;
