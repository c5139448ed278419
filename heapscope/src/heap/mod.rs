//! Heap profile model
//!
//! - [`raw`]: the profile as handed over by the capture source
//! - [`builder`]: raw profile → [`HeapTree`] with size rollups
//! - [`tree`]: read-only queries over the built tree

pub mod builder;
pub mod raw;
pub mod tree;

pub use builder::{build_tree, HeapTreeBuilder};
pub use raw::{RawCallFrame, RawHeapNode, RawHeapProfile, RawHeapSample, RawProfileMetadata};
pub use tree::{Ancestors, HeapSample, HeapTree, TreeNode};
