//! # heapscope - Heap Allocation Trees from Sampling Profiles
//!
//! heapscope turns a raw sampling heap profile (a tree of allocation sites,
//! each with the bytes allocated directly at it) into an analysis-ready tree
//! where every node also knows the bytes allocated by everything below it.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                Capture source / saved .heapprofile              │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ RawHeapProfile
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   heapscope (This Crate)                        │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  heap::raw   │──▶│ HeapTree     │──▶│   HeapTree   │         │
//! │  │   (serde)    │   │  Builder     │   │   (arena)    │         │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘         │
//! │                                               │                 │
//! │                     ┌──────────────┐          │                 │
//! │                     │   Analysis   │◀─────────┤                 │
//! │                     │ (alloc sites)│          │                 │
//! │                     └──────────────┘          │                 │
//! │                     ┌──────────────┐          │                 │
//! │                     │    Export    │◀─────────┘                 │
//! │                     │ (tree.json)  │                            │
//! │                     └──────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`heap`]: raw profile model, tree construction and tree queries
//!   - `builder`: iterative two-pass build with size rollups
//!   - `tree`: arena-backed tree with parent links and size-sorted views
//! - [`search`]: binary search returning a found index or an insertion hint
//! - [`analysis`]: allocation sites aggregated by call frame
//! - [`export`]: nested JSON for treemap and flame-graph viewers
//! - [`cli`]: command-line argument parsing
//! - [`domain`]: core domain types (`NodeId`, `NodeIndex`, `Bytes`) and errors
//!
//! ## Typical Usage
//!
//! ```
//! use heapscope::heap::{HeapTreeBuilder, RawHeapNode};
//! use heapscope::domain::Bytes;
//!
//! let raw = RawHeapNode::new(1, 10)
//!     .with_children(vec![RawHeapNode::new(2, 5), RawHeapNode::new(3, 7)]);
//! let tree = HeapTreeBuilder::new().build(&raw)?;
//!
//! assert_eq!(tree.root().total_size(), Bytes(22));
//! assert_eq!(tree.root().children_size(), Bytes(12));
//! # Ok::<(), heapscope::domain::BuildError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod domain;
pub mod export;
pub mod heap;
pub mod search;
