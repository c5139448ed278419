//! Heap tree construction.
//!
//! Turns a raw sampling heap profile into a [`HeapTree`] whose nodes know
//! their total size (self plus every descendant), the aggregate size of their
//! children, and their parent.
//!
//! # Algorithm
//!
//! Two passes, neither recursive, so profile depth cannot overflow the
//! native stack:
//!
//! 1. **Pre-order walk** with an explicit work stack. Each popped raw node is
//!    validated, appended to the arena with its parent slot already wired, and
//!    registered with its parent in raw order. The cancellation flag is
//!    checked between pops.
//! 2. **Rollup** from the last arena slot to the first. Pre-order numbering
//!    puts every child after its parent, so by the time a node is visited all
//!    of its children have final totals.
//!
//! # Performance
//!
//! - O(n) time and O(n) space for n nodes
//! - Work stack size is bounded by the widest sibling list along one path

use crate::domain::{BuildError, Bytes, NodeId, NodeIndex};
use crate::heap::raw::{RawHeapNode, RawHeapProfile};
use crate::heap::tree::{HeapSample, HeapTree, TreeNode};
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Builds [`HeapTree`]s from raw profiles.
///
/// A builder holds only configuration and can be reused for successive
/// snapshots, or cloned into other threads.
#[derive(Debug, Clone, Default)]
pub struct HeapTreeBuilder {
    /// Deepest allowed node (the root has depth 0)
    max_depth: Option<usize>,

    /// Set to `true` from another thread to abort a running build
    cancel: Option<Arc<AtomicBool>>,
}

impl HeapTreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject profiles with nodes nested deeper than `limit`
    #[must_use]
    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = Some(limit);
        self
    }

    /// Abort with [`BuildError::Cancelled`] once `flag` becomes `true`
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Build the tree rooted at `raw`.
    ///
    /// # Errors
    ///
    /// Fails on negative self sizes, duplicate identifiers anywhere in the
    /// tree, size overflow, an exceeded depth limit, or cancellation. No
    /// partial tree is ever returned.
    pub fn build(&self, raw: &RawHeapNode) -> Result<HeapTree, BuildError> {
        let (nodes, by_id) = self.build_nodes(raw)?;
        Ok(HeapTree::from_parts(nodes, by_id, Vec::new(), None))
    }

    /// Build the tree of a complete profile, resolving its samples and
    /// carrying its metadata through.
    ///
    /// # Errors
    ///
    /// Everything [`build`](Self::build) rejects, plus samples that reference
    /// a node id absent from the tree.
    pub fn build_profile(&self, raw: &RawHeapProfile) -> Result<HeapTree, BuildError> {
        let (nodes, by_id) = self.build_nodes(&raw.head)?;

        let mut samples = raw
            .samples
            .iter()
            .map(|sample| -> Result<HeapSample, BuildError> {
                let node = NodeId(sample.node_id);
                let index = by_id
                    .get(&node)
                    .copied()
                    .ok_or(BuildError::UnknownSampleNode { ordinal: sample.ordinal, node })?;
                Ok(HeapSample { size: Bytes(sample.size), node: index, ordinal: sample.ordinal })
            })
            .collect::<Result<Vec<_>, _>>()?;
        samples.sort_by_key(|s| s.ordinal);

        debug!("Resolved {} heap samples", samples.len());

        Ok(HeapTree::from_parts(nodes, by_id, samples, raw.root_path().map(str::to_owned)))
    }

    fn build_nodes(
        &self,
        head: &RawHeapNode,
    ) -> Result<(Vec<TreeNode>, HashMap<NodeId, NodeIndex>), BuildError> {
        let mut nodes: Vec<TreeNode> = Vec::new();
        let mut by_id: HashMap<NodeId, NodeIndex> = HashMap::new();

        // (raw node, parent slot, depth)
        let mut stack: Vec<(&RawHeapNode, Option<NodeIndex>, usize)> = vec![(head, None, 0)];

        while let Some((raw, parent, depth)) = stack.pop() {
            self.check_cancelled()?;

            let id = raw.node_id();
            let self_size = u64::try_from(raw.self_size)
                .map_err(|_| BuildError::NegativeSelfSize { id, size: raw.self_size })?;

            if let Some(limit) = self.max_depth {
                if depth > limit {
                    return Err(BuildError::DepthLimitExceeded { id, limit });
                }
            }

            let index = NodeIndex(nodes.len());
            if by_id.insert(id, index).is_some() {
                return Err(BuildError::DuplicateNodeId(id));
            }

            trace!("{id}: self={self_size} depth={depth} slot={index}");

            nodes.push(TreeNode::new(id, raw.call_frame.clone(), Bytes(self_size), parent, depth));
            if let Some(parent) = parent {
                nodes[parent.0].children.push(index);
            }

            // Reversed so the first child is popped, and numbered, first
            stack.extend(raw.children.iter().rev().map(|child| (child, Some(index), depth + 1)));
        }

        rollup(&mut nodes)?;

        let root = &nodes[NodeIndex::ROOT.0];
        if root.total_size == Bytes::ZERO {
            warn!("Heap profile rooted at {} has no allocated bytes", root.id);
        }
        debug!("Built heap tree: {} nodes, {} total", nodes.len(), root.total_size);

        Ok((nodes, by_id))
    }

    fn check_cancelled(&self) -> Result<(), BuildError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(BuildError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Fill in total and children sizes bottom-up. Requires pre-order slots.
fn rollup(nodes: &mut [TreeNode]) -> Result<(), BuildError> {
    for slot in (0..nodes.len()).rev() {
        let (total, parent) = {
            let node = &mut nodes[slot];
            node.total_size = node
                .self_size
                .checked_add(node.children_size)
                .ok_or(BuildError::SizeOverflow(node.id))?;
            (node.total_size, node.parent)
        };

        if let Some(parent) = parent {
            let parent = &mut nodes[parent.0];
            parent.children_size = parent
                .children_size
                .checked_add(total)
                .ok_or(BuildError::SizeOverflow(parent.id))?;
        }
    }
    Ok(())
}

/// Build a profile's tree with the default configuration.
///
/// For depth limits or cancellation, use [`HeapTreeBuilder`].
///
/// # Errors
///
/// See [`HeapTreeBuilder::build_profile`].
pub fn build_tree(raw: &RawHeapProfile) -> Result<HeapTree, BuildError> {
    HeapTreeBuilder::new().build_profile(raw)
}
