//! Analysis-ready heap tree.
//!
//! Nodes live in an arena owned by [`HeapTree`]; children and parents refer
//! to each other by [`NodeIndex`], so upward traversal never creates a second
//! owner. The tree is immutable once built. The only interior mutability is
//! the per-node size-sorted child view, computed at most once on demand.

use crate::domain::{Bytes, NodeId, NodeIndex};
use crate::heap::raw::RawCallFrame;
use crate::search;
use std::collections::HashMap;
use std::sync::OnceLock;

/// A node of the built tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub(crate) id: NodeId,
    pub(crate) call_frame: RawCallFrame,
    pub(crate) self_size: Bytes,
    pub(crate) total_size: Bytes,
    pub(crate) children_size: Bytes,
    /// Children in the order the raw profile listed them
    pub(crate) children: Vec<NodeIndex>,
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) depth: usize,
    /// Children sorted ascending by total size, filled on first use
    by_size: OnceLock<Vec<NodeIndex>>,
}

impl TreeNode {
    pub(crate) fn new(
        id: NodeId,
        call_frame: RawCallFrame,
        self_size: Bytes,
        parent: Option<NodeIndex>,
        depth: usize,
    ) -> Self {
        Self {
            id,
            call_frame,
            self_size,
            total_size: self_size,
            children_size: Bytes::ZERO,
            children: Vec::new(),
            parent,
            depth,
            by_size: OnceLock::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn call_frame(&self) -> &RawCallFrame {
        &self.call_frame
    }

    /// Bytes allocated directly at this site
    pub fn self_size(&self) -> Bytes {
        self.self_size
    }

    /// Self size plus the total size of every descendant
    pub fn total_size(&self) -> Bytes {
        self.total_size
    }

    /// Sum of the children's total sizes
    pub fn children_size(&self) -> Bytes {
        self.children_size
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Distance from the root (the root has depth 0)
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// The cached view is derived data and does not take part in equality.
impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.call_frame == other.call_frame
            && self.self_size == other.self_size
            && self.total_size == other.total_size
            && self.children_size == other.children_size
            && self.children == other.children
            && self.parent == other.parent
            && self.depth == other.depth
    }
}

impl Eq for TreeNode {}

/// Allocation sample resolved against the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapSample {
    pub size: Bytes,
    pub node: NodeIndex,
    pub ordinal: u64,
}

/// Heap tree with bottom-up size rollups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapTree {
    /// Arena in pre-order; the root is slot 0
    nodes: Vec<TreeNode>,
    by_id: HashMap<NodeId, NodeIndex>,
    /// Sorted ascending by ordinal
    samples: Vec<HeapSample>,
    root_path: Option<String>,
}

impl HeapTree {
    pub(crate) fn from_parts(
        nodes: Vec<TreeNode>,
        by_id: HashMap<NodeId, NodeIndex>,
        samples: Vec<HeapSample>,
        root_path: Option<String>,
    ) -> Self {
        debug_assert!(!nodes.is_empty(), "a heap tree always has a root");
        debug_assert!(samples.windows(2).all(|w| w[0].ordinal <= w[1].ordinal));
        Self { nodes, by_id, samples, root_path }
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[NodeIndex::ROOT.0]
    }

    /// Node stored at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not belong to this tree.
    pub fn node(&self, index: NodeIndex) -> &TreeNode {
        &self.nodes[index.0]
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a built tree has at least its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total bytes of the whole profile
    pub fn total_size(&self) -> Bytes {
        self.root().total_size
    }

    pub fn root_path(&self) -> Option<&str> {
        self.root_path.as_deref()
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.by_id.get(&id).copied()
    }

    pub fn node_by_id(&self, id: NodeId) -> Option<&TreeNode> {
        self.index_of(id).map(|index| self.node(index))
    }

    /// Pre-order traversal of all node slots
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NodeIndex> + ExactSizeIterator {
        (0..self.nodes.len()).map(NodeIndex)
    }

    /// Children of `index` in raw profile order
    pub fn children(&self, index: NodeIndex) -> impl Iterator<Item = &TreeNode> + '_ {
        self.node(index).children.iter().map(|&child| self.node(child))
    }

    /// Child of `index` with identifier `id`, if `index` holds one
    pub fn child(&self, index: NodeIndex, id: NodeId) -> Option<NodeIndex> {
        self.index_of(id).filter(|&child| self.node(child).parent == Some(index))
    }

    pub fn parent(&self, index: NodeIndex) -> Option<&TreeNode> {
        self.node(index).parent.map(|parent| self.node(parent))
    }

    /// Walk from the parent of `index` up to the root
    pub fn ancestors(&self, index: NodeIndex) -> Ancestors<'_> {
        Ancestors { tree: self, next: self.node(index).parent }
    }

    /// Children of `index` sorted ascending by total size, ties by id.
    ///
    /// Computed on first call for each node and cached.
    pub fn children_by_size(&self, index: NodeIndex) -> &[NodeIndex] {
        let node = self.node(index);
        node.by_size.get_or_init(|| {
            let mut sorted = node.children.clone();
            sorted.sort_unstable_by_key(|&child| {
                let child = self.node(child);
                (child.total_size, child.id)
            });
            sorted
        })
    }

    /// Search the size-sorted children of `index` for one whose total size is
    /// `size`, using the encoding of [`search::binary_search`].
    pub fn find_child_by_total_size(&self, index: NodeIndex, size: Bytes) -> isize {
        search::binary_search_by_key(self.children_by_size(index), &size, |&child| {
            self.node(child).total_size
        })
    }

    /// Samples sorted by ordinal
    pub fn samples(&self) -> &[HeapSample] {
        &self.samples
    }

    pub fn sample_by_ordinal(&self, ordinal: u64) -> Option<&HeapSample> {
        let found = search::binary_search_by_key(&self.samples, &ordinal, |s| s.ordinal);
        search::decode(found).ok().map(|i| &self.samples[i])
    }

    /// Samples whose ordinal lies in `start..end`
    pub fn samples_in_range(&self, start: u64, end: u64) -> &[HeapSample] {
        if start >= end {
            return &[];
        }
        let lower = search::binary_search(&self.samples, |s| first_at_or_after(s.ordinal, start));
        let upper = search::binary_search(&self.samples, |s| first_at_or_after(s.ordinal, end));
        let (Err(lower) | Ok(lower)) = search::decode(lower);
        let (Err(upper) | Ok(upper)) = search::decode(upper);
        &self.samples[lower..upper]
    }
}

/// Comparator that never reports `Equal`, so the search always lands on the
/// first slot whose ordinal is `>= bound`.
fn first_at_or_after(ordinal: u64, bound: u64) -> std::cmp::Ordering {
    if ordinal < bound {
        std::cmp::Ordering::Less
    } else {
        std::cmp::Ordering::Greater
    }
}

/// Iterator over the ancestors of a node, nearest first
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    tree: &'a HeapTree,
    next: Option<NodeIndex>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tree.node(self.next?);
        self.next = node.parent;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{HeapTreeBuilder, RawHeapNode, RawHeapProfile, RawHeapSample};

    fn sample_tree() -> HeapTree {
        //        1 (10)
        //     /    |    \
        //  2 (5) 3 (7)  4 (1)
        //          |
        //        5 (20)
        let raw = RawHeapNode::new(1, 10).with_children(vec![
            RawHeapNode::new(2, 5),
            RawHeapNode::new(3, 7).with_children(vec![RawHeapNode::new(5, 20)]),
            RawHeapNode::new(4, 1),
        ]);
        HeapTreeBuilder::new().build(&raw).unwrap()
    }

    #[test]
    fn test_children_keep_raw_order() {
        let tree = sample_tree();
        let ids: Vec<i64> = tree.children(NodeIndex::ROOT).map(|n| n.id().0).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_child_lookup_by_id() {
        let tree = sample_tree();
        let three = tree.index_of(NodeId(3)).unwrap();
        assert_eq!(tree.child(NodeIndex::ROOT, NodeId(3)), Some(three));
        // Node 5 exists but is a grandchild of the root
        assert_eq!(tree.child(NodeIndex::ROOT, NodeId(5)), None);
        assert_eq!(tree.child(NodeIndex::ROOT, NodeId(99)), None);
    }

    #[test]
    fn test_ancestors_walk_to_root() {
        let tree = sample_tree();
        let five = tree.index_of(NodeId(5)).unwrap();
        let path: Vec<i64> = tree.ancestors(five).map(|n| n.id().0).collect();
        assert_eq!(path, vec![3, 1]);
        assert_eq!(tree.node(five).depth(), 2);
        assert_eq!(tree.ancestors(NodeIndex::ROOT).count(), 0);
    }

    #[test]
    fn test_children_by_size_sorted_and_cached() {
        let tree = sample_tree();
        let sorted: Vec<i64> =
            tree.children_by_size(NodeIndex::ROOT).iter().map(|&i| tree.node(i).id().0).collect();
        assert_eq!(sorted, vec![4, 2, 3]);

        let first = tree.children_by_size(NodeIndex::ROOT).as_ptr();
        let second = tree.children_by_size(NodeIndex::ROOT).as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_find_child_by_total_size() {
        let tree = sample_tree();
        // Sorted totals: [1, 5, 27]
        assert_eq!(tree.find_child_by_total_size(NodeIndex::ROOT, Bytes(5)), 1);
        assert_eq!(tree.find_child_by_total_size(NodeIndex::ROOT, Bytes(6)), -3);
        assert_eq!(tree.find_child_by_total_size(NodeIndex::ROOT, Bytes(100)), -4);
    }

    #[test]
    fn test_sample_lookup() {
        let mut profile = RawHeapProfile::new(
            RawHeapNode::new(1, 0).with_children(vec![RawHeapNode::new(2, 64)]),
        );
        profile.samples = vec![
            RawHeapSample { size: 32, node_id: 2, ordinal: 9 },
            RawHeapSample { size: 16, node_id: 2, ordinal: 3 },
            RawHeapSample { size: 16, node_id: 1, ordinal: 5 },
        ];
        let tree = HeapTreeBuilder::new().build_profile(&profile).unwrap();

        let ordinals: Vec<u64> = tree.samples().iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![3, 5, 9]);

        let sample = tree.sample_by_ordinal(9).unwrap();
        assert_eq!(sample.size, Bytes(32));
        assert_eq!(tree.node(sample.node).id(), NodeId(2));
        assert!(tree.sample_by_ordinal(4).is_none());

        let window: Vec<u64> = tree.samples_in_range(4, 10).iter().map(|s| s.ordinal).collect();
        assert_eq!(window, vec![5, 9]);
        assert!(tree.samples_in_range(10, 4).is_empty());
    }
}
