//! Allocation-site analysis for heap trees.
//!
//! The same function usually shows up at many places in a heap tree, once
//! per call path that reached it. This module merges those nodes by call
//! frame to answer "which code allocates the most", independent of how it
//! was reached.
//!
//! # Performance
//!
//! - O(n) over tree nodes (HashMap insert/update)
//! - O(s log s) to sort the s unique sites

use crate::domain::{Bytes, NodeId};
use crate::heap::{HeapTree, RawCallFrame};
use std::collections::HashMap;

/// A call frame with its self bytes summed over the whole tree
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSite {
    /// Function name, `(anonymous)` when the profile left it empty
    pub name: String,

    /// Script URL (may be empty for native frames)
    pub url: String,

    /// 1-based source line, if known
    pub line: Option<u32>,

    /// Self bytes summed over every node attributed to this frame
    pub bytes: Bytes,

    /// Share of the tree's total size (0.0 - 100.0)
    pub percentage: f64,

    /// Tree nodes merged into this site, in pre-order
    pub nodes: Vec<NodeId>,
}

/// Sites are keyed on everything but the script id, which changes between
/// runs of the same code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SiteKey<'a> {
    function_name: &'a str,
    url: &'a str,
    line_number: i64,
    column_number: i64,
}

impl<'a> From<&'a RawCallFrame> for SiteKey<'a> {
    fn from(frame: &'a RawCallFrame) -> Self {
        Self {
            function_name: &frame.function_name,
            url: &frame.url,
            line_number: frame.line_number,
            column_number: frame.column_number,
        }
    }
}

/// Aggregate self size by call frame.
///
/// Sites without any self bytes are left out. The result is sorted by bytes
/// (largest first), ties by name then URL so output is repeatable.
#[must_use]
pub fn analyze_allocation_sites(tree: &HeapTree) -> Vec<AllocationSite> {
    let total = tree.total_size();
    let mut by_frame: HashMap<SiteKey<'_>, (&RawCallFrame, Bytes, Vec<NodeId>)> = HashMap::new();

    for index in tree.iter() {
        let node = tree.node(index);
        if node.self_size() == Bytes::ZERO {
            continue;
        }

        let frame = node.call_frame();
        let entry = by_frame.entry(SiteKey::from(frame)).or_insert_with(|| (frame, Bytes::ZERO, Vec::new()));
        // Cannot overflow: the sum of self sizes is bounded by the root total
        entry.1 = Bytes(entry.1 .0 + node.self_size().0);
        entry.2.push(node.id());
    }

    let mut sites: Vec<AllocationSite> = by_frame
        .into_values()
        .map(|(frame, bytes, nodes)| AllocationSite {
            name: frame.display_name().to_string(),
            url: frame.url.clone(),
            line: u32::try_from(frame.line_number).ok().map(|line| line + 1),
            bytes,
            percentage: bytes.percent_of(total),
            nodes,
        })
        .collect();

    sites.sort_unstable_by(|a, b| {
        b.bytes.cmp(&a.bytes).then_with(|| a.name.cmp(&b.name)).then_with(|| a.url.cmp(&b.url))
    });
    sites
}
