//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent mixing up a profile node identifier with
//! an arena slot of the built tree, and make function signatures more
//! expressive.

use std::fmt;

/// Node identifier from the raw profile
///
/// Assigned by the capture source and unique within one profile. This is the
/// stable join key callers use (e.g. when diffing two profiles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node#{}", self.0)
    }
}

/// Slot of a node inside a built [`HeapTree`](crate::heap::HeapTree)
///
/// Only meaningful for the tree that produced it. Slots are assigned in
/// pre-order, so a child's slot is always greater than its parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub usize);

impl NodeIndex {
    /// The root always occupies the first slot
    pub const ROOT: NodeIndex = NodeIndex(0);
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allocation size in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Bytes(pub u64);

impl Bytes {
    pub const ZERO: Bytes = Bytes(0);

    /// Add two sizes, returning `None` on overflow
    #[must_use]
    pub fn checked_add(self, other: Bytes) -> Option<Bytes> {
        self.0.checked_add(other.0).map(Bytes)
    }

    /// Share of `total` as a percentage (0.0 - 100.0)
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_of(self, total: Bytes) -> f64 {
        if total.0 == 0 {
            0.0
        } else {
            (self.0 as f64 / total.0 as f64) * 100.0
        }
    }
}

impl fmt::Display for Bytes {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;
        match self.0 {
            n if n >= GB => write!(f, "{:.1} GB", n as f64 / GB as f64),
            n if n >= MB => write!(f, "{:.1} MB", n as f64 / MB as f64),
            n if n >= KB => write!(f, "{:.1} kB", n as f64 / KB as f64),
            n => write!(f, "{n} B"),
        }
    }
}
