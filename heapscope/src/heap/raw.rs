//! Raw sampling heap profile, as handed over by the capture source.
//!
//! The field names follow the DevTools `SamplingHeapProfile` document so a
//! saved `.heapprofile` file can be replayed directly. Nothing in this crate
//! mutates a raw profile; the builder only borrows it.

use crate::domain::{LoadError, NodeId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source location of an allocation site
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCallFrame {
    pub function_name: String,
    pub script_id: String,
    pub url: String,
    /// 0-based, -1 when unknown
    pub line_number: i64,
    /// 0-based, -1 when unknown
    pub column_number: i64,
}

impl RawCallFrame {
    /// Function name for display, `(anonymous)` when the capture left it empty
    pub fn display_name(&self) -> &str {
        if self.function_name.is_empty() {
            "(anonymous)"
        } else {
            &self.function_name
        }
    }
}

/// One allocation-site node of the raw profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHeapNode {
    pub id: i64,

    /// Bytes allocated directly at this site. Signed so that corrupt input
    /// can be detected and rejected instead of wrapping.
    pub self_size: i64,

    #[serde(default)]
    pub call_frame: RawCallFrame,

    #[serde(default)]
    pub children: Vec<RawHeapNode>,
}

impl RawHeapNode {
    /// Leaf node with an empty call frame
    pub fn new(id: i64, self_size: i64) -> Self {
        Self { id, self_size, call_frame: RawCallFrame::default(), children: Vec::new() }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<RawHeapNode>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.call_frame.function_name = name.into();
        self
    }

    pub fn node_id(&self) -> NodeId {
        NodeId(self.id)
    }
}

// Profiles can nest far deeper than the native stack allows a recursive drop.
impl Drop for RawHeapNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// A single allocation sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHeapSample {
    pub size: u64,
    pub node_id: i64,
    /// Monotonic sample order assigned by the capture source
    pub ordinal: u64,
}

/// Extension metadata carried next to the profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfileMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
}

/// Complete raw profile: root node, samples and opaque metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHeapProfile {
    pub head: RawHeapNode,

    #[serde(default)]
    pub samples: Vec<RawHeapSample>,

    #[serde(rename = "$vscode", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RawProfileMetadata>,
}

impl RawHeapProfile {
    /// Profile consisting of just a node tree
    pub fn new(head: RawHeapNode) -> Self {
        Self { head, samples: Vec::new(), metadata: None }
    }

    /// Parse a saved profile document.
    ///
    /// Nesting depth is not limited: every node adds two levels (the node
    /// object and its `children` array), and the stack is grown on demand.
    pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
        let mut deserializer = serde_json::Deserializer::from_str(content);
        deserializer.disable_recursion_limit();
        let profile = Self::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
        deserializer.end()?;
        Ok(profile)
    }

    /// Read and parse a saved `.heapprofile` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn root_path(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.root_path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "head": {
            "callFrame": {"functionName": "(root)", "scriptId": "0", "url": "", "lineNumber": -1, "columnNumber": -1},
            "selfSize": 0,
            "id": 1,
            "children": [
                {
                    "callFrame": {"functionName": "alloc", "scriptId": "12", "url": "file:///app.js", "lineNumber": 3, "columnNumber": 8},
                    "selfSize": 4096,
                    "id": 2,
                    "children": []
                }
            ]
        },
        "samples": [{"size": 4096, "nodeId": 2, "ordinal": 1}],
        "$vscode": {"rootPath": "/workspace"}
    }"#;

    #[test]
    fn test_parses_devtools_document() {
        let profile = RawHeapProfile::from_json_str(DOCUMENT).unwrap();
        assert_eq!(profile.head.id, 1);
        assert_eq!(profile.head.children.len(), 1);

        let child = &profile.head.children[0];
        assert_eq!(child.self_size, 4096);
        assert_eq!(child.call_frame.function_name, "alloc");
        assert_eq!(child.call_frame.line_number, 3);

        assert_eq!(profile.samples, vec![RawHeapSample { size: 4096, node_id: 2, ordinal: 1 }]);
        assert_eq!(profile.root_path(), Some("/workspace"));
    }

    #[test]
    fn test_optional_fields_default() {
        let profile = RawHeapProfile::from_json_str(r#"{"head": {"id": 1, "selfSize": 5}}"#).unwrap();
        assert!(profile.head.children.is_empty());
        assert!(profile.samples.is_empty());
        assert_eq!(profile.root_path(), None);
        assert_eq!(profile.head.call_frame.display_name(), "(anonymous)");
    }

    #[test]
    fn test_parses_deeply_nested_document() {
        let depth = 2_000;
        let mut document = String::from(r#"{"head":"#);
        for id in 0..depth {
            document.push_str(&format!(r#"{{"id":{id},"selfSize":1,"children":["#));
        }
        document.push_str(&"]}".repeat(depth));
        document.push('}');

        let profile = RawHeapProfile::from_json_str(&document).unwrap();

        let mut levels = 1;
        let mut node = &profile.head;
        while let Some(child) = node.children.first() {
            levels += 1;
            node = child;
        }
        assert_eq!(levels, depth);
        assert_eq!(node.id, 1_999);
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        let result = RawHeapProfile::from_json_str(r#"{"head": {"id": 1, "selfSize": 0}} extra"#);
        assert!(matches!(result, Err(LoadError::Json(_))));
    }

    #[test]
    fn test_deep_node_drops_without_recursion() {
        let mut node = RawHeapNode::new(0, 1);
        for id in 1..500_000 {
            node = RawHeapNode::new(id, 1).with_children(vec![node]);
        }
        drop(node);
    }

    #[test]
    fn test_missing_head_is_rejected() {
        let result = RawHeapProfile::from_json_str(r#"{"nodes": []}"#);
        assert!(matches!(result, Err(LoadError::Json(_))));
    }
}
