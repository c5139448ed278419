//! Nested JSON export of a heap tree for treemap and flame-graph viewers.
//!
//! ```json
//! {
//!   "rootPath": "/workspace",
//!   "totalSize": 1000,
//!   "root": {
//!     "id": 1, "name": "(root)", "url": "", "line": null,
//!     "selfSize": 0, "totalSize": 1000, "childrenSize": 1000,
//!     "children": [ ... ]
//!   }
//! }
//! ```
//!
//! The document is streamed straight from the arena. Nesting is tracked on
//! an explicit stack of open nodes and fed to a `serde_json` formatter, so
//! neither tree depth nor output size is bounded by the native stack.

use crate::domain::{Bytes, ExportError, NodeIndex};
use crate::heap::HeapTree;
use log::debug;
use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::slice;

/// A node whose `children` array is still being written
#[derive(Debug)]
struct OpenNode<'t> {
    children: slice::Iter<'t, NodeIndex>,
    first: bool,
}

/// Writes a [`HeapTree`] as nested JSON
#[derive(Debug)]
pub struct TreeJsonExporter<'a> {
    tree: &'a HeapTree,
    /// Subtrees below this total size are left out
    min_total_size: Bytes,
    pretty: bool,
}

impl<'a> TreeJsonExporter<'a> {
    pub fn new(tree: &'a HeapTree) -> Self {
        Self { tree, min_total_size: Bytes::ZERO, pretty: false }
    }

    /// Drop subtrees whose total size is below `size`. The root is always kept.
    #[must_use]
    pub fn with_min_total_size(mut self, size: Bytes) -> Self {
        self.min_total_size = size;
        self
    }

    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Write the export to `writer`
    pub fn export<W: Write>(&self, mut writer: W) -> Result<(), ExportError> {
        if self.pretty {
            self.write_document(&mut writer, &mut PrettyFormatter::new())
        } else {
            self.write_document(&mut writer, &mut CompactFormatter)
        }
    }

    /// Write the export to a new file at `path`
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.export(&mut writer)?;
        writer.flush()?;
        debug!("Exported heap tree to {}", path.as_ref().display());
        Ok(())
    }

    fn write_document<W: Write, F: Formatter>(&self, w: &mut W, f: &mut F) -> Result<(), ExportError> {
        f.begin_object(w)?;
        let mut first = true;
        if let Some(root_path) = self.tree.root_path() {
            write_field(w, f, "rootPath", root_path, first)?;
            first = false;
        }
        write_field(w, f, "totalSize", &self.tree.total_size().0, first)?;

        begin_field(w, f, "root", false)?;
        self.write_nodes(w, f)?;
        f.end_object_value(w)?;

        f.end_object(w)?;
        Ok(())
    }

    /// Depth-first walk over the kept nodes, opening each node's object on
    /// the way down and closing it once its children are exhausted.
    fn write_nodes<W: Write, F: Formatter>(&self, w: &mut W, f: &mut F) -> Result<(), ExportError> {
        let tree = self.tree;
        let mut open = vec![self.open_node(w, f, NodeIndex::ROOT)?];

        while let Some(top) = open.last_mut() {
            let next = top
                .children
                .by_ref()
                .copied()
                .find(|&child| tree.node(child).total_size() >= self.min_total_size);

            match next {
                Some(child) => {
                    f.begin_array_value(w, top.first)?;
                    top.first = false;
                    let child = self.open_node(w, f, child)?;
                    open.push(child);
                }
                None => {
                    f.end_array(w)?;
                    f.end_object_value(w)?;
                    f.end_object(w)?;
                    open.pop();
                    if !open.is_empty() {
                        f.end_array_value(w)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Write every field of `index` and open its `children` array
    fn open_node<W: Write, F: Formatter>(
        &self,
        w: &mut W,
        f: &mut F,
        index: NodeIndex,
    ) -> Result<OpenNode<'a>, ExportError> {
        let tree: &'a HeapTree = self.tree;
        let node = tree.node(index);
        let frame = node.call_frame();
        // 1-based
        let line = u32::try_from(frame.line_number).ok().map(|line| line + 1);

        f.begin_object(w)?;
        write_field(w, f, "id", &node.id().0, true)?;
        write_field(w, f, "name", frame.display_name(), false)?;
        write_field(w, f, "url", &frame.url, false)?;
        write_field(w, f, "line", &line, false)?;
        write_field(w, f, "selfSize", &node.self_size().0, false)?;
        write_field(w, f, "totalSize", &node.total_size().0, false)?;
        write_field(w, f, "childrenSize", &node.children_size().0, false)?;
        begin_field(w, f, "children", false)?;
        f.begin_array(w)?;

        Ok(OpenNode { children: node.children().iter(), first: true })
    }
}

/// Write an object key and position the formatter for its value
fn begin_field<W: Write, F: Formatter>(w: &mut W, f: &mut F, key: &str, first: bool) -> Result<(), ExportError> {
    f.begin_object_key(w, first)?;
    serde_json::to_writer(&mut *w, key)?;
    f.end_object_key(w)?;
    f.begin_object_value(w)?;
    Ok(())
}

/// Write a complete `key: value` pair with a scalar value
fn write_field<W, F, T>(w: &mut W, f: &mut F, key: &str, value: &T, first: bool) -> Result<(), ExportError>
where
    W: Write,
    F: Formatter,
    T: Serialize + ?Sized,
{
    begin_field(w, f, key, first)?;
    serde_json::to_writer(&mut *w, value)?;
    f.end_object_value(w)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{HeapTreeBuilder, RawHeapNode, RawHeapProfile, RawProfileMetadata};

    fn export_value(exporter: &TreeJsonExporter<'_>) -> serde_json::Value {
        let mut buffer = Vec::new();
        exporter.export(&mut buffer).unwrap();
        serde_json::from_slice(&buffer).unwrap()
    }

    fn create_test_tree() -> HeapTree {
        let mut profile = RawHeapProfile::new(RawHeapNode::new(1, 10).with_children(vec![
            RawHeapNode::new(2, 5).with_function("small"),
            RawHeapNode::new(3, 7)
                .with_function("big")
                .with_children(vec![RawHeapNode::new(4, 30).with_function("leaf")]),
        ]));
        profile.metadata = Some(RawProfileMetadata { root_path: Some("/workspace".to_string()) });
        HeapTreeBuilder::new().build_profile(&profile).unwrap()
    }

    #[test]
    fn test_exports_nested_sizes() {
        let tree = create_test_tree();
        let json = export_value(&TreeJsonExporter::new(&tree));

        assert_eq!(json["rootPath"], "/workspace");
        assert_eq!(json["totalSize"], 52);
        assert_eq!(json["root"]["childrenSize"], 42);

        let children = json["root"]["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["name"], "small");
        assert_eq!(children[1]["totalSize"], 37);
        assert_eq!(children[1]["children"][0]["name"], "leaf");
        assert_eq!(children[1]["children"][0]["children"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_min_total_size_prunes_subtrees() {
        let tree = create_test_tree();
        let json = export_value(&TreeJsonExporter::new(&tree).with_min_total_size(Bytes(10)));

        let children = json["root"]["children"].as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["id"], 3);
        // Pruning never rewrites the rollups
        assert_eq!(json["root"]["totalSize"], 52);
    }

    #[test]
    fn test_exports_deep_tree() {
        let depth: i64 = 100_000;
        let mut raw = RawHeapNode::new(depth, 1);
        for id in (0..depth).rev() {
            raw = RawHeapNode::new(id, 1).with_children(vec![raw]);
        }
        let tree = HeapTreeBuilder::new().build(&raw).unwrap();

        let mut buffer = Vec::new();
        TreeJsonExporter::new(&tree).export(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with(r#"{"totalSize":100001,"root":{"id":0,"#));
        assert_eq!(text.matches(r#""children":["#).count(), 100_001);
        assert_eq!(text.matches('{').count(), text.matches('}').count());
        assert!(text.ends_with(&format!("{}}}", "]}".repeat(100_001))));
    }

    #[test]
    fn test_pretty_output_matches_compact_content() {
        let tree = create_test_tree();
        let compact = export_value(&TreeJsonExporter::new(&tree));
        let pretty = export_value(&TreeJsonExporter::new(&tree).pretty(true));
        assert_eq!(compact, pretty);
    }

    #[test]
    fn test_names_are_escaped() {
        let raw = RawHeapNode::new(1, 0).with_function("say \"hi\"\n");
        let tree = HeapTreeBuilder::new().build(&raw).unwrap();
        let json = export_value(&TreeJsonExporter::new(&tree));
        assert_eq!(json["root"]["name"], "say \"hi\"\n");
    }

    #[test]
    fn test_root_path_omitted_when_absent() {
        let tree = HeapTreeBuilder::new().build(&RawHeapNode::new(1, 3)).unwrap();
        let json = export_value(&TreeJsonExporter::new(&tree).pretty(true));

        assert!(json.get("rootPath").is_none());
        assert_eq!(json["root"]["name"], "(anonymous)");
        assert_eq!(json["root"]["line"], serde_json::Value::Null);
    }
}
