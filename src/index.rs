//! The path-trie index: an n-ary tree keyed by path segments, mapping
//! full paths to byte offsets in the record store.
//!
//! Children are kept sorted by name so lookup is a binary search per level and
//! insertion is a sorted insert; the whole tree is serialised wholesale (as JSON) on
//! every generate run, so the on-disk form doesn't need to be forward-compatible.

use std::io::{Read, Write};
use std::path::MAIN_SEPARATOR;

use serde::{Deserialize, Serialize};

use crate::error::Result;

fn split_path(path: &str) -> Vec<String> {
    let cleaned = normalize(path);
    cleaned.split(MAIN_SEPARATOR).map(str::to_string).collect()
}

/// Collapses `.`/`..`/repeated separators the way `path.Clean` does, without touching
/// the filesystem. Relative paths are left as a single logical segment per the
/// documented absolute-path assumption (see design notes).
fn normalize(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let is_abs = path.starts_with(MAIN_SEPARATOR);
    let mut out: Vec<&str> = Vec::new();
    for part in path.split(MAIN_SEPARATOR) {
        match part {
            "" | "." => continue,
            ".." => {
                if matches!(out.last(), Some(p) if *p != "..") {
                    out.pop();
                } else if !is_abs {
                    out.push("..");
                }
            }
            p => out.push(p),
        }
    }
    let joined = out.join(&MAIN_SEPARATOR.to_string());
    if is_abs {
        format!("{MAIN_SEPARATOR}{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// One node of the trie: a path segment's name, its record offset (or -1 if this
/// segment has no record of its own), and its sorted children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathNode {
    pub name: String,
    pub pos: i64,
    pub children: Vec<PathNode>,
}

impl PathNode {
    fn new(name: String) -> Self {
        PathNode {
            name,
            pos: -1,
            children: Vec::new(),
        }
    }

    fn idx_child(&self, name: &str) -> std::result::Result<usize, usize> {
        self.children.binary_search_by(|c| c.name.as_str().cmp(name))
    }

    fn get<'a>(&'a self, parts: &[String]) -> Option<&'a PathNode> {
        let (head, tail) = parts.split_first()?;
        let idx = self.idx_child(head).ok()?;
        let child = &self.children[idx];
        if tail.is_empty() {
            Some(child)
        } else {
            child.get(tail)
        }
    }

    fn get_or_create(&mut self, parts: &[String]) -> &mut PathNode {
        let Some((head, tail)) = parts.split_first() else {
            return self;
        };
        let idx = match self.idx_child(head) {
            Ok(idx) => idx,
            Err(insert_at) => {
                self.children.insert(insert_at, PathNode::new(head.clone()));
                insert_at
            }
        };
        self.children[idx].get_or_create(tail)
    }

    fn size(&self) -> i64 {
        1 + self.children.iter().map(PathNode::size).sum::<i64>()
    }

    fn traverse<'a, F: FnMut(&'a PathNode)>(&'a self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.traverse(f);
        }
    }
}

/// The persistent path-trie index mapping full paths to record-store offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathIndex {
    root: PathNode,
}

impl Default for PathIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PathIndex {
    pub fn new() -> Self {
        PathIndex {
            root: PathNode::new(String::new()),
        }
    }

    /// Splits `path` and walks from the root, creating intermediate nodes as needed
    /// with offset -1, writing `offset` into the terminal node.
    pub fn set(&mut self, path: &str, offset: i64) {
        let parts = split_path(path);
        if parts.len() == 1 {
            self.root.pos = offset;
            return;
        }
        let node = self.root.get_or_create(&parts[1..]);
        node.pos = offset;
    }

    /// Returns the terminal node's offset, or `None` if any segment is missing.
    pub fn get(&self, path: &str) -> Option<i64> {
        self.get_node(path).map(|n| n.pos)
    }

    /// Returns the node itself, for prefix traversal.
    pub fn get_node(&self, path: &str) -> Option<&PathNode> {
        let parts = split_path(path);
        if parts.len() == 1 {
            return Some(&self.root);
        }
        self.root.get(&parts[1..])
    }

    /// Pre-order walk emitting every descendant of `node` (inclusive) to `visitor`.
    pub fn traverse<F: FnMut(&PathNode)>(node: &PathNode, mut visitor: F) {
        node.traverse(&mut visitor);
    }

    pub fn root(&self) -> &PathNode {
        &self.root
    }

    /// Number of nodes in the tree; the root counts as 1.
    pub fn size(&self) -> i64 {
        self.root.size()
    }

    pub fn save<W: Write>(&self, sink: W) -> Result<()> {
        serde_json::to_writer(sink, &self.root)?;
        Ok(())
    }

    pub fn load<R: Read>(source: R) -> Result<PathIndex> {
        let root: PathNode = serde_json::from_reader(source)?;
        Ok(PathIndex { root })
    }
}
