//! Table-of-contents shapes and the flattener.
//!
//! Containers hand us a nested outline: a top-level entry either stands alone
//! or owns a list of sub-entries. Everything downstream works on the flat,
//! leveled form produced by [`flatten`].

use serde::Serialize;

/// A named jump point: `file` or `file#anchor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocLink {
    pub title: String,
    pub href: String,
}

impl TocLink {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }
}

/// One node of a nested outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocNode {
    Leaf(TocLink),
    Branch(TocLink, Vec<TocNode>),
}

impl TocNode {
    pub fn leaf(title: impl Into<String>, href: impl Into<String>) -> Self {
        TocNode::Leaf(TocLink::new(title, href))
    }

    pub fn branch(title: impl Into<String>, href: impl Into<String>, children: Vec<TocNode>) -> Self {
        TocNode::Branch(TocLink::new(title, href), children)
    }

    pub fn link(&self) -> &TocLink {
        match self {
            TocNode::Leaf(link) | TocNode::Branch(link, _) => link,
        }
    }
}

/// Flattened outline entry; `level` is 1 for top-level entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
    pub level: usize,
}

impl TocEntry {
    /// Splits `href` into its file part and optional anchor.
    pub fn split_href(&self) -> (&str, Option<&str>) {
        split_href(&self.href)
    }
}

/// Depth-first, parent-before-children flattening in reading order.
pub fn flatten(nodes: &[TocNode]) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    flatten_into(nodes, 1, &mut entries);
    entries
}

fn flatten_into(nodes: &[TocNode], level: usize, out: &mut Vec<TocEntry>) {
    for node in nodes {
        let link = node.link();
        out.push(TocEntry {
            title: link.title.clone(),
            href: link.href.clone(),
            level,
        });
        if let TocNode::Branch(_, children) = node {
            flatten_into(children, level + 1, out);
        }
    }
}

/// `"c1.xhtml#s13"` -> `("c1.xhtml", Some("s13"))`. An empty anchor counts as none.
pub fn split_href(href: &str) -> (&str, Option<&str>) {
    match href.split_once('#') {
        Some((file, anchor)) if !anchor.is_empty() => (file, Some(anchor)),
        Some((file, _)) => (file, None),
        None => (href, None),
    }
}
