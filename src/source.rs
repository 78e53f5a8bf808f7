//! The read-only view of a loaded book that chapter resolution works against.

use crate::toc::TocNode;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A loaded container: its nested outline plus a lookup from href to markup.
///
/// Lookups take `&mut self` because archive-backed sources read lazily.
pub trait BookSource {
    /// Path of the container on disk, used for error reporting.
    fn path(&self) -> &Path;

    fn toc(&self) -> Vec<TocNode>;

    /// Raw markup of the file `href` points at (without any `#anchor`).
    fn resource(&mut self, href: &str) -> Option<String>;
}

/// A book held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBook {
    path: PathBuf,
    toc: Vec<TocNode>,
    files: HashMap<String, String>,
}

impl MemoryBook {
    pub fn new(path: impl Into<PathBuf>, toc: Vec<TocNode>) -> Self {
        Self {
            path: path.into(),
            toc,
            files: HashMap::new(),
        }
    }

    pub fn with_file(mut self, href: impl Into<String>, markup: impl Into<String>) -> Self {
        self.files.insert(href.into(), markup.into());
        self
    }
}

impl BookSource for MemoryBook {
    fn path(&self) -> &Path {
        &self.path
    }

    fn toc(&self) -> Vec<TocNode> {
        self.toc.clone()
    }

    fn resource(&mut self, href: &str) -> Option<String> {
        self.files.get(href).cloned()
    }
}
