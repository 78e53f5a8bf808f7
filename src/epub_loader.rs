//! EPUB loading utilities.
//!
//! Opens a container with the `epub` crate and exposes it as a
//! [`BookSource`]: the nested NCX outline plus path-based lookups into the
//! archive. Metadata and TOC listings are derived from the same handle.

use crate::chapter::{ChapterFormat, ResolveOptions, extract_chapter, extract_chapters};
use crate::error::{BookError, Operation, Result};
use crate::metadata::{Metadata, MetadataValue};
use crate::source::BookSource;
use crate::toc::{TocEntry, TocNode, flatten};
use epub::doc::{EpubDoc, NavPoint};
use percent_encoding::percent_decode_str;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Dublin Core fields reported with their first value only.
const SINGLE_FIELDS: &[&str] = &[
    "title",
    "language",
    "identifier",
    "date",
    "publisher",
    "description",
    "rights",
];

/// Dublin Core fields that may repeat; reported as lists.
const MULTI_FIELDS: &[&str] = &["creator", "contributor", "subject"];

/// An opened EPUB container.
pub struct EpubBook {
    path: PathBuf,
    doc: EpubDoc<BufReader<File>>,
}

impl EpubBook {
    /// Open the EPUB at `path`; `operation` is recorded on any failure.
    pub fn open(path: &Path, operation: Operation) -> Result<Self> {
        if !path.exists() {
            return Err(BookError::file_not_found(path, operation));
        }
        debug!(file_path = %path.display(), %operation, "Opening EPUB");
        let doc = EpubDoc::new(path).map_err(|err| BookError::parse_failure(path, operation, err))?;
        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    pub fn metadata(&self) -> Metadata {
        collect_metadata(
            self.doc
                .metadata
                .iter()
                .map(|item| (item.property.as_str(), item.value.as_str())),
        )
    }

    pub fn toc_entries(&self) -> Vec<TocEntry> {
        flatten(&self.toc())
    }

    /// Archive paths worth trying for an href taken from a TOC or a caller.
    fn candidate_paths(&self, href: &str) -> Vec<PathBuf> {
        let decoded = percent_decode_str(href).decode_utf8_lossy().into_owned();
        let mut candidates = vec![PathBuf::from(href)];
        if decoded != href {
            candidates.push(PathBuf::from(&decoded));
        }
        if !self.doc.root_base.as_os_str().is_empty() {
            candidates.push(self.doc.root_base.join(href));
            if decoded != href {
                candidates.push(self.doc.root_base.join(&decoded));
            }
        }
        candidates
    }
}

impl BookSource for EpubBook {
    fn path(&self) -> &Path {
        &self.path
    }

    fn toc(&self) -> Vec<TocNode> {
        let root = self.doc.root_base.as_path();
        self.doc.toc.iter().map(|point| nav_to_node(point, root)).collect()
    }

    fn resource(&mut self, href: &str) -> Option<String> {
        for candidate in self.candidate_paths(href) {
            if let Some(markup) = self.doc.get_resource_str_by_path(&candidate) {
                debug!(href, resolved = %candidate.display(), "Loaded container file");
                return Some(markup);
            }
        }
        None
    }
}

/// TOC hrefs are reported relative to the package document.
fn nav_to_node(point: &NavPoint, root: &Path) -> TocNode {
    let title = point.label.trim().to_string();
    let content = point.content.strip_prefix(root).unwrap_or(&point.content);
    let href = content.to_string_lossy().into_owned();
    if point.children.is_empty() {
        TocNode::leaf(title, href)
    } else {
        let children = point.children.iter().map(|child| nav_to_node(child, root)).collect();
        TocNode::branch(title, href, children)
    }
}

/// Build the metadata map from `(property, value)` pairs in document order.
pub fn collect_metadata<'a, I>(items: I) -> Metadata
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut meta = Metadata::new();
    for (property, value) in items {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if SINGLE_FIELDS.contains(&property) {
            meta.entry(property.to_string())
                .or_insert_with(|| MetadataValue::Text(value.to_string()));
        } else if MULTI_FIELDS.contains(&property) {
            let slot = meta
                .entry(property.to_string())
                .or_insert_with(|| MetadataValue::List(Vec::new()));
            if let MetadataValue::List(values) = slot {
                values.push(value.to_string());
            }
        }
    }
    meta
}

/// Standard metadata fields of the EPUB at `path`.
pub fn get_meta(path: &Path) -> Result<Metadata> {
    let book = EpubBook::open(path, Operation::MetadataExtraction)?;
    let meta = book.metadata();
    info!(
        file_path = %path.display(),
        operation = %Operation::MetadataExtraction,
        fields = ?meta.keys().collect::<Vec<_>>(),
        "EPUB metadata extraction completed"
    );
    Ok(meta)
}

/// Flattened table of contents in reading order.
pub fn get_toc(path: &Path) -> Result<Vec<TocEntry>> {
    let book = EpubBook::open(path, Operation::TocExtraction)?;
    let entries = book.toc_entries();
    info!(
        file_path = %path.display(),
        operation = %Operation::TocExtraction,
        chapter_count = entries.len(),
        "EPUB TOC extraction completed"
    );
    Ok(entries)
}

/// One chapter of the EPUB at `path`, rendered as `format`.
pub fn get_chapter(
    path: &Path,
    href: &str,
    format: ChapterFormat,
    options: &ResolveOptions,
) -> Result<String> {
    let mut book = EpubBook::open(path, Operation::ChapterExtraction)?;
    let content = extract_chapter(&mut book, href, format, options)?;
    info!(
        file_path = %path.display(),
        operation = %Operation::ChapterExtraction,
        href,
        %format,
        total_chars = content.len(),
        "EPUB chapter extraction completed"
    );
    Ok(content)
}

/// Several chapters from one open handle, in request order.
pub fn get_chapters(
    path: &Path,
    hrefs: &[String],
    format: ChapterFormat,
    options: &ResolveOptions,
) -> Result<Vec<(String, String)>> {
    let mut book = EpubBook::open(path, Operation::ChapterExtraction)?;
    let chapters = extract_chapters(&mut book, hrefs, format, options)?;
    info!(
        file_path = %path.display(),
        operation = %Operation::ChapterExtraction,
        chapter_count = chapters.len(),
        %format,
        "EPUB multi-chapter extraction completed"
    );
    Ok(chapters)
}
