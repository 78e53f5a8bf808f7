//! PDF loading utilities.
//!
//! PDFs have no markup to slice: chapters are page ranges driven by the
//! document outline, and pages are the unit of extraction.

use crate::error::{BookError, Operation, Result};
use crate::metadata::{Metadata, MetadataValue};
use lopdf::{Dictionary, Document, Object, ObjectId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

/// Info dictionary keys reported as text, with their output names.
const INFO_FIELDS: &[(&str, &[u8])] = &[
    ("title", b"Title"),
    ("author", b"Author"),
    ("subject", b"Subject"),
    ("creator", b"Creator"),
    ("producer", b"Producer"),
    ("creation_date", b"CreationDate"),
    ("modification_date", b"ModDate"),
    ("keywords", b"Keywords"),
];

/// Parent hops allowed when looking for an inherited MediaBox.
const MAX_PAGE_TREE_DEPTH: usize = 32;

static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("static blank-run pattern is valid"));

/// One outline (bookmark) entry; `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    pub title: String,
    pub page: usize,
    pub level: usize,
}

/// Text of a chapter and the 1-based pages it was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfChapter {
    pub content: String,
    pub pages: Vec<usize>,
}

pub struct PdfBook {
    path: PathBuf,
    doc: Document,
}

impl PdfBook {
    pub fn open(path: &Path, operation: Operation) -> Result<Self> {
        if !path.exists() {
            return Err(BookError::file_not_found(path, operation));
        }
        debug!(file_path = %path.display(), %operation, "Opening PDF");
        let doc = Document::load(path).map_err(|err| BookError::parse_failure(path, operation, err))?;
        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new();

        if let Some(info) = self.info_dictionary() {
            for (field, key) in INFO_FIELDS {
                let Ok(Object::String(bytes, _)) = info.get(key) else {
                    continue;
                };
                let value = decode_pdf_string(bytes);
                let value = value.trim();
                if !value.is_empty() {
                    meta.insert(field.to_string(), MetadataValue::Text(value.to_string()));
                }
            }
        }

        meta.insert(
            "format".to_string(),
            MetadataValue::Text(format!("PDF {}", self.doc.version)),
        );
        meta.insert(
            "pdf_version".to_string(),
            MetadataValue::Text(self.doc.version.clone()),
        );
        meta.insert(
            "pages".to_string(),
            MetadataValue::Integer(self.page_count() as u64),
        );
        if let Ok(file) = fs::metadata(&self.path) {
            meta.insert("file_size".to_string(), MetadataValue::Integer(file.len()));
        }
        meta.insert(
            "is_encrypted".to_string(),
            MetadataValue::Flag(self.doc.is_encrypted()),
        );

        let first_page = self.doc.get_pages().values().next().copied();
        if let Some((width, height)) = first_page.and_then(|id| self.page_size(id)) {
            meta.insert("page_width".to_string(), MetadataValue::Number(width));
            meta.insert("page_height".to_string(), MetadataValue::Number(height));
        }

        meta
    }

    /// Flattened outline in document order; empty when the PDF has none.
    pub fn outline(&self) -> Vec<OutlineEntry> {
        match self.doc.get_toc() {
            Ok(toc) => toc
                .toc
                .into_iter()
                .map(|item| OutlineEntry {
                    title: item.title,
                    page: item.page,
                    level: item.level,
                })
                .collect(),
            Err(err) => {
                debug!(file_path = %self.path.display(), "No usable outline: {err}");
                Vec::new()
            }
        }
    }

    /// Text of a 1-based page.
    pub fn page_text(&self, page: i64) -> Result<String> {
        self.extract_page(page, Operation::PageTextExtraction)
    }

    /// Page text with outline titles on that page promoted to headings.
    pub fn page_markdown(&self, page: i64) -> Result<String> {
        let text = self.extract_page(page, Operation::PageMarkdownExtraction)?;
        let headings: Vec<String> = self
            .outline()
            .into_iter()
            .filter(|entry| entry.page as i64 == page)
            .map(|entry| normalize_title(&entry.title))
            .collect();
        Ok(text_to_markdown(&text, &headings))
    }

    /// Chapter content for the outline entry titled `title`.
    pub fn chapter(&self, title: &str) -> Result<PdfChapter> {
        let outline = self.outline();
        let idx = find_outline_entry(&outline, title).ok_or_else(|| {
            BookError::chapter_not_found(
                &self.path,
                Operation::ChapterExtraction,
                title,
                "title is not in the document outline",
            )
        })?;

        let range = chapter_page_range(&outline, idx, self.page_count());
        let mut content = Vec::new();
        for page in range.clone() {
            content.push(self.extract_page(page as i64, Operation::ChapterExtraction)?);
        }
        Ok(PdfChapter {
            content: content.join("\n"),
            pages: range.collect(),
        })
    }

    fn extract_page(&self, page: i64, operation: Operation) -> Result<String> {
        let page_count = self.page_count();
        if page < 1 || page as usize > page_count {
            return Err(BookError::PageOutOfRange {
                path: self.path.clone(),
                operation,
                page,
                page_count,
            });
        }
        self.doc
            .extract_text(&[page as u32])
            .map_err(|err| BookError::parse_failure(&self.path, operation, err))
    }

    fn info_dictionary(&self) -> Option<&Dictionary> {
        match self.doc.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.doc.get_object(*id).ok()?.as_dict().ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Width and height of a page's MediaBox, following inheritance.
    fn page_size(&self, page_id: ObjectId) -> Option<(f64, f64)> {
        let mut current = Some(page_id);
        for _ in 0..MAX_PAGE_TREE_DEPTH {
            let dict = self.doc.get_dictionary(current?).ok()?;
            if let Ok(media_box) = dict.get(b"MediaBox") {
                return self.rect_size(media_box);
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        }
        None
    }

    fn rect_size(&self, rect: &Object) -> Option<(f64, f64)> {
        let rect = match rect {
            Object::Reference(id) => self.doc.get_object(*id).ok()?,
            other => other,
        };
        let values: Vec<f64> = rect.as_array().ok()?.iter().filter_map(as_number).collect();
        match values.as_slice() {
            [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
            _ => None,
        }
    }
}

fn as_number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

/// PDF text strings are UTF-16BE with a BOM, or a single-byte encoding.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn normalize_title(title: &str) -> String {
    title.trim().nfc().collect::<String>().to_lowercase()
}

/// Exact title first, then a trimmed, NFC, case-insensitive comparison.
pub fn find_outline_entry(outline: &[OutlineEntry], title: &str) -> Option<usize> {
    outline
        .iter()
        .position(|entry| entry.title == title)
        .or_else(|| {
            let wanted = normalize_title(title);
            outline
                .iter()
                .position(|entry| normalize_title(&entry.title) == wanted)
        })
}

/// Pages belonging to `outline[idx]`: up to the page before the next entry at
/// the same or a shallower level, or to the last page.
pub fn chapter_page_range(
    outline: &[OutlineEntry],
    idx: usize,
    page_count: usize,
) -> RangeInclusive<usize> {
    let entry = &outline[idx];
    let last_page = page_count.max(1);
    let start = entry.page.clamp(1, last_page);
    let end = outline[idx + 1..]
        .iter()
        .find(|next| next.level <= entry.level)
        .map(|next| next.page.saturating_sub(1))
        .unwrap_or(last_page);
    start..=end.clamp(start, last_page)
}

/// Render extracted page text as markdown.
pub fn text_to_markdown(text: &str, headings: &[String]) -> String {
    let mut out = String::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            out.push('\n');
        } else if headings.contains(&normalize_title(trimmed)) {
            out.push_str("\n## ");
            out.push_str(trimmed);
            out.push_str("\n\n");
        } else {
            out.push_str(trimmed);
            out.push('\n');
        }
    }
    let mut markdown = BLANK_RUNS.replace_all(out.trim(), "\n\n").into_owned();
    markdown.push('\n');
    markdown
}

pub fn get_meta(path: &Path) -> Result<Metadata> {
    let book = PdfBook::open(path, Operation::MetadataExtraction)?;
    let meta = book.metadata();
    info!(
        file_path = %path.display(),
        operation = %Operation::MetadataExtraction,
        page_count = book.page_count(),
        fields = ?meta.keys().collect::<Vec<_>>(),
        "PDF metadata extraction completed"
    );
    Ok(meta)
}

pub fn get_toc(path: &Path) -> Result<Vec<OutlineEntry>> {
    let book = PdfBook::open(path, Operation::TocExtraction)?;
    let outline = book.outline();
    info!(
        file_path = %path.display(),
        operation = %Operation::TocExtraction,
        chapter_count = outline.len(),
        "PDF TOC extraction completed"
    );
    Ok(outline)
}

pub fn extract_page_text(path: &Path, page: i64) -> Result<String> {
    PdfBook::open(path, Operation::PageTextExtraction)?.page_text(page)
}

pub fn extract_page_markdown(path: &Path, page: i64) -> Result<String> {
    PdfBook::open(path, Operation::PageMarkdownExtraction)?.page_markdown(page)
}

pub fn extract_chapter_by_title(path: &Path, title: &str) -> Result<PdfChapter> {
    let chapter = PdfBook::open(path, Operation::ChapterExtraction)?.chapter(title)?;
    info!(
        file_path = %path.display(),
        operation = %Operation::ChapterExtraction,
        title,
        pages = ?chapter.pages,
        "PDF chapter extraction completed"
    );
    Ok(chapter)
}
