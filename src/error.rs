//! Typed failures surfaced by every book operation.
//!
//! Each variant carries the file it concerns and the operation that was
//! running, so the tool layer can report them without string matching.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub type Result<T, E = BookError> = std::result::Result<T, E>;

/// Operation names used in errors and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    FileListing,
    MetadataExtraction,
    TocExtraction,
    ChapterExtraction,
    PageTextExtraction,
    PageMarkdownExtraction,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::FileListing => "file_listing",
            Operation::MetadataExtraction => "metadata_extraction",
            Operation::TocExtraction => "toc_extraction",
            Operation::ChapterExtraction => "chapter_extraction",
            Operation::PageTextExtraction => "page_text_extraction",
            Operation::PageMarkdownExtraction => "page_markdown_extraction",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of failure kinds callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileNotFound,
    ChapterNotFound,
    AnchorNotFound,
    PageOutOfRange,
    ParseFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::FileNotFound => "file_not_found",
            ErrorKind::ChapterNotFound => "chapter_not_found",
            ErrorKind::AnchorNotFound => "anchor_not_found",
            ErrorKind::PageOutOfRange => "page_out_of_range",
            ErrorKind::ParseFailure => "parse_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error("file not found: {} (operation: {operation})", path.display())]
    FileNotFound { path: PathBuf, operation: Operation },

    #[error("chapter {target} not found: {detail} (file: {}, operation: {operation})", path.display())]
    ChapterNotFound {
        path: PathBuf,
        operation: Operation,
        target: String,
        detail: String,
    },

    #[error("anchor #{anchor} not found in {file} (file: {}, operation: {operation})", path.display())]
    AnchorNotFound {
        path: PathBuf,
        operation: Operation,
        file: String,
        anchor: String,
    },

    #[error("page {page} out of range 1..={page_count} (file: {}, operation: {operation})", path.display())]
    PageOutOfRange {
        path: PathBuf,
        operation: Operation,
        page: i64,
        page_count: usize,
    },

    #[error("failed to parse {} (operation: {operation}): {source}", path.display())]
    ParseFailure {
        path: PathBuf,
        operation: Operation,
        #[source]
        source: anyhow::Error,
    },
}

impl BookError {
    pub fn file_not_found(path: &Path, operation: Operation) -> Self {
        BookError::FileNotFound {
            path: path.to_path_buf(),
            operation,
        }
    }

    pub fn chapter_not_found(
        path: &Path,
        operation: Operation,
        target: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        BookError::ChapterNotFound {
            path: path.to_path_buf(),
            operation,
            target: target.into(),
            detail: detail.into(),
        }
    }

    pub fn parse_failure(
        path: &Path,
        operation: Operation,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        BookError::ParseFailure {
            path: path.to_path_buf(),
            operation,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookError::FileNotFound { .. } => ErrorKind::FileNotFound,
            BookError::ChapterNotFound { .. } => ErrorKind::ChapterNotFound,
            BookError::AnchorNotFound { .. } => ErrorKind::AnchorNotFound,
            BookError::PageOutOfRange { .. } => ErrorKind::PageOutOfRange,
            BookError::ParseFailure { .. } => ErrorKind::ParseFailure,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            BookError::FileNotFound { path, .. }
            | BookError::ChapterNotFound { path, .. }
            | BookError::AnchorNotFound { path, .. }
            | BookError::PageOutOfRange { path, .. }
            | BookError::ParseFailure { path, .. } => path,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            BookError::FileNotFound { operation, .. }
            | BookError::ChapterNotFound { operation, .. }
            | BookError::AnchorNotFound { operation, .. }
            | BookError::PageOutOfRange { operation, .. }
            | BookError::ParseFailure { operation, .. } => *operation,
        }
    }
}
