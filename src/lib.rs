//! EPUB and PDF inspection exposed as tools.
//!
//! The interesting part lives in [`chapter`]: turning a table-of-contents
//! href into exactly the markup of that chapter. The loaders wrap the `epub`
//! and `lopdf` crates, and [`server`] exposes everything over JSON-RPC.

pub mod chapter;
pub mod config;
pub mod epub_loader;
pub mod error;
pub mod html_clean;
pub mod library;
pub mod metadata;
pub mod pdf_loader;
pub mod server;
pub mod source;
pub mod toc;

pub use chapter::{ChapterFormat, ChapterSpan, ResolveOptions, resolve_chapter};
pub use error::{BookError, ErrorKind, Operation, Result};
pub use metadata::{Metadata, MetadataValue};
pub use source::{BookSource, MemoryBook};
pub use toc::{TocEntry, TocNode, flatten};
