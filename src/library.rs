//! Finding books in a directory.

use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// File names (not paths) of `.epub` files directly inside `dir`, sorted.
pub fn list_epub_files(dir: &Path) -> Vec<String> {
    list_with_extension(dir, "epub")
}

/// File names (not paths) of `.pdf` files directly inside `dir`, sorted.
pub fn list_pdf_files(dir: &Path) -> Vec<String> {
    list_with_extension(dir, "pdf")
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase()),
        Some(ext) if ext == wanted
    )
}

fn list_with_extension(dir: &Path, wanted: &str) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                path = %dir.display(),
                operation = "file_listing",
                "Cannot read directory, returning no files: {err}"
            );
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, wanted))
        .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .collect();
    names.sort();

    debug!(path = %dir.display(), extension = wanted, count = names.len(), "Listed books");
    names
}
