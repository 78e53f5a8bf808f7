//! Tool catalogue and dispatch.
//!
//! Each tool deserializes its own argument struct, calls into the loaders
//! and returns either plain text or a JSON payload.

use crate::chapter::ChapterFormat;
use crate::config::AppConfig;
use crate::error::BookError;
use crate::{epub_loader, library, pdf_loader};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::PathBuf;

/// Successful tool payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Json(Value),
}

impl ToolOutput {
    /// Text shown to the client.
    pub fn render(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolCallError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("failed to encode {tool} result: {source}")]
    Encode {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Book(#[from] BookError),
}

#[derive(Deserialize)]
struct DirectoryArgs {
    path: PathBuf,
}

#[derive(Deserialize)]
struct EpubArgs {
    epub_path: PathBuf,
}

#[derive(Deserialize)]
struct EpubChapterArgs {
    epub_path: PathBuf,
    chapter_id: String,
    #[serde(default)]
    format: ChapterFormat,
}

#[derive(Deserialize)]
struct EpubChaptersArgs {
    epub_path: PathBuf,
    chapter_ids: Vec<String>,
    #[serde(default)]
    format: ChapterFormat,
}

#[derive(Deserialize)]
struct PdfArgs {
    pdf_path: PathBuf,
}

#[derive(Deserialize)]
struct PdfPageArgs {
    pdf_path: PathBuf,
    page_number: i64,
}

#[derive(Deserialize)]
struct PdfChapterArgs {
    pdf_path: PathBuf,
    chapter_title: String,
}

fn tool(name: &str, description: &str, input_schema: Value) -> Value {
    json!({ "name": name, "description": description, "inputSchema": input_schema })
}

fn path_schema(key: &str, description: &str) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        key.to_string(),
        json!({ "type": "string", "description": description }),
    );
    json!({ "type": "object", "properties": properties, "required": [key] })
}

/// Entries for `tools/list`.
pub fn definitions() -> Vec<Value> {
    let format = json!({
        "type": "string",
        "enum": ["markdown", "html", "text"],
        "description": "Output rendering, markdown by default"
    });
    vec![
        tool(
            "list_epub_files",
            "List the .epub files directly inside a directory",
            path_schema("path", "Directory to scan"),
        ),
        tool(
            "get_epub_metadata",
            "Standard Dublin Core metadata of an EPUB",
            path_schema("epub_path", "Path to the .epub file"),
        ),
        tool(
            "get_epub_toc",
            "Flattened table of contents of an EPUB as (title, href) pairs",
            path_schema("epub_path", "Path to the .epub file"),
        ),
        tool(
            "get_epub_chapter",
            "Content of one chapter, addressed by a TOC href such as 'ch1.xhtml#s2'",
            json!({
                "type": "object",
                "properties": {
                    "epub_path": { "type": "string" },
                    "chapter_id": { "type": "string", "description": "TOC href, optionally with #anchor" },
                    "format": format.clone()
                },
                "required": ["epub_path", "chapter_id"]
            }),
        ),
        tool(
            "get_epub_chapters",
            "Content of several chapters from one EPUB, in request order",
            json!({
                "type": "object",
                "properties": {
                    "epub_path": { "type": "string" },
                    "chapter_ids": { "type": "array", "items": { "type": "string" } },
                    "format": format
                },
                "required": ["epub_path", "chapter_ids"]
            }),
        ),
        tool(
            "list_pdf_files",
            "List the .pdf files directly inside a directory",
            path_schema("path", "Directory to scan"),
        ),
        tool(
            "get_pdf_metadata",
            "Document info, page count, encryption flag and page size of a PDF",
            path_schema("pdf_path", "Path to the .pdf file"),
        ),
        tool(
            "get_pdf_toc",
            "PDF outline as (title, page) pairs; pages are 1-based",
            path_schema("pdf_path", "Path to the .pdf file"),
        ),
        tool(
            "get_pdf_page_text",
            "Plain text of one 1-based PDF page",
            page_schema(),
        ),
        tool(
            "get_pdf_page_markdown",
            "Markdown of one 1-based PDF page",
            page_schema(),
        ),
        tool(
            "get_pdf_chapter",
            "Text of the pages covered by an outline entry, looked up by title",
            json!({
                "type": "object",
                "properties": {
                    "pdf_path": { "type": "string" },
                    "chapter_title": { "type": "string" }
                },
                "required": ["pdf_path", "chapter_title"]
            }),
        ),
    ]
}

fn page_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "pdf_path": { "type": "string" },
            "page_number": { "type": "integer", "minimum": 1 }
        },
        "required": ["pdf_path", "page_number"]
    })
}

fn parse<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolCallError> {
    serde_json::from_value(arguments).map_err(|err| ToolCallError::InvalidArguments {
        tool: tool.to_string(),
        reason: err.to_string(),
    })
}

fn to_json(tool: &str, value: impl serde::Serialize) -> Result<ToolOutput, ToolCallError> {
    serde_json::to_value(value)
        .map(ToolOutput::Json)
        .map_err(|source| ToolCallError::Encode {
            tool: tool.to_string(),
            source,
        })
}

/// Run tool `name` with `arguments`.
pub fn call(config: &AppConfig, name: &str, arguments: Value) -> Result<ToolOutput, ToolCallError> {
    let options = config.resolve_options();

    let output = match name {
        "list_epub_files" => {
            let args: DirectoryArgs = parse(name, arguments)?;
            to_json(name, library::list_epub_files(&args.path))?
        }
        "get_epub_metadata" => {
            let args: EpubArgs = parse(name, arguments)?;
            to_json(name, epub_loader::get_meta(&args.epub_path)?)?
        }
        "get_epub_toc" => {
            let args: EpubArgs = parse(name, arguments)?;
            let pairs: Vec<(String, String)> = epub_loader::get_toc(&args.epub_path)?
                .into_iter()
                .map(|entry| (entry.title, entry.href))
                .collect();
            to_json(name, pairs)?
        }
        "get_epub_chapter" => {
            let args: EpubChapterArgs = parse(name, arguments)?;
            ToolOutput::Text(epub_loader::get_chapter(
                &args.epub_path,
                &args.chapter_id,
                args.format,
                &options,
            )?)
        }
        "get_epub_chapters" => {
            let args: EpubChaptersArgs = parse(name, arguments)?;
            let chapters = epub_loader::get_chapters(
                &args.epub_path,
                &args.chapter_ids,
                args.format,
                &options,
            )?;
            let items: Vec<Value> = chapters
                .into_iter()
                .map(|(href, content)| json!({ "href": href, "content": content }))
                .collect();
            ToolOutput::Json(Value::Array(items))
        }
        "list_pdf_files" => {
            let args: DirectoryArgs = parse(name, arguments)?;
            to_json(name, library::list_pdf_files(&args.path))?
        }
        "get_pdf_metadata" => {
            let args: PdfArgs = parse(name, arguments)?;
            to_json(name, pdf_loader::get_meta(&args.pdf_path)?)?
        }
        "get_pdf_toc" => {
            let args: PdfArgs = parse(name, arguments)?;
            let pairs: Vec<(String, usize)> = pdf_loader::get_toc(&args.pdf_path)?
                .into_iter()
                .map(|entry| (entry.title, entry.page))
                .collect();
            to_json(name, pairs)?
        }
        "get_pdf_page_text" => {
            let args: PdfPageArgs = parse(name, arguments)?;
            ToolOutput::Text(pdf_loader::extract_page_text(&args.pdf_path, args.page_number)?)
        }
        "get_pdf_page_markdown" => {
            let args: PdfPageArgs = parse(name, arguments)?;
            ToolOutput::Text(pdf_loader::extract_page_markdown(
                &args.pdf_path,
                args.page_number,
            )?)
        }
        "get_pdf_chapter" => {
            let args: PdfChapterArgs = parse(name, arguments)?;
            let chapter = pdf_loader::extract_chapter_by_title(&args.pdf_path, &args.chapter_title)?;
            to_json(name, chapter)?
        }
        other => return Err(ToolCallError::UnknownTool(other.to_string())),
    };
    Ok(output)
}
