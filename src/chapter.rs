//! Chapter boundary resolution.
//!
//! A TOC entry names a file and, usually, an anchor inside it. Several entries
//! often share one physical file, so "the chapter" is the run of markup that
//! starts at the anchor and ends right before the next heading of the same or
//! a shallower rank. Deeper headings belong to the span.

use crate::error::{BookError, Operation, Result};
use crate::html_clean::{clean_html, to_markdown, to_plain_text};
use crate::source::BookSource;
use crate::toc::{TocEntry, flatten, split_href};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Rank assigned to anything that is not `h1`..`h6`; never ends a span.
pub const NON_HEADING_RANK: u8 = 7;

static HEADINGS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6").expect("static heading selector is valid")
});

static BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("static body selector is valid"));

/// Numeric heading level of a tag name; lower is higher in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HeadingRank(u8);

impl HeadingRank {
    pub fn of_tag(name: &str) -> Self {
        let bytes = name.as_bytes();
        let rank = match bytes {
            [b'h' | b'H', digit @ b'1'..=b'6'] => digit - b'0',
            _ => NON_HEADING_RANK,
        };
        HeadingRank(rank)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_heading(self) -> bool {
        self.0 < NON_HEADING_RANK
    }
}

/// How a target href was matched against the flattened TOC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HrefMatch {
    Exact,
    Decoded,
    Loose,
}

/// Knobs for resolution, normally taken from the app config.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Allow substring / path-suffix matching when exact matching fails.
    pub loose_href_match: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            loose_href_match: true,
        }
    }
}

/// The markup judged to belong to one TOC entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSpan {
    /// Serialized nodes in document order.
    pub nodes: Vec<String>,
    /// Entry that terminates this one in the TOC, if any.
    pub boundary: Option<String>,
}

impl ChapterSpan {
    pub fn to_html(&self) -> String {
        self.nodes.join("\n")
    }
}

/// Output rendering for extracted chapters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterFormat {
    Html,
    Text,
    #[default]
    Markdown,
}

impl fmt::Display for ChapterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChapterFormat::Html => "html",
            ChapterFormat::Text => "text",
            ChapterFormat::Markdown => "markdown",
        };
        write!(f, "{label}")
    }
}

/// Find the TOC entry a caller-supplied href refers to.
pub fn locate_entry(
    entries: &[TocEntry],
    target: &str,
    options: &ResolveOptions,
) -> Option<(usize, HrefMatch)> {
    if let Some(idx) = entries.iter().position(|entry| entry.href == target) {
        return Some((idx, HrefMatch::Exact));
    }

    let decoded_target = decode(target);
    if let Some(idx) = entries
        .iter()
        .position(|entry| decode(&entry.href) == decoded_target)
    {
        return Some((idx, HrefMatch::Decoded));
    }

    if !options.loose_href_match {
        return None;
    }

    let suffix = format!("/{target}");
    entries
        .iter()
        .position(|entry| {
            (target.contains('#') && entry.href.contains(target)) || entry.href.ends_with(&suffix)
        })
        .map(|idx| (idx, HrefMatch::Loose))
}

/// The first entry after `idx` whose level is not deeper than `entries[idx]`.
pub fn next_boundary(entries: &[TocEntry], idx: usize) -> Option<&TocEntry> {
    let level = entries.get(idx)?.level;
    entries[idx + 1..].iter().find(|entry| entry.level <= level)
}

/// Resolve `target` to the span of markup it names.
pub fn resolve_chapter<S>(source: &mut S, target: &str, options: &ResolveOptions) -> Result<ChapterSpan>
where
    S: BookSource + ?Sized,
{
    let book_path = source.path().to_path_buf();
    let entries = flatten(&source.toc());

    let Some((idx, matched)) = locate_entry(&entries, target, options) else {
        for (i, entry) in entries.iter().enumerate() {
            debug!(index = i, title = %entry.title, href = %entry.href, level = entry.level, "TOC entry");
        }
        return Err(BookError::chapter_not_found(
            &book_path,
            Operation::ChapterExtraction,
            target,
            "href is not in the table of contents",
        ));
    };
    let entry = &entries[idx];
    if matched == HrefMatch::Loose {
        warn!(
            file_path = %book_path.display(),
            href = target,
            matched = %entry.href,
            "Loose href match used for chapter lookup"
        );
    }

    let boundary = next_boundary(&entries, idx).map(|next| next.href.clone());
    debug!(
        href = target,
        level = entry.level,
        boundary = boundary.as_deref().unwrap_or("<end of book>"),
        "Resolved TOC position"
    );

    let (file, anchor) = split_href(target);
    let (entry_file, _) = entry.split_href();
    let markup = source
        .resource(file)
        .or_else(|| source.resource(entry_file))
        .ok_or_else(|| {
            BookError::chapter_not_found(
                &book_path,
                Operation::ChapterExtraction,
                target,
                format!("file {file} is not in the container"),
            )
        })?;

    let document = Html::parse_document(&markup);
    let nodes = match anchor {
        Some(anchor) => {
            let start = find_anchor(&document, anchor).ok_or_else(|| BookError::AnchorNotFound {
                path: book_path.clone(),
                operation: Operation::ChapterExtraction,
                file: file.to_string(),
                anchor: anchor.to_string(),
            })?;
            collect_span(start)
        }
        None => match document.select(&HEADINGS).next() {
            Some(first_heading) => collect_span(first_heading),
            None => whole_body(&document),
        },
    };

    Ok(ChapterSpan { nodes, boundary })
}

/// Cleaned HTML for one chapter.
pub fn extract_chapter_html<S>(source: &mut S, target: &str, options: &ResolveOptions) -> Result<String>
where
    S: BookSource + ?Sized,
{
    let span = resolve_chapter(source, target, options)?;
    Ok(clean_html(&span.to_html()))
}

/// One chapter rendered in the requested format.
pub fn extract_chapter<S>(
    source: &mut S,
    target: &str,
    format: ChapterFormat,
    options: &ResolveOptions,
) -> Result<String>
where
    S: BookSource + ?Sized,
{
    let html = extract_chapter_html(source, target, options)?;
    Ok(match format {
        ChapterFormat::Html => html,
        ChapterFormat::Text => to_plain_text(&html),
        ChapterFormat::Markdown => to_markdown(&html),
    })
}

/// Resolve several hrefs in order; stops at the first failure.
pub fn extract_chapters<S>(
    source: &mut S,
    targets: &[String],
    format: ChapterFormat,
    options: &ResolveOptions,
) -> Result<Vec<(String, String)>>
where
    S: BookSource + ?Sized,
{
    targets
        .iter()
        .map(|target| {
            extract_chapter(source, target, format, options)
                .map(|content| (target.clone(), content))
        })
        .collect()
}

/// Element bearing `id == anchor`, else `name == anchor`.
fn find_anchor<'a>(document: &'a Html, anchor: &str) -> Option<ElementRef<'a>> {
    let elements = || {
        document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
    };
    elements()
        .find(|element| element.value().id() == Some(anchor))
        .or_else(|| elements().find(|element| element.value().attr("name") == Some(anchor)))
}

/// Walk forward from `start` (inclusive) in document order until a heading of
/// rank <= the start's rank. Nodes holding no stopping heading are emitted
/// whole; the others are opened up so the span can end inside them.
fn collect_span(start: ElementRef<'_>) -> Vec<String> {
    let stop_at = HeadingRank::of_tag(start.value().name());
    let mut nodes = vec![start.html()];

    let mut cursor = *start;
    'walk: loop {
        let Some(next) = cursor.next_sibling() else {
            match cursor.parent() {
                Some(parent) => {
                    cursor = parent;
                    continue;
                }
                None => break,
            }
        };
        cursor = next;

        let mut stack = vec![next];
        while let Some(node) = stack.pop() {
            match node.value() {
                Node::Text(text) => nodes.push(html_escape::encode_text(&**text).into_owned()),
                Node::Element(_) => {
                    let Some(element) = ElementRef::wrap(node) else {
                        continue;
                    };
                    if stops(&element, stop_at) {
                        break 'walk;
                    }
                    let holds_stop = element
                        .descendants()
                        .skip(1)
                        .filter_map(ElementRef::wrap)
                        .any(|inner| stops(&inner, stop_at));
                    if holds_stop {
                        let children: Vec<_> = node.children().collect();
                        stack.extend(children.into_iter().rev());
                    } else {
                        nodes.push(element.html());
                    }
                }
                _ => {}
            }
        }
    }

    nodes
}

/// A span started on a non-heading element has no stopping rank.
fn stops(element: &ElementRef<'_>, stop_at: HeadingRank) -> bool {
    if !stop_at.is_heading() {
        return false;
    }
    let rank = HeadingRank::of_tag(element.value().name());
    rank.is_heading() && rank <= stop_at
}

fn whole_body(document: &Html) -> Vec<String> {
    match document.select(&BODY).next() {
        Some(body) => vec![body.inner_html()],
        None => vec![document.root_element().html()],
    }
}

fn decode(href: &str) -> String {
    percent_decode_str(href).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::source::MemoryBook;
    use crate::toc::TocNode;
    use std::path::Path;

    const CHAPTER_ONE: &str = r#"<html><head><title>c1</title></head><body>
        <h1 id="c1">Chapter 1</h1>
        <p>Chapter 1 introduction</p>
        <h2 id="s13">1.3 Append-only</h2>
        <h3>Safe updates</h3>
        <p>...log...</p>
        <h2 id="s14">1.4 Another</h2>
        <p>other</p>
    </body></html>"#;

    const CHAPTER_TWO: &str = r#"<html><body>
        <h1>Chapter 2</h1>
        <p>Second chapter body</p>
        <h2>2.1 Details</h2>
        <p>Nested detail</p>
    </body></html>"#;

    fn sample_book() -> MemoryBook {
        let toc = vec![
            TocNode::branch(
                "Chapter1",
                "c1.xhtml",
                vec![
                    TocNode::leaf("1.3 Append-only", "c1.xhtml#s13"),
                    TocNode::leaf("1.4 Another", "c1.xhtml#s14"),
                ],
            ),
            TocNode::leaf("Chapter2", "c2.xhtml"),
        ];
        MemoryBook::new("/books/sample.epub", toc)
            .with_file("c1.xhtml", CHAPTER_ONE)
            .with_file("c2.xhtml", CHAPTER_TWO)
    }

    fn html_for(book: &mut MemoryBook, target: &str) -> String {
        extract_chapter_html(book, target, &ResolveOptions::default()).expect("chapter resolves")
    }

    #[test]
    fn heading_rank_reads_numeral_or_sentinel() {
        assert_eq!(HeadingRank::of_tag("h1").value(), 1);
        assert_eq!(HeadingRank::of_tag("h6").value(), 6);
        assert_eq!(HeadingRank::of_tag("span").value(), NON_HEADING_RANK);
        assert_eq!(HeadingRank::of_tag("h7").value(), NON_HEADING_RANK);
        assert_eq!(HeadingRank::of_tag("header").value(), NON_HEADING_RANK);
        assert!(!HeadingRank::of_tag("div").is_heading());
    }

    #[test]
    fn subsection_keeps_deeper_headings_and_stops_at_sibling() {
        let mut book = sample_book();
        let html = html_for(&mut book, "c1.xhtml#s13");
        assert!(html.contains("1.3 Append-only"));
        assert!(html.contains("Safe updates"));
        assert!(html.contains("...log..."));
        assert!(!html.contains("1.4 Another"));
        assert!(!html.contains("other"));
        assert!(!html.contains("Chapter 1 introduction"));
    }

    #[test]
    fn last_subsection_runs_to_end_of_file() {
        let mut book = sample_book();
        let html = html_for(&mut book, "c1.xhtml#s14");
        assert!(html.contains("1.4 Another"));
        assert!(html.contains("other"));
        assert!(!html.contains("Safe updates"));
    }

    #[test]
    fn whole_file_entry_includes_its_subsections() {
        let mut book = sample_book();
        let html = html_for(&mut book, "c1.xhtml");
        for needle in ["Chapter 1", "introduction", "1.3 Append-only", "1.4 Another", "other"] {
            assert!(html.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn last_entry_without_anchor_returns_whole_body() {
        let mut book = sample_book();
        let html = html_for(&mut book, "c2.xhtml");
        for needle in ["Chapter 2", "Second chapter body", "2.1 Details", "Nested detail"] {
            assert!(html.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn sibling_top_level_heading_in_same_file_ends_chapter() {
        let markup = r#"<body><h1>One</h1><p>first</p><h2>Sub</h2><p>deeper</p><h1>Two</h1><p>second</p></body>"#;
        let toc = vec![TocNode::leaf("One", "a.xhtml"), TocNode::leaf("Two", "a.xhtml#two")];
        let mut book = MemoryBook::new("x.epub", toc).with_file("a.xhtml", markup);
        let html = html_for(&mut book, "a.xhtml");
        assert!(html.contains("first"));
        assert!(html.contains("deeper"));
        assert!(!html.contains("second"));
    }

    #[test]
    fn file_without_headings_falls_back_to_body() {
        let toc = vec![TocNode::leaf("Cover", "cover.xhtml")];
        let mut book = MemoryBook::new("x.epub", toc)
            .with_file("cover.xhtml", "<html><body><p>Just a cover</p></body></html>");
        let html = html_for(&mut book, "cover.xhtml");
        assert!(html.contains("Just a cover"));
    }

    #[test]
    fn stopping_heading_nested_in_later_container_is_respected() {
        let markup = r#"<body>
            <section><h2 id="a">A</h2><p>alpha</p></section>
            <section><h2 id="b">B</h2><p>beta</p></section>
        </body>"#;
        let toc = vec![TocNode::leaf("A", "s.xhtml#a"), TocNode::leaf("B", "s.xhtml#b")];
        let mut book = MemoryBook::new("x.epub", toc).with_file("s.xhtml", markup);
        let span = resolve_chapter(&mut book, "s.xhtml#a", &ResolveOptions::default())
            .expect("resolves");
        let html = span.to_html();
        assert!(html.contains("alpha"));
        assert!(!html.contains("beta"));
        assert_eq!(span.boundary.as_deref(), Some("s.xhtml#b"));
    }

    #[test]
    fn non_heading_anchor_runs_to_end_of_file() {
        let markup = r#"<body><p><span id="x">Start</span></p><h1>Far heading</h1><p>tail</p></body>"#;
        let toc = vec![TocNode::leaf("X", "f.xhtml#x")];
        let mut book = MemoryBook::new("x.epub", toc).with_file("f.xhtml", markup);
        let html = html_for(&mut book, "f.xhtml#x");
        assert!(html.contains("Start"));
        assert!(html.contains("Far heading"));
        assert!(html.contains("tail"));
    }

    #[test]
    fn non_heading_anchor_keeps_headings_nested_in_later_containers() {
        let markup = r#"<body>
            <div><a id="note"></a><p>note body</p></div>
            <section><h2>Inner heading</h2><p>inner text</p></section>
            <h1>Top heading</h1><p>last words</p>
        </body>"#;
        let toc = vec![TocNode::leaf("Note", "n.xhtml#note")];
        let mut book = MemoryBook::new("x.epub", toc).with_file("n.xhtml", markup);
        let span = resolve_chapter(&mut book, "n.xhtml#note", &ResolveOptions::default())
            .expect("resolves");
        let html = span.to_html();
        for expected in ["note body", "Inner heading", "inner text", "Top heading", "last words"] {
            assert!(html.contains(expected), "missing {expected}: {html}");
        }
    }

    #[test]
    fn name_attribute_is_accepted_as_anchor() {
        let markup = r#"<body><h2><a name="legacy"></a>Legacy</h2><p>old style</p></body>"#;
        let toc = vec![TocNode::leaf("Legacy", "l.xhtml#legacy")];
        let mut book = MemoryBook::new("x.epub", toc).with_file("l.xhtml", markup);
        let html = html_for(&mut book, "l.xhtml#legacy");
        assert!(html.contains("old style"));
    }

    #[test]
    fn unknown_href_is_chapter_not_found() {
        let mut book = sample_book();
        let err = resolve_chapter(&mut book, "c9.xhtml", &ResolveOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChapterNotFound);
        assert_eq!(err.path(), Path::new("/books/sample.epub"));
    }

    #[test]
    fn missing_anchor_is_anchor_not_found() {
        let toc = vec![TocNode::leaf("Ghost", "c1.xhtml#ghost")];
        let mut book = MemoryBook::new("x.epub", toc).with_file("c1.xhtml", CHAPTER_ONE);
        let err = resolve_chapter(&mut book, "c1.xhtml#ghost", &ResolveOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AnchorNotFound);
    }

    #[test]
    fn missing_file_is_chapter_not_found() {
        let toc = vec![TocNode::leaf("Gone", "gone.xhtml")];
        let mut book = MemoryBook::new("x.epub", toc);
        let err = resolve_chapter(&mut book, "gone.xhtml", &ResolveOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChapterNotFound);
        assert!(err.to_string().contains("gone.xhtml"));
    }

    #[test]
    fn boundary_skips_deeper_entries() {
        let entries = flatten(&sample_book().toc());
        assert_eq!(next_boundary(&entries, 0).map(|e| e.href.as_str()), Some("c2.xhtml"));
        assert_eq!(next_boundary(&entries, 1).map(|e| e.href.as_str()), Some("c1.xhtml#s14"));
        assert_eq!(next_boundary(&entries, 2).map(|e| e.href.as_str()), Some("c2.xhtml"));
        assert!(next_boundary(&entries, 3).is_none());
    }

    #[test]
    fn exact_match_wins_over_loose() {
        let entries = vec![
            TocEntry { title: "Long".into(), href: "text/c1.xhtml#s1".into(), level: 1 },
            TocEntry { title: "Short".into(), href: "c1.xhtml#s1".into(), level: 1 },
        ];
        let options = ResolveOptions::default();
        assert_eq!(locate_entry(&entries, "c1.xhtml#s1", &options), Some((1, HrefMatch::Exact)));
    }

    #[test]
    fn percent_encoded_hrefs_match_decoded_targets() {
        let entries = vec![TocEntry {
            title: "Spaced".into(),
            href: "my%20chapter.xhtml#a".into(),
            level: 1,
        }];
        let options = ResolveOptions::default();
        assert_eq!(
            locate_entry(&entries, "my chapter.xhtml#a", &options),
            Some((0, HrefMatch::Decoded))
        );
    }

    #[test]
    fn loose_match_is_opt_out() {
        let entries = vec![TocEntry {
            title: "Nested".into(),
            href: "OEBPS/c1.xhtml#s1".into(),
            level: 1,
        }];
        let loose = ResolveOptions { loose_href_match: true };
        let strict = ResolveOptions { loose_href_match: false };
        assert_eq!(locate_entry(&entries, "c1.xhtml#s1", &loose), Some((0, HrefMatch::Loose)));
        assert_eq!(locate_entry(&entries, "c1.xhtml#s1", &strict), None);
    }

    #[test]
    fn formats_render_from_same_span() {
        let mut book = sample_book();
        let options = ResolveOptions::default();
        let text = extract_chapter(&mut book, "c1.xhtml#s13", ChapterFormat::Text, &options)
            .expect("text");
        assert!(text.contains("Safe updates"));
        assert!(!text.contains('<'));
        let md = extract_chapter(&mut book, "c1.xhtml#s13", ChapterFormat::Markdown, &options)
            .expect("markdown");
        assert!(md.contains("1.3 Append-only"));
        assert!(!md.contains("1.4 Another"));
    }

    #[test]
    fn several_chapters_keep_request_order() {
        let mut book = sample_book();
        let targets = vec!["c2.xhtml".to_string(), "c1.xhtml#s14".to_string()];
        let results = extract_chapters(
            &mut book,
            &targets,
            ChapterFormat::Text,
            &ResolveOptions::default(),
        )
        .expect("both resolve");
        assert_eq!(results[0].0, "c2.xhtml");
        assert!(results[0].1.contains("Second chapter body"));
        assert!(results[1].1.contains("other"));
    }
}
