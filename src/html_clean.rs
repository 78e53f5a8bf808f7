//! Post-processing for extracted chapter markup.
//!
//! `clean_html` strips markup that carries no readable text (scripts, media,
//! navigation, comments, empty wrappers); the projections then render the
//! cleaned fragment as markdown or plain text.

use scraper::{ElementRef, Html, Node};

/// Elements dropped together with everything inside them. Fallback containers
/// (`noscript`, `noembed`, `noframes`) hold raw text that re-escapes on every
/// serialization, so they go too.
const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "img", "svg", "iframe", "video", "nav", "noscript", "noembed", "noframes",
];

/// The parser eats one newline right after these start tags.
const LEADING_NEWLINE_TAGS: &[&str] = &["pre", "textarea", "listing"];

/// Remove noise from an HTML fragment. Idempotent.
pub fn clean_html(html: &str) -> String {
    let mut fragment = Html::parse_fragment(html);

    let noise: Vec<_> = fragment
        .tree
        .root()
        .descendants()
        .filter(|node| match node.value() {
            Node::Comment(_) => true,
            Node::Element(element) => STRIPPED_TAGS.contains(&element.name()),
            _ => false,
        })
        .map(|node| node.id())
        .collect();
    for id in noise {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }

    let root = fragment.root_element().id();
    let empty: Vec<_> = fragment
        .root_element()
        .descendants()
        .filter(|node| node.id() != root)
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() != "br" && !has_text(element))
        .map(|element| element.id())
        .collect();
    for id in empty {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }

    // Serialization does not put the swallowed newline back; a text child
    // that still starts with one needs an extra to survive the next parse.
    let newline_led: Vec<_> = fragment
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| LEADING_NEWLINE_TAGS.contains(&element.value().name()))
        .filter_map(|element| element.first_child())
        .filter(|child| matches!(child.value(), Node::Text(text) if text.starts_with('\n')))
        .map(|child| child.id())
        .collect();
    for id in newline_led {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            if let Node::Text(text) = node.value() {
                text.text = format!("\n{}", &*text.text).into();
            }
        }
    }

    fragment.root_element().inner_html()
}

/// Render HTML as markdown; links become `[text](href)` and images
/// `![alt](src)`.
pub fn to_markdown(html: &str) -> String {
    html2md::parse_html(html)
}

/// Text content only, tags removed.
pub fn to_plain_text(html: &str) -> String {
    Html::parse_fragment(html).root_element().text().collect()
}

fn has_text(element: &ElementRef<'_>) -> bool {
    element.text().any(|chunk| !chunk.trim().is_empty())
}
