//! Visible text extraction for prompts

use scraper::Html;

/// Elements whose text content is never shown to a visitor
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Extract the visible text of an HTML document
///
/// Text nodes are joined with single spaces, whitespace runs are collapsed and
/// the result is cut to at most `limit` characters.
pub fn visible_text(html: &str, limit: usize) -> String {
    let document = Html::parse_document(html);

    let mut raw = String::with_capacity(html.len() / 2);
    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()));
        if hidden {
            continue;
        }
        raw.push_str(text);
        raw.push(' ');
    }

    truncate_chars(&collapse_whitespace(&raw), limit)
}

/// Replace every run of whitespace with a single space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `limit` characters of `text`, never splitting a character
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
