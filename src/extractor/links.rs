//! Candidate page discovery from a homepage

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector must parse"));

/// Collect the pages of a site worth analyzing
///
/// The homepage is always the first candidate. Anchors are then scanned in
/// document order; a link is kept when it resolves to the homepage's origin
/// and its URL or anchor text contains one of the (lowercased) `keywords`.
/// Duplicates are dropped and scanning stops at `max_links` candidates.
///
/// # Arguments
///
/// * `homepage` - The URL the HTML was fetched from
/// * `html` - The homepage HTML
/// * `keywords` - Lowercased keywords to look for
/// * `max_links` - Maximum number of candidates, homepage included
#[instrument(skip(homepage, html, keywords), fields(homepage = %homepage))]
pub fn extract_candidates(
    homepage: &Url,
    html: &str,
    keywords: &[String],
    max_links: usize,
) -> Vec<String> {
    let mut candidates = vec![homepage.to_string()];
    if candidates.len() >= max_links {
        return candidates;
    }

    let document = Html::parse_document(html);
    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
        else {
            continue;
        };

        let Ok(resolved) = homepage.join(href) else {
            debug!(href, "Skipping unresolvable link");
            continue;
        };
        if !same_origin(homepage, &resolved) {
            continue;
        }

        let url = resolved.to_string();
        let anchor_text = element.text().collect::<String>().to_lowercase();
        if !contains_keyword(&url.to_lowercase(), keywords)
            && !contains_keyword(&anchor_text, keywords)
        {
            continue;
        }
        if candidates.contains(&url) {
            continue;
        }

        candidates.push(url);
        if candidates.len() >= max_links {
            break;
        }
    }

    debug!(count = candidates.len(), "Extracted candidate pages");
    candidates
}

/// Scheme, host and port all match
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Case-sensitive substring match; callers lowercase both sides.
pub fn contains_keyword(haystack: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword.as_str()))
}
