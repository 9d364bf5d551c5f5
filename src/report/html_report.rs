//! Static HTML report of a run

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::analyzer::PageStatus;
use crate::monitor::RunOutput;

/// Render a standalone HTML page listing every site and its pages
pub fn render_html(output: &RunOutput, generated_at: DateTime<Utc>) -> String {
    let mut html = String::new();
    let generated = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Promotion report</title>\n");
    html.push_str(
        "<style>body{font-family:sans-serif;margin:2em}table{border-collapse:collapse;width:100%}\
td,th{border:1px solid #ccc;padding:4px 8px;vertical-align:top;text-align:left}\
.promo{background:#e8f6e8}.failed{background:#fbeaea}</style>\n",
    );
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(
        html,
        "<h1>Promotion report</h1>\n<p>Generated {}. {} sites checked, {} with promotions.</p>",
        escape_html(&generated),
        output.len(),
        output.promotions_found()
    );

    html.push_str("<table>\n<tr><th>Site</th><th>Promotion</th><th>Summaries</th><th>Pages</th><th>Checked</th></tr>\n");
    for site in output.iter() {
        let class = if site.has_promotion {
            "promo"
        } else if site.error.is_some() {
            "failed"
        } else {
            ""
        };
        let _ = write!(
            html,
            "<tr class=\"{class}\"><td><a href=\"{url}\">{url}</a></td><td>{verdict}</td><td>",
            url = escape_html(&site.site),
            verdict = if site.has_promotion { "yes" } else { "no" },
        );

        if let Some(error) = &site.error {
            let _ = write!(html, "<em>{}</em>", escape_html(error));
        } else if !site.promotion_summaries.is_empty() {
            html.push_str("<ul>");
            for summary in &site.promotion_summaries {
                let _ = write!(html, "<li>{}</li>", escape_html(summary));
            }
            html.push_str("</ul>");
        }

        html.push_str("</td><td><ul>");
        for page in &site.pages {
            let status = match page.status {
                PageStatus::Ok if page.has_promotion => "promotion",
                PageStatus::Ok => "no promotion",
                PageStatus::FetchFailed => "fetch failed",
                PageStatus::Error => "error",
            };
            let _ = write!(html, "<li>{} ({})", escape_html(&page.url), status);
            if let Some(error) = &page.error {
                let _ = write!(html, ": {}", escape_html(error));
            }
            html.push_str("</li>");
        }
        let _ = writeln!(
            html,
            "</ul></td><td>{}</td></tr>",
            site.checked_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
