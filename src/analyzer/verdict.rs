//! Turning free-form model output into a promotion verdict
//!
//! The model is asked for a single JSON object but is not trusted to return
//! one. [`parse_structured`] looks for the outermost `{ ... }` span and
//! decodes it; when that fails, [`heuristic_verdict`] falls back to keyword
//! search over the raw text. Both stages are pure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extractor::{contains_keyword, truncate_chars};

/// Characters of raw model output kept as the summary when no JSON is found
pub const FALLBACK_SUMMARY_CHARS: usize = 500;

/// Promotion judgment for a single page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub has_promotion: bool,
    pub promotion_summary: String,
}

/// Parse a raw model response, falling back to keyword matching
///
/// `keywords` must already be lowercased.
pub fn parse_verdict(raw: &str, keywords: &[String]) -> Verdict {
    parse_structured(raw).unwrap_or_else(|| heuristic_verdict(raw, keywords))
}

/// Decode the span between the first `{` and the last `}` as a JSON object
pub fn parse_structured(raw: &str) -> Option<Verdict> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }

    let value: Value = serde_json::from_str(&raw[start..=end]).ok()?;
    let object = value.as_object()?;

    Some(Verdict {
        has_promotion: object.get("has_promotion").is_some_and(is_truthy),
        promotion_summary: summary_text(object.get("promotion_summary")),
    })
}

/// Keyword search over the raw response, keeping its head as the summary
pub fn heuristic_verdict(raw: &str, keywords: &[String]) -> Verdict {
    Verdict {
        has_promotion: contains_keyword(&raw.to_lowercase(), keywords),
        promotion_summary: truncate_chars(raw.trim(), FALLBACK_SUMMARY_CHARS),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => matches!(
            text.trim().to_lowercase().as_str(),
            "true" | "yes" | "1"
        ),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

fn summary_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
