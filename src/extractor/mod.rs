//! HTML extraction for the monitor
//!
//! Two pure operations over fetched HTML: discovering candidate pages on a
//! homepage, and reducing a page to the visible text snippet that is sent to
//! the model.

mod links;
mod text;

pub use links::{contains_keyword, extract_candidates, same_origin};
pub use text::{collapse_whitespace, truncate_chars, visible_text};
