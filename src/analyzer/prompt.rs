//! Prompt construction for page analysis

/// System preamble sent with every analysis request
pub const PREAMBLE: &str = "You are an AI website monitor. You inspect the text of web pages \
and report promotions, sales, discounts and special offers.";

/// Build the analysis prompt for one page
///
/// The model is asked for a single line of strict JSON with the fields
/// `has_promotion` and `promotion_summary`.
pub fn build_prompt(url: &str, snippet: &str) -> String {
    format!(
        "Analyze the content of the web page below and decide whether it advertises a promotion, \
sale, discount or special offer.\n\
If it does, summarize the promotion concisely, including product type, discount amount and \
expiration date when they are mentioned.\n\n\
Respond with one line of strict JSON and nothing else, exactly in this shape:\n\
{{\"has_promotion\": true or false, \"promotion_summary\": \"short summary, empty if none\"}}\n\n\
Page URL: {url}\n\
Page content:\n\
{snippet}\n"
    )
}
