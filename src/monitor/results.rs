//! Per-site and per-run result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::PageResult;

/// Aggregated verdict for one site in one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteResult {
    /// The site URL as configured
    pub site: String,

    /// True iff any analyzed page has a promotion
    pub has_promotion: bool,

    /// Summaries of the promoting pages, in page order
    pub promotion_summaries: Vec<String>,

    /// Page results in candidate order
    pub pages: Vec<PageResult>,

    /// When the site check finished
    pub checked_at: DateTime<Utc>,

    /// Set when the site could not be processed at all
    pub error: Option<String>,
}

impl SiteResult {
    /// Aggregate page results into a site verdict
    pub fn from_pages(site: impl Into<String>, pages: Vec<PageResult>) -> Self {
        let promotion_summaries = pages
            .iter()
            .filter(|page| page.has_promotion)
            .map(|page| page.promotion_summary.clone())
            .collect::<Vec<_>>();

        Self {
            site: site.into(),
            has_promotion: pages.iter().any(|page| page.has_promotion),
            promotion_summaries,
            pages,
            checked_at: Utc::now(),
            error: None,
        }
    }

    /// A site that could not be processed
    pub fn failed(site: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            has_promotion: false,
            promotion_summaries: Vec::new(),
            pages: Vec::new(),
            checked_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// All site results of a run, in configured site order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunOutput {
    pub sites: Vec<SiteResult>,
}

impl RunOutput {
    pub fn new(sites: Vec<SiteResult>) -> Self {
        Self { sites }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteResult> {
        self.sites.iter()
    }

    /// Number of sites with at least one promoting page
    pub fn promotions_found(&self) -> usize {
        self.sites.iter().filter(|site| site.has_promotion).count()
    }

    /// Number of sites that failed before any page was analyzed
    pub fn failed_sites(&self) -> usize {
        self.sites.iter().filter(|site| site.error.is_some()).count()
    }
}

/// Progress notification sent when a site check completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProgress {
    pub site: String,
    pub has_promotion: bool,
    pub pages: usize,
    pub error: Option<String>,
}

impl From<&SiteResult> for SiteProgress {
    fn from(result: &SiteResult) -> Self {
        Self {
            site: result.site.clone(),
            has_promotion: result.has_promotion,
            pages: result.pages.len(),
            error: result.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{PageStatus, Verdict};

    fn page(url: &str, has_promotion: bool, summary: &str) -> PageResult {
        PageResult::analyzed(
            url,
            Verdict {
                has_promotion,
                promotion_summary: summary.to_string(),
            },
        )
    }

    #[test]
    fn test_from_pages_aggregates_in_page_order() {
        let result = SiteResult::from_pages(
            "https://shop.example.com",
            vec![
                page("https://shop.example.com/", false, "nothing"),
                page("https://shop.example.com/sale", true, "50% off shoes"),
                PageResult::fetch_failed("https://shop.example.com/offer", "timeout"),
                page("https://shop.example.com/deals", true, "2 for 1"),
            ],
        );

        assert!(result.has_promotion);
        assert_eq!(result.promotion_summaries, vec!["50% off shoes", "2 for 1"]);
        assert_eq!(result.pages.len(), 4);
        assert_eq!(result.pages[2].status, PageStatus::FetchFailed);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_from_pages_without_promotion() {
        let result = SiteResult::from_pages(
            "https://shop.example.com",
            vec![page("https://shop.example.com/", false, "")],
        );

        assert!(!result.has_promotion);
        assert!(result.promotion_summaries.is_empty());
    }

    #[test]
    fn test_failed_site() {
        let result = SiteResult::failed("not a url", "invalid site URL");

        assert!(!result.has_promotion);
        assert!(result.pages.is_empty());
        assert_eq!(result.error.as_deref(), Some("invalid site URL"));
    }

    #[test]
    fn test_run_output_counts() {
        let output = RunOutput::new(vec![
            SiteResult::from_pages("a", vec![page("a/", true, "sale")]),
            SiteResult::from_pages("b", vec![page("b/", false, "")]),
            SiteResult::failed("c", "boom"),
        ]);

        assert_eq!(output.len(), 3);
        assert_eq!(output.promotions_found(), 1);
        assert_eq!(output.failed_sites(), 1);
    }

    #[test]
    fn test_run_output_serializes_as_array() {
        let output = RunOutput::new(vec![SiteResult::failed("https://a.example", "boom")]);
        let value = serde_json::to_value(&output).unwrap();

        assert!(value.is_array());
        assert_eq!(value[0]["site"], "https://a.example");
        assert_eq!(value[0]["error"], "boom");
        assert_eq!(value[0]["has_promotion"], false);
    }
}
