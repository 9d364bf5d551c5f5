//! # Site Monitor Module
//!
//! Runs the fetch/extract/analyze pipeline over every configured site and
//! aggregates page verdicts into one [`SiteResult`] per site.
//!
//! ## Concurrency
//!
//! A single semaphore with `max_concurrent` permits is shared by every
//! homepage fetch and every page analysis of the run, so the cap holds across
//! sites. Permits are owned guards and are released on every exit path.
//! Sites are processed in batches of `batch_size`: the sites of one batch run
//! concurrently and the next batch starts only when all of them are done.
//!
//! ## Failure handling
//!
//! Nothing below a site aborts the run. A failed homepage fetch yields a single
//! `fetch_failed` page; an invalid site URL or a panicked site task yields a
//! `SiteResult` with `error` set and no pages.

mod error;
mod results;

pub use error::MonitorError;
pub use results::{RunOutput, SiteProgress, SiteResult};

use std::fmt;
use std::sync::Arc;

use futures::future;
use rig::completion::CompletionModel;
use tokio::sync::{Semaphore, mpsc};
use tracing::{Instrument, error, info, info_span, instrument, warn};
use url::Url;

use crate::analyzer::{AnalyzeError, Analyzer, PageResult};
use crate::config::{Settings, SiteDescriptor};
use crate::error::Result;
use crate::extractor::extract_candidates;
use crate::fetcher::Fetcher;

/// Phases of a monitoring run, logged as the run advances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    LoadingConfig,
    FetchingAndAnalyzing,
    Aggregating,
    WritingResults,
    Done,
}

impl RunPhase {
    pub fn log(self) {
        info!(phase = %self, "Run phase");
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::LoadingConfig => "loading-config",
            RunPhase::FetchingAndAnalyzing => "fetching-and-analyzing",
            RunPhase::Aggregating => "aggregating",
            RunPhase::WritingResults => "writing-results",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Checks every configured site for promotions
#[derive(Clone)]
pub struct Monitor<M: CompletionModel> {
    settings: Arc<Settings>,
    fetcher: Fetcher,
    analyzer: Analyzer<M>,
    limiter: Arc<Semaphore>,
}

impl<M> Monitor<M>
where
    M: CompletionModel + 'static,
{
    /// Create a monitor that analyzes pages with `model`
    pub fn new(settings: Arc<Settings>, model: M) -> Result<Self> {
        let fetcher = Fetcher::new(&settings)?;
        let analyzer = Analyzer::new(model, fetcher.clone(), settings.clone());
        let limiter = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));
        Ok(Self {
            settings,
            fetcher,
            analyzer,
            limiter,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Check every site and return one result per site, in configured order
    pub async fn run(&self) -> RunOutput {
        self.run_with_progress(None).await
    }

    /// Like [`Monitor::run`], reporting each finished site on `progress`
    #[instrument(skip(self, progress), fields(sites = self.settings.sites.len()))]
    pub async fn run_with_progress(&self, progress: Option<mpsc::Sender<SiteProgress>>) -> RunOutput {
        RunPhase::FetchingAndAnalyzing.log();
        let mut sites = Vec::with_capacity(self.settings.sites.len());

        let batch_size = self.settings.batch_size.max(1);
        for (index, batch) in self.settings.sites.chunks(batch_size).enumerate() {
            info!(batch = index + 1, size = batch.len(), "Starting batch");

            let handles = batch
                .iter()
                .cloned()
                .map(|site| {
                    let monitor = self.clone();
                    let progress = progress.clone();
                    tokio::spawn(async move {
                        let result = monitor.check_site(site).await;
                        if let Some(progress) = progress {
                            let _ = progress.send(SiteProgress::from(&result)).await;
                        }
                        result
                    })
                })
                .collect::<Vec<_>>();

            let results = future::join_all(handles).await;
            for (site, result) in batch.iter().zip(results) {
                let site_result = match result {
                    Ok(site_result) => site_result,
                    Err(err) => {
                        error!(site = %site.url, error = %err, "Site task failed");
                        let failed = SiteResult::failed(&site.url, MonitorError::from(err).to_string());
                        if let Some(progress) = &progress {
                            let _ = progress.send(SiteProgress::from(&failed)).await;
                        }
                        failed
                    }
                };
                sites.push(site_result);
            }
        }

        RunPhase::Aggregating.log();
        let output = RunOutput::new(sites);
        info!(
            sites = output.len(),
            promotions = output.promotions_found(),
            failed = output.failed_sites(),
            "Monitoring finished"
        );
        output
    }

    /// Check one site; failures are recorded in the result
    pub async fn check_site(&self, site: SiteDescriptor) -> SiteResult {
        let span = info_span!("check_site", site = %site.url);
        match self.try_check_site(&site).instrument(span).await {
            Ok(result) => result,
            Err(err) => {
                warn!(site = %site.url, error = %err, "Site check failed");
                SiteResult::failed(site.url, err.to_string())
            }
        }
    }

    async fn try_check_site(&self, site: &SiteDescriptor) -> std::result::Result<SiteResult, MonitorError> {
        let homepage = Url::parse(site.url.trim()).map_err(|source| MonitorError::InvalidSiteUrl {
            url: site.url.clone(),
            source,
        })?;

        let fetched = {
            let _permit = self.limiter.acquire().await?;
            self.fetcher.fetch(homepage.as_str()).await
        };
        let html = match fetched {
            Ok(html) => Arc::new(html),
            Err(err) => {
                return Ok(SiteResult::from_pages(
                    &site.url,
                    vec![PageResult::fetch_failed(homepage.as_str(), err.to_string())],
                ));
            }
        };

        let candidates = extract_candidates(
            &homepage,
            &html,
            &self.settings.keywords,
            self.settings.max_pages_per_site,
        );
        info!(candidates = candidates.len(), "Analyzing candidate pages");

        // The first candidate is always the homepage, whose body is reused.
        let handles = candidates
            .iter()
            .enumerate()
            .map(|(position, url)| {
                let analyzer = self.analyzer.clone();
                let limiter = self.limiter.clone();
                let url = url.clone();
                let prefetched = (position == 0).then(|| html.clone());
                tokio::spawn(async move {
                    let _permit = match limiter.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(err) => return PageResult::failed(url, err.to_string()),
                    };
                    match prefetched {
                        Some(html) => analyzer.analyze_html(&url, &html).await,
                        None => analyzer.analyze_page(&url).await,
                    }
                })
            })
            .collect::<Vec<_>>();

        let results = future::join_all(handles).await;
        let pages = candidates
            .into_iter()
            .zip(results)
            .map(|(url, result)| {
                result.unwrap_or_else(|err| PageResult::failed(url, AnalyzeError::from(err).to_string()))
            })
            .collect();

        Ok(SiteResult::from_pages(&site.url, pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::PageStatus;
    use crate::model::MockCompletionModel;
    use mockito::{Server, ServerGuard};
    use std::time::Duration;

    const PROMO_REPLY: &str = r#"{"has_promotion": true, "promotion_summary": "20% off"}"#;

    fn settings(sites: Vec<String>) -> Arc<Settings> {
        Arc::new(
            Settings::builder()
                .sites(sites)
                .keywords(["sale"])
                .retry_count(1)
                .retry_delay(Duration::ZERO)
                .request_timeout(Duration::from_secs(5))
                .build(),
        )
    }

    async fn serve(server: &mut ServerGuard, path: &str, body: &str) {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(body)
            .create_async()
            .await;
    }

    async fn fail(server: &mut ServerGuard, path: &str) {
        server
            .mock("GET", path)
            .with_status(500)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_end_to_end_two_sites() {
        let mut site_a = Server::new_async().await;
        serve(
            &mut site_a,
            "/",
            r#"<html><body><a href="/sale-page">Big Sale</a><a href="/about">About</a></body></html>"#,
        )
        .await;
        serve(&mut site_a, "/sale-page", "<html><body>Everything 20% off</body></html>").await;

        let mut site_b = Server::new_async().await;
        fail(&mut site_b, "/").await;

        let model = MockCompletionModel::new();
        model.set_text_response(PROMO_REPLY).await;

        let monitor = Monitor::new(settings(vec![site_a.url(), site_b.url()]), model.clone()).unwrap();
        let output = monitor.run().await;

        assert_eq!(output.len(), 2);

        let a = &output.sites[0];
        assert_eq!(a.site, site_a.url());
        assert_eq!(a.pages.len(), 2);
        assert_eq!(a.pages[0].url, format!("{}/", site_a.url()));
        assert_eq!(a.pages[1].url, format!("{}/sale-page", site_a.url()));
        assert!(a.pages.iter().all(|page| page.status == PageStatus::Ok));
        assert!(a.has_promotion);
        assert_eq!(a.promotion_summaries, vec!["20% off", "20% off"]);
        assert!(a.error.is_none());

        let b = &output.sites[1];
        assert_eq!(b.site, site_b.url());
        assert!(!b.has_promotion);
        assert_eq!(b.pages.len(), 1);
        assert_eq!(b.pages[0].status, PageStatus::FetchFailed);

        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_every_site_reported_when_all_fetches_fail() {
        let mut servers = Vec::new();
        for _ in 0..3 {
            let mut server = Server::new_async().await;
            fail(&mut server, "/").await;
            servers.push(server);
        }
        let mut urls = servers.iter().map(|server| server.url()).collect::<Vec<_>>();
        urls.push("not a url".to_string());

        let model = MockCompletionModel::new();
        let monitor = Monitor::new(settings(urls.clone()), model.clone()).unwrap();
        let output = monitor.run().await;

        assert_eq!(output.len(), urls.len());
        for (result, url) in output.iter().zip(&urls) {
            assert_eq!(&result.site, url);
            assert!(!result.has_promotion);
            assert!(result.pages.len() <= 1);
            assert!(
                result
                    .pages
                    .iter()
                    .all(|page| page.status == PageStatus::FetchFailed)
            );
        }
        assert!(output.sites[3].error.is_some());
        assert!(output.sites[3].pages.is_empty());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_global() {
        let mut servers = Vec::new();
        for _ in 0..3 {
            let mut server = Server::new_async().await;
            serve(
                &mut server,
                "/",
                r#"<a href="/sale-1">sale</a><a href="/sale-2">sale</a><a href="/sale-3">sale</a>"#,
            )
            .await;
            for path in ["/sale-1", "/sale-2", "/sale-3"] {
                serve(&mut server, path, "<p>Sale</p>").await;
            }
            servers.push(server);
        }
        let urls = servers.iter().map(|server| server.url()).collect::<Vec<_>>();

        let model = MockCompletionModel::new().with_delay(Duration::from_millis(50));
        model.set_text_response(PROMO_REPLY).await;

        let settings = Arc::new(
            Settings::builder()
                .sites(urls)
                .keywords(["sale"])
                .max_concurrent(2)
                .max_pages_per_site(4)
                .retry_count(1)
                .retry_delay(Duration::ZERO)
                .build(),
        );
        let monitor = Monitor::new(settings, model.clone()).unwrap();
        let output = monitor.run().await;

        assert_eq!(output.len(), 3);
        assert!(output.iter().all(|site| site.pages.len() == 4));
        assert_eq!(model.calls(), 12);
        assert!(model.max_in_flight() <= 2, "saw {} in flight", model.max_in_flight());
        assert!(model.max_in_flight() >= 1);
    }

    #[tokio::test]
    async fn test_batches_preserve_order_and_report_progress() {
        let mut servers = Vec::new();
        for _ in 0..3 {
            let mut server = Server::new_async().await;
            serve(&mut server, "/", "<p>Nothing to see</p>").await;
            servers.push(server);
        }
        let urls = servers.iter().map(|server| server.url()).collect::<Vec<_>>();

        let model = MockCompletionModel::new();
        model
            .set_text_response(r#"{"has_promotion": false, "promotion_summary": ""}"#)
            .await;

        let settings = Arc::new(
            Settings::builder()
                .sites(urls.clone())
                .keywords(["sale"])
                .batch_size(2)
                .retry_count(1)
                .retry_delay(Duration::ZERO)
                .build(),
        );
        let monitor = Monitor::new(settings, model).unwrap();

        let (sender, mut receiver) = mpsc::channel(16);
        let output = monitor.run_with_progress(Some(sender)).await;

        let order = output.iter().map(|site| site.site.clone()).collect::<Vec<_>>();
        assert_eq!(order, urls);
        assert_eq!(output.promotions_found(), 0);

        let mut reported = Vec::new();
        while let Some(progress) = receiver.recv().await {
            reported.push(progress.site);
        }
        reported.sort();
        let mut expected = urls.clone();
        expected.sort();
        assert_eq!(reported, expected);
    }

    #[test]
    fn test_run_phase_display() {
        assert_eq!(RunPhase::FetchingAndAnalyzing.to_string(), "fetching-and-analyzing");
        assert_eq!(RunPhase::Done.to_string(), "done");
    }
}
