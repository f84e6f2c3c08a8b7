use crate::checker::{HttpProbe, LinkChecker, ProbeCallback, ProbeTransport};
use crate::classify::classify_links;
use crate::config::AnalyzerConfig;
use crate::error::{Result, ScanError};
use crate::extract::extract_features;
use crate::fetch::PageFetcher;
use crate::result::{LinkProfile, PageReport};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Fetch, parse, extract, classify and health-check a single page.
///
/// One analyzer is meant to be shared by every job in a process; each call
/// to [`PageAnalyzer::analyze`] gets its own probe budget, while the optional
/// global probe limit is shared by all of them.
pub struct PageAnalyzer {
    fetcher: PageFetcher,
    checker: LinkChecker,
}

impl PageAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        let transport: Arc<dyn ProbeTransport> = Arc::new(HttpProbe::new(config)?);
        let mut checker = LinkChecker::new(transport).with_budget(config.probe_budget);
        if let Some(limit) = config.global_probe_limit {
            checker = checker.with_global_limit(Arc::new(Semaphore::new(limit)));
        }

        Ok(Self {
            fetcher: PageFetcher::new(config)?,
            checker,
        })
    }

    /// Replace the probe transport, keeping budget and global limit.
    pub fn with_transport(mut self, transport: Arc<dyn ProbeTransport>) -> Self {
        self.checker = self.checker.with_transport(transport);
        self
    }

    pub fn with_global_probe_limit(mut self, limit: Arc<Semaphore>) -> Self {
        self.checker = self.checker.with_global_limit(limit);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProbeCallback) -> Self {
        self.checker = self.checker.with_progress_callback(callback);
        self
    }

    pub async fn analyze(&self, url: &str, cancel: &CancellationToken) -> Result<PageReport> {
        let base = Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        info!("Analyzing {}", base);

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScanError::Cancelled),
            page = self.fetcher.fetch(&base) => page?,
        };

        let features = extract_features(&page.body);
        debug!(
            "Extracted title {:?}, {} ({} headings, {} hrefs)",
            features.title,
            features.html_version,
            features.headings.total(),
            features.hrefs.len()
        );

        let classified = classify_links(&base, &features.hrefs);
        let broken_links = self.checker.check(&classified, cancel).await;
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        info!(
            "Analyzed {}: {} internal, {} external, {} broken",
            base,
            classified.internal,
            classified.external,
            broken_links.len()
        );

        Ok(PageReport {
            url: base.to_string(),
            title: features.title,
            html_version: features.html_version,
            headings: features.headings,
            links: LinkProfile {
                internal_links: classified.internal,
                external_links: classified.external,
                has_login_form: features.has_login_form,
            },
            broken_links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{BrokenLink, HtmlVersion};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[tokio::test]
    async fn test_analyze_page_end_to_end() {
        let site = MockServer::start().await;
        let other = MockServer::start().await;

        let html = format!(
            r#"<!DOCTYPE html>
            <html><head><title>Home</title></head><body>
              <h1>Welcome</h1>
              <a href="/about">About</a>
              <a href="/about">About us</a>
              <a href="{}">Elsewhere</a>
              <form><input type="password" name="pw"></form>
            </body></html>"#,
            other.uri()
        );

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(html.as_bytes()),
            )
            .mount(&site)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/about"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&site)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&other)
            .await;

        let analyzer = PageAnalyzer::new(&AnalyzerConfig::default()).unwrap();
        let report = analyzer
            .analyze(&site.uri(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.title, "Home");
        assert_eq!(report.html_version, HtmlVersion::Html5);
        assert_eq!(report.headings.h1, 1);
        assert_eq!(report.links.internal_links, 2);
        assert_eq!(report.links.external_links, 1);
        assert!(report.links.has_login_form);
        assert_eq!(
            report.broken_links,
            vec![BrokenLink {
                url: other.uri(),
                status_code: 404,
            }]
        );
    }

    #[tokio::test]
    async fn test_page_error_status_fails_analysis() {
        let site = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&site)
            .await;

        let analyzer = PageAnalyzer::new(&AnalyzerConfig::default()).unwrap();
        let err = analyzer
            .analyze(&site.uri(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Status(503)));
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch() {
        let analyzer = PageAnalyzer::new(&AnalyzerConfig::default()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = analyzer
            .analyze("http://127.0.0.1:1/", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
    }

    #[tokio::test]
    async fn test_invalid_target_url() {
        let analyzer = PageAnalyzer::new(&AnalyzerConfig::default()).unwrap();
        let err = analyzer
            .analyze("not a url", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidUrl(_)));
    }
}
