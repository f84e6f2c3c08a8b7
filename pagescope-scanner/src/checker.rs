// Link health checking: one HEAD probe per link under a per-page budget

use crate::classify::ClassifiedLinks;
use crate::config::{AnalyzerConfig, DEFAULT_PROBE_BUDGET};
use crate::error::Result;
use crate::result::{BrokenLink, UNREACHABLE_STATUS};
use futures::future::{BoxFuture, join_all};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Issues the existence check for a single link and yields its status code.
pub trait ProbeTransport: Send + Sync {
    fn probe<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<u16>>;
}

/// HEAD request over a shared reqwest client.
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.probe_timeout())
            .connect_timeout(config.probe_timeout())
            .redirect(reqwest::redirect::Policy::limited(config.probe_max_redirects))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()?;
        Ok(Self { client })
    }
}

impl ProbeTransport for HttpProbe {
    fn probe<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<u16>> {
        Box::pin(async move {
            let response = self.client.head(url.clone()).send().await?;
            Ok(response.status().as_u16())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Got a response below 400.
    Healthy(u16),
    /// Got a response of 400 or above.
    HttpError(u16),
    /// No response: DNS, connect, TLS, timeout or too many redirects.
    Unreachable(String),
    /// The analysis was cancelled before this probe finished.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub url: Url,
    pub status: ProbeStatus,
}

impl ProbeOutcome {
    pub fn is_broken(&self) -> bool {
        matches!(
            self.status,
            ProbeStatus::HttpError(_) | ProbeStatus::Unreachable(_)
        )
    }

    /// Status code to record for a broken link, `None` when not broken.
    pub fn broken_code(&self) -> Option<u16> {
        match self.status {
            ProbeStatus::HttpError(code) => Some(code),
            ProbeStatus::Unreachable(_) => Some(UNREACHABLE_STATUS),
            ProbeStatus::Healthy(_) | ProbeStatus::Cancelled => None,
        }
    }
}

pub type ProbeCallback = Arc<dyn Fn(&ProbeOutcome) + Send + Sync>;

/// Turn joined probe outcomes into broken-link records, keeping their order.
pub fn collect_broken<I>(outcomes: I) -> Vec<BrokenLink>
where
    I: IntoIterator<Item = ProbeOutcome>,
{
    outcomes
        .into_iter()
        .filter_map(|outcome| {
            outcome.broken_code().map(|status_code| BrokenLink {
                url: outcome.url.to_string(),
                status_code,
            })
        })
        .collect()
}

pub struct LinkChecker {
    transport: Arc<dyn ProbeTransport>,
    budget: usize,
    global_limit: Option<Arc<Semaphore>>,
    progress_callback: Option<ProbeCallback>,
}

impl LinkChecker {
    pub fn new(transport: Arc<dyn ProbeTransport>) -> Self {
        Self {
            transport,
            budget: DEFAULT_PROBE_BUDGET,
            global_limit: None,
            progress_callback: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn ProbeTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget.max(1);
        self
    }

    /// Share a semaphore with other checkers to cap probes process-wide.
    pub fn with_global_limit(mut self, limit: Arc<Semaphore>) -> Self {
        self.global_limit = Some(limit);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProbeCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Probe every classified link and return the broken ones.
    pub async fn check(
        &self,
        links: &ClassifiedLinks,
        cancel: &CancellationToken,
    ) -> Vec<BrokenLink> {
        let urls: Vec<Url> = links.urls().cloned().collect();
        let outcomes = self.probe_all(&urls, cancel).await;

        links
            .links
            .iter()
            .zip(outcomes)
            .filter_map(|(link, outcome)| {
                outcome.broken_code().map(|status_code| BrokenLink {
                    url: link.text.clone(),
                    status_code,
                })
            })
            .collect()
    }

    /// Probe all `urls`, at most `budget` at a time, and wait for every one.
    ///
    /// Outcomes come back in the same order as `urls`.
    pub async fn probe_all(&self, urls: &[Url], cancel: &CancellationToken) -> Vec<ProbeOutcome> {
        let permits = Semaphore::new(self.budget);
        debug!(
            "Probing {} links with a budget of {}",
            urls.len(),
            self.budget
        );

        let probes = urls.iter().map(|url| {
            let permits = &permits;
            async move {
                let status = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => ProbeStatus::Cancelled,
                    status = self.probe_one(permits, url) => status,
                };
                let outcome = ProbeOutcome {
                    url: url.clone(),
                    status,
                };
                if let Some(ref callback) = self.progress_callback {
                    callback(&outcome);
                }
                outcome
            }
        });

        join_all(probes).await
    }

    async fn probe_one(&self, permits: &Semaphore, url: &Url) -> ProbeStatus {
        let Ok(_permit) = permits.acquire().await else {
            return ProbeStatus::Cancelled;
        };
        let _global_permit = match self.global_limit {
            Some(ref global) => match global.acquire().await {
                Ok(permit) => Some(permit),
                Err(_) => return ProbeStatus::Cancelled,
            },
            None => None,
        };

        match self.transport.probe(url).await {
            Ok(code) if code >= 400 => {
                debug!("Broken link {} ({})", url, code);
                ProbeStatus::HttpError(code)
            }
            Ok(code) => ProbeStatus::Healthy(code),
            Err(e) => {
                debug!("Unreachable link {}: {}", url, e);
                ProbeStatus::Unreachable(e.to_string())
            }
        }
    }
}
