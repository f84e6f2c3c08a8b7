use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_PROBE_MAX_REDIRECTS: usize = 5;
pub const DEFAULT_PROBE_BUDGET: usize = 10;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Tunables for fetching a page and probing its links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub page_timeout_secs: u64,
    pub page_max_redirects: usize,
    pub probe_timeout_secs: u64,
    pub probe_max_redirects: usize,
    /// Probes allowed in flight at once for a single page.
    pub probe_budget: usize,
    /// Probes allowed in flight across every page analysed by this process.
    pub global_probe_limit: Option<usize>,
    pub user_agent: String,
    pub max_body_bytes: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: DEFAULT_PAGE_TIMEOUT_SECS,
            page_max_redirects: DEFAULT_PAGE_MAX_REDIRECTS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            probe_max_redirects: DEFAULT_PROBE_MAX_REDIRECTS,
            probe_budget: DEFAULT_PROBE_BUDGET,
            global_probe_limit: None,
            user_agent: format!("pagescope/{}", env!("CARGO_PKG_VERSION")),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ScanError::Config(format!("invalid analyzer config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe_budget == 0 {
            return Err(ScanError::Config("probe_budget must be at least 1".to_string()));
        }
        if self.global_probe_limit == Some(0) {
            return Err(ScanError::Config(
                "global_probe_limit must be at least 1".to_string(),
            ));
        }
        if self.page_timeout_secs == 0 || self.probe_timeout_secs == 0 {
            return Err(ScanError::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}
