use crate::data::TargetStore;
use crate::model::{STOPPED_BY_USER, TargetId};
use pagescope_scanner::{CancellationToken, PageAnalyzer, ScanError};
use std::sync::Arc;
use tracing::{error, info, warn};

/// How a single analysis job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Results persisted and the target is `done`.
    Completed,
    /// The target was moved to `error` with this message.
    Failed(String),
    /// The target stopped being `running` before the job could finalize
    /// (stopped by a user or deleted), so nothing was written.
    Superseded,
    /// The job task ended without reporting (panic or runtime shutdown).
    /// A target left `running` is moved to `error`.
    Aborted,
}

/// Everything one job needs; the target must already be claimed.
pub struct AnalysisJob {
    pub target_id: TargetId,
    pub url: String,
    pub store: Arc<dyn TargetStore>,
    pub analyzer: Arc<PageAnalyzer>,
    pub cancel: CancellationToken,
}

impl AnalysisJob {
    /// Run the pipeline to completion and finalize the target.
    ///
    /// Every finalizing write is conditional on the target still being
    /// `running`, so a stop that lands mid-flight is never overwritten.
    pub async fn run(self) -> JobOutcome {
        info!("Analysis started for {}", self.url);

        let report = match self.analyzer.analyze(&self.url, &self.cancel).await {
            Ok(report) => report,
            Err(ScanError::Cancelled) => {
                info!("Analysis cancelled");
                return self.fail(STOPPED_BY_USER);
            }
            Err(e) => {
                warn!("Analysis failed: {}", e);
                return self.fail(&e.to_string());
            }
        };

        match self.store.store_report(self.target_id, &report) {
            Ok(true) => {
                info!(
                    "Analysis done: {} internal, {} external, {} broken",
                    report.links.internal_links,
                    report.links.external_links,
                    report.broken_links.len()
                );
                JobOutcome::Completed
            }
            Ok(false) => {
                info!("Target no longer running, discarding results");
                JobOutcome::Superseded
            }
            Err(e) => {
                warn!("Failed to persist results: {}", e);
                self.fail(&e.to_string())
            }
        }
    }

    fn fail(&self, message: &str) -> JobOutcome {
        match self.store.fail_if_running(self.target_id, message) {
            Ok(true) => JobOutcome::Failed(message.to_string()),
            Ok(false) => JobOutcome::Superseded,
            Err(e) => {
                error!("Failed to record error status: {}", e);
                JobOutcome::Failed(message.to_string())
            }
        }
    }
}
