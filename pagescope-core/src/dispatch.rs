use crate::data::TargetStore;
use crate::error::{DispatchError, DispatchResult};
use crate::job::{AnalysisJob, JobOutcome};
use crate::model::{JOB_ABORTED, STOPPED_BY_USER, Target, TargetId};
use pagescope_scanner::{CancellationToken, PageAnalyzer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, watch};
use tracing::{Instrument, debug, error, info, info_span};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Upper bound on jobs analyzing at once. `None` means unbounded.
    pub max_concurrent_jobs: Option<usize>,
}

/// Handle to a launched job. Cloneable; dropping it does not stop the job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    target_id: TargetId,
    cancel: CancellationToken,
    done: watch::Receiver<Option<JobOutcome>>,
}

impl JobHandle {
    pub fn target_id(&self) -> TargetId {
        self.target_id
    }

    /// Ask the job to wind down early. If its target is still `running` when
    /// the job notices, the target ends as `error` stopped by the user.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.done.borrow().is_some()
    }

    pub async fn finished(&mut self) -> JobOutcome {
        match self.done.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone().unwrap_or(JobOutcome::Aborted),
            Err(_) => JobOutcome::Aborted,
        }
    }
}

/// Mark a running target as stopped by the user.
///
/// Works without a dispatcher, e.g. from another process sharing the
/// database; the job that owns the target sees it is no longer running and
/// discards its results.
pub fn stop_target(store: &dyn TargetStore, id: TargetId) -> DispatchResult<()> {
    let target = store.get_target(id)?.ok_or(DispatchError::NotFound(id))?;
    if !target.is_running() || !store.fail_if_running(id, STOPPED_BY_USER)? {
        return Err(DispatchError::NotRunning(id));
    }
    info!("Stopped analysis of target {}", id);
    Ok(())
}

/// Free a target whose job task died so it does not stay `running`.
fn release_aborted(store: &dyn TargetStore, id: TargetId) {
    if let Err(e) = store.fail_if_running(id, JOB_ABORTED) {
        error!("Failed to release target {}: {}", id, e);
    }
}

/// Launches analysis jobs as detached tasks and tracks their handles.
pub struct Dispatcher {
    store: Arc<dyn TargetStore>,
    analyzer: Arc<PageAnalyzer>,
    jobs: Mutex<HashMap<TargetId, JobHandle>>,
    job_limit: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn TargetStore>, analyzer: Arc<PageAnalyzer>) -> Self {
        Self {
            store,
            analyzer,
            jobs: Mutex::new(HashMap::new()),
            job_limit: None,
        }
    }

    pub fn with_config(mut self, config: &DispatcherConfig) -> Self {
        self.job_limit = config
            .max_concurrent_jobs
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        self
    }

    /// Claim the target and spawn its job. Must be called from within a
    /// tokio runtime. The target is `running` when this returns.
    pub fn start(&self, id: TargetId) -> DispatchResult<JobHandle> {
        let target = self.store.get_target(id)?.ok_or(DispatchError::NotFound(id))?;
        if target.is_running() {
            return Err(DispatchError::AlreadyRunning(id));
        }
        if !self.store.claim_for_analysis(id)? {
            return Err(DispatchError::AlreadyRunning(id));
        }

        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(None);
        let handle = JobHandle {
            target_id: id,
            cancel: cancel.clone(),
            done: rx,
        };

        let job = AnalysisJob {
            target_id: id,
            url: target.url,
            store: Arc::clone(&self.store),
            analyzer: Arc::clone(&self.analyzer),
            cancel,
        };
        let job_limit = self.job_limit.clone();
        let store = Arc::clone(&self.store);
        let span = info_span!("job", target_id = id);

        tokio::spawn(
            async move {
                let _permit = match job_limit {
                    Some(limit) => {
                        debug!("Waiting for a job slot");
                        tokio::select! {
                            biased;
                            _ = job.cancel.cancelled() => None,
                            permit = limit.acquire_owned() => permit.ok(),
                        }
                    }
                    None => None,
                };
                let outcome = match tokio::spawn(job.run().in_current_span()).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!("Analysis task aborted: {}", e);
                        release_aborted(store.as_ref(), id);
                        JobOutcome::Aborted
                    }
                };
                let _ = tx.send(Some(outcome));
            }
            .instrument(span),
        );

        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.retain(|_, h| !h.is_finished());
        jobs.insert(id, handle.clone());
        Ok(handle)
    }

    /// Start every listed target that exists and is not running. Returns
    /// the ids actually started, in input order.
    pub fn start_bulk(&self, ids: &[TargetId]) -> Vec<TargetId> {
        let mut started = Vec::new();
        for &id in ids {
            match self.start(id) {
                Ok(_) => started.push(id),
                Err(e) => debug!("Skipping target {}: {}", id, e),
            }
        }
        info!("Bulk start: {} of {} targets launched", started.len(), ids.len());
        started
    }

    /// Force a running target to `error` and cancel its job if this
    /// dispatcher launched it.
    pub fn stop(&self, id: TargetId) -> DispatchResult<()> {
        stop_target(self.store.as_ref(), id)?;
        if let Some(handle) = self.handle(id) {
            handle.cancel();
        }
        Ok(())
    }

    pub fn status(&self, id: TargetId) -> DispatchResult<Target> {
        self.store.get_target(id)?.ok_or(DispatchError::NotFound(id))
    }

    pub fn handle(&self, id: TargetId) -> Option<JobHandle> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.get(&id).cloned()
    }

    /// Wait for a job launched here to finish, then return the stored target.
    pub async fn wait(&self, id: TargetId) -> DispatchResult<Target> {
        if let Some(mut handle) = self.handle(id) {
            let outcome = handle.finished().await;
            debug!("Job for target {} finished: {:?}", id, outcome);
        }
        self.status(id)
    }
}
