pub mod data;
pub mod dispatch;
pub mod error;
pub mod job;
pub mod model;
pub mod report;

pub use data::{Database, TargetStore};
pub use dispatch::{Dispatcher, DispatcherConfig, JobHandle};
pub use error::{DispatchError, StoreError};
pub use job::{AnalysisJob, JobOutcome};
pub use model::{JOB_ABORTED, STOPPED_BY_USER, Target, TargetId, TargetPage, TargetStatus};
pub use report::{ReportFormat, TargetReport};
