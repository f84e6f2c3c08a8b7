use pagescope_scanner::HtmlVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type TargetId = i64;

/// Message stored when a user stops a running analysis.
pub const STOPPED_BY_USER: &str = "Analysis stopped by user";

/// Message stored when a job task dies without finishing (panic or shutdown).
pub const JOB_ABORTED: &str = "Analysis aborted unexpectedly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Queued => "queued",
            TargetStatus::Running => "running",
            TargetStatus::Done => "done",
            TargetStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(TargetStatus::Queued),
            "running" => Some(TargetStatus::Running),
            "done" => Some(TargetStatus::Done),
            "error" => Some(TargetStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TargetStatus::Done | TargetStatus::Error)
    }

    /// `queued -> running -> {done, error}`, and terminal states may rerun.
    pub fn can_transition_to(&self, next: TargetStatus) -> bool {
        use TargetStatus::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Running, Done)
                | (Running, Error)
                | (Done, Running)
                | (Error, Running)
        )
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A website submitted for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub url: String,
    pub status: TargetStatus,
    pub title: Option<String>,
    pub html_version: Option<HtmlVersion>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Target {
    pub fn is_running(&self) -> bool {
        self.status == TargetStatus::Running
    }
}

/// One page of a target listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPage {
    pub targets: Vec<Target>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl TargetPage {
    pub fn total_pages(&self) -> i64 {
        let size = self.page_size.max(1) as i64;
        (self.total_count + size - 1) / size
    }

    pub fn has_more(&self) -> bool {
        (self.page as i64) * (self.page_size as i64) < self.total_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TargetStatus::*;

    #[test]
    fn test_status_round_trip_strings() {
        for status in [Queued, Running, Done, Error] {
            assert_eq!(TargetStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TargetStatus::from_str("stopped"), None);
    }

    #[test]
    fn test_lifecycle_transitions() {
        assert!(Queued.can_transition_to(Running));
        assert!(Running.can_transition_to(Done));
        assert!(Running.can_transition_to(Error));
        assert!(Done.can_transition_to(Running));
        assert!(Error.can_transition_to(Running));

        assert!(!Queued.can_transition_to(Done));
        assert!(!Running.can_transition_to(Running));
        assert!(!Done.can_transition_to(Error));
        assert!(!Error.can_transition_to(Done));
    }

    #[test]
    fn test_terminal_states() {
        assert!(Done.is_terminal());
        assert!(Error.is_terminal());
        assert!(!Queued.is_terminal());
        assert!(!Running.is_terminal());
    }

    #[test]
    fn test_page_math() {
        let page = TargetPage {
            targets: Vec::new(),
            total_count: 21,
            page: 2,
            page_size: 10,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_more());

        let last = TargetPage { page: 3, ..page };
        assert!(!last.has_more());
    }
}
