pub mod analyzer;
pub mod checker;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod resolve;
pub mod result;

pub use analyzer::PageAnalyzer;
pub use checker::{HttpProbe, LinkChecker, ProbeCallback, ProbeOutcome, ProbeStatus, ProbeTransport};
pub use config::AnalyzerConfig;
pub use error::ScanError;
pub use result::{BrokenLink, HeadingProfile, HtmlVersion, LinkProfile, PageReport};

pub use tokio_util::sync::CancellationToken;
