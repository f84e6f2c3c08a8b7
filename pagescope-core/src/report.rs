// Report rendering for stored targets and one-shot scans

use crate::data::TargetStore;
use crate::error::{StoreError, StoreResult};
use crate::model::{Target, TargetId, TargetStatus};
use colored::Colorize;
use pagescope_scanner::{BrokenLink, HeadingProfile, HtmlVersion, LinkProfile, PageReport};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// A target together with whatever results its last successful run left.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetReport {
    pub target: Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headings: Option<HeadingProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<LinkProfile>,
    pub broken_links: Vec<BrokenLink>,
}

pub fn gather_report(store: &dyn TargetStore, id: TargetId) -> StoreResult<TargetReport> {
    let target = store.get_target(id)?.ok_or(StoreError::NotFound(id))?;
    Ok(TargetReport {
        target,
        headings: store.get_heading_profile(id)?,
        links: store.get_link_profile(id)?,
        broken_links: store.get_broken_links(id)?,
    })
}

pub fn render_report(report: &TargetReport, format: ReportFormat) -> serde_json::Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Json => serde_json::to_string_pretty(report),
    }
}

pub fn render_page_report(report: &PageReport, format: ReportFormat) -> serde_json::Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_page_text(report)),
        ReportFormat::Json => serde_json::to_string_pretty(report),
    }
}

pub fn generate_text_report(data: &TargetReport) -> String {
    let target = &data.target;
    let mut report = String::new();

    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!("Target #{}   {}\n", target.id, target.url.bold()));
    report.push_str(RULE);
    report.push_str("\n\n");

    report.push_str(&format!("Status:       {}\n", status_label(target.status, 0)));
    if let Some(ref message) = target.error_message {
        report.push_str(&format!("Error:        {}\n", message.red()));
    }
    report.push_str(&format!("Created:      {}\n", format_timestamp(target.created_at)));
    report.push_str(&format!("Updated:      {}\n", format_timestamp(target.updated_at)));

    if let Some(ref title) = target.title {
        report.push_str(&format!("Title:        {}\n", display_title(title)));
    }
    if let Some(version) = target.html_version {
        report.push_str(&format!("HTML version: {}\n", version));
    }
    report.push('\n');

    if let Some(ref headings) = data.headings {
        push_headings(&mut report, headings);
    }
    if let Some(ref links) = data.links {
        push_links(&mut report, links);
        push_broken_links(&mut report, &data.broken_links);
    } else if target.status != TargetStatus::Done {
        report.push_str(&format!("{}\n", "No results yet.".dimmed()));
    }

    report
}

fn generate_page_text(page: &PageReport) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!("{}\n", page.url.bold()));
    report.push_str(RULE);
    report.push_str("\n\n");
    report.push_str(&format!("Title:        {}\n", display_title(&page.title)));
    report.push_str(&format!("HTML version: {}\n\n", page.html_version));

    push_headings(&mut report, &page.headings);
    push_links(&mut report, &page.links);
    push_broken_links(&mut report, &page.broken_links);

    report
}

fn push_headings(report: &mut String, headings: &HeadingProfile) {
    report.push_str("Headings\n");
    for (level, count) in headings.as_array().iter().enumerate() {
        report.push_str(&format!("  h{}: {}\n", level + 1, count));
    }
    report.push('\n');
}

fn push_links(report: &mut String, links: &LinkProfile) {
    report.push_str("Links\n");
    report.push_str(&format!("  internal:   {}\n", links.internal_links));
    report.push_str(&format!("  external:   {}\n", links.external_links));
    report.push_str(&format!(
        "  login form: {}\n\n",
        if links.has_login_form { "yes" } else { "no" }
    ));
}

fn push_broken_links(report: &mut String, broken: &[BrokenLink]) {
    if broken.is_empty() {
        report.push_str(&format!("{}\n", "No broken links.".green()));
        return;
    }

    report.push_str(&format!("{}\n", format!("Broken links ({})", broken.len()).red().bold()));
    for link in broken {
        let code = if link.is_unreachable() {
            "unreachable".to_string()
        } else {
            link.status_code.to_string()
        };
        report.push_str(&format!("  [{}] {}\n", code.yellow(), link.url));
    }
}

fn display_title(title: &str) -> String {
    if title.is_empty() {
        "(none)".dimmed().to_string()
    } else {
        title.to_string()
    }
}

/// Coloured status name, left-padded to `width` before colouring.
pub fn status_label(status: TargetStatus, width: usize) -> String {
    let text = format!("{:<width$}", status.as_str(), width = width);
    match status {
        TargetStatus::Queued => text.cyan().to_string(),
        TargetStatus::Running => text.yellow().to_string(),
        TargetStatus::Done => text.green().to_string(),
        TargetStatus::Error => text.red().to_string(),
    }
}

pub fn format_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn html_version_label(version: Option<HtmlVersion>) -> &'static str {
    version.map(|v| v.as_str()).unwrap_or("-")
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
