use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pagescope_core::data::{Database, TargetStore};
use pagescope_core::dispatch::{Dispatcher, DispatcherConfig, stop_target};
use pagescope_core::model::{Target, TargetId, TargetStatus};
use pagescope_core::report::{
    ReportFormat, format_timestamp, gather_report, html_version_label, render_page_report,
    render_report, save_report, status_label,
};
use pagescope_scanner::{AnalyzerConfig, CancellationToken, PageAnalyzer, ProbeOutcome};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Contents of the `--config` JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analyzer: AnalyzerConfig,
    pub dispatcher: DispatcherConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.analyzer.validate()?;
        Ok(config)
    }

    /// Apply per-command flags on top of the file values.
    pub fn apply_overrides(&mut self, args: &ArgMatches) {
        if let Ok(Some(budget)) = args.try_get_one::<usize>("probe-budget") {
            self.analyzer.probe_budget = *budget;
        }
        if let Ok(Some(timeout)) = args.try_get_one::<u64>("probe-timeout") {
            self.analyzer.probe_timeout_secs = *timeout;
        }
        if let Ok(Some(jobs)) = args.try_get_one::<usize>("max-jobs") {
            self.dispatcher.max_concurrent_jobs = Some(*jobs);
        }
    }
}

/// Default tracing filter for the given verbosity flags.
pub fn log_filter(quiet: bool, verbose: bool) -> &'static str {
    if verbose {
        "pagescope=debug,pagescope_core=debug,pagescope_scanner=debug"
    } else if quiet {
        "warn"
    } else {
        "warn,pagescope=info,pagescope_core=info,pagescope_scanner=info"
    }
}

pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.host_str().is_some_and(|h| !h.is_empty())
    {
        return Some(with_scheme);
    }

    warn!("Skipping invalid URL '{}'", line);
    None
}

pub fn parse_report_format(args: &ArgMatches) -> Result<ReportFormat> {
    let raw = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    ReportFormat::from_str(raw).ok_or_else(|| anyhow!("Unsupported report format '{}'", raw))
}

pub fn format_target_row(target: &Target) -> String {
    let title = target
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or("-");
    format!(
        "{:>5}  {} {:<10} {}  {}",
        target.id,
        status_label(target.status, 9),
        html_version_label(target.html_version),
        target.url,
        title.dimmed()
    )
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

fn spinner(quiet: bool, template: &str) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template(template)?);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn open_database(args: &ArgMatches) -> Result<Arc<Database>> {
    let raw = args
        .get_one::<String>("db")
        .map(String::as_str)
        .unwrap_or(crate::commands::DEFAULT_DB_PATH);
    let path = expand_path(raw);
    if !Database::exists(&path) {
        bail!(
            "No database at {}. Run `pagescope init` first or pass --db.",
            path.display()
        );
    }
    let db = Database::new(&path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(db))
}

fn load_config(args: &ArgMatches) -> Result<AppConfig> {
    let mut config = AppConfig::load(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    config.apply_overrides(args);
    Ok(config)
}

/// Drop repeated ids, keeping the first occurrence of each.
pub fn dedup_ids<I: IntoIterator<Item = TargetId>>(ids: I) -> Vec<TargetId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn id_args(args: &ArgMatches) -> Vec<TargetId> {
    args.get_many::<i64>("ID")
        .map(|ids| dedup_ids(ids.copied()))
        .unwrap_or_default()
}

fn emit(content: &str, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            save_report(content, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", content),
    }
    Ok(())
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    let raw_dir = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(crate::commands::DEFAULT_CONFIG_DIR);
    let force = args.get_flag("force");
    let config_dir = expand_path(raw_dir);
    let db_path = config_dir.join("pagescope.db");

    print_divider();
    println!("{}", "  PAGESCOPE INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    if Database::exists(&db_path) {
        if !force {
            println!("{}", "⚠ WARNING".yellow().bold());
            println!("Database already exists at:");
            println!(
                "  {} {}",
                "•".yellow(),
                db_path.display().to_string().bright_white()
            );
            println!();

            let response = print_prompt("Would you like to overwrite it? [y/N]:")?;
            println!();
            if response != "y" && response != "yes" {
                println!("{} Keeping existing database", "→".blue());
                return Ok(());
            }
        }
        Database::remove(&db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
        println!("{} Existing database removed", "✓".green().bold());
    }

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    Database::new(&db_path)
        .with_context(|| format!("Failed to create database {}", db_path.display()))?;

    println!(
        "{} Database initialized: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    Ok(())
}

pub fn handle_add(args: &ArgMatches) -> Result<()> {
    let db = open_database(args)?;

    let urls = match args.get_one::<PathBuf>("hosts-file") {
        Some(path) => load_urls_from_file(path).map_err(|e| anyhow!(e))?,
        None => args
            .get_one::<String>("URL")
            .cloned()
            .into_iter()
            .collect(),
    };

    let mut failures = 0;
    for url in &urls {
        match db.create_target(url) {
            Ok(id) => println!("{} {:>5}  {}", "✓".green().bold(), id, url),
            Err(e) => {
                failures += 1;
                eprintln!("{} {}", "✗".red().bold(), e);
            }
        }
    }

    if failures == urls.len() {
        bail!("No targets were added");
    }
    Ok(())
}

pub fn handle_list(args: &ArgMatches) -> Result<()> {
    let db = open_database(args)?;
    let page = *args.get_one::<u32>("page").unwrap_or(&1);
    let page_size = *args.get_one::<u32>("page-size").unwrap_or(&10);
    let listing = db.list_targets(page, page_size)?;

    if parse_report_format(args)? == ReportFormat::Json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if listing.targets.is_empty() {
        println!("No targets on page {}.", listing.page);
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{:>5}  {:<9} {:<10} {}",
            "ID", "STATUS", "HTML", "URL"
        )
        .bold()
    );
    for target in &listing.targets {
        println!("{}", format_target_row(target));
    }
    println!(
        "\nPage {} of {} ({} targets)",
        listing.page,
        listing.total_pages().max(1),
        listing.total_count
    );
    Ok(())
}

pub async fn handle_analyze(args: &ArgMatches) -> Result<()> {
    let quiet = args.get_flag("quiet");
    let config = load_config(args)?;
    let db = open_database(args)?;
    let analyzer = Arc::new(PageAnalyzer::new(&config.analyzer)?);
    let dispatcher = Dispatcher::new(db, analyzer).with_config(&config.dispatcher);

    let ids = id_args(args);
    let started = if let [id] = ids.as_slice() {
        dispatcher.start(*id)?;
        vec![*id]
    } else {
        let started = dispatcher.start_bulk(&ids);
        for id in ids.iter().filter(|id| !started.contains(id)) {
            eprintln!(
                "{} Skipped target {} (missing or already running)",
                "→".yellow(),
                id
            );
        }
        started
    };

    if started.is_empty() {
        bail!("No analyses were started");
    }

    let pb = spinner(quiet, "{spinner:.cyan} {msg}")?;
    pb.set_message(format!("Analyzing {} target(s)...", started.len()));

    let wait_all = async {
        let mut finished = Vec::with_capacity(started.len());
        for &id in &started {
            finished.push(dispatcher.wait(id).await?);
            pb.set_message(format!("{}/{} analyses finished", finished.len(), started.len()));
        }
        Ok::<_, pagescope_core::DispatchError>(finished)
    };

    let finished = tokio::select! {
        finished = wait_all => finished?,
        _ = tokio::signal::ctrl_c() => {
            pb.finish_and_clear();
            for &id in &started {
                if let Err(e) = dispatcher.stop(id) {
                    debug!("Not stopping target {}: {}", id, e);
                }
            }
            bail!("Interrupted; running analyses were stopped");
        }
    };
    pb.finish_and_clear();

    for target in &finished {
        println!("{}", format_target_row(target));
        if let Some(ref message) = target.error_message {
            println!("       {}", message.red());
        }
    }

    if finished.iter().any(|t| t.status == TargetStatus::Error) {
        bail!("One or more analyses failed");
    }
    Ok(())
}

pub fn handle_stop(args: &ArgMatches) -> Result<()> {
    let db = open_database(args)?;
    let id = *args
        .get_one::<i64>("ID")
        .ok_or_else(|| anyhow!("A target id is required"))?;

    stop_target(db.as_ref(), id)?;

    println!("{} Stopped analysis of target {}", "✓".green().bold(), id);
    Ok(())
}

pub fn handle_status(args: &ArgMatches) -> Result<()> {
    let db = open_database(args)?;
    let id = *args
        .get_one::<i64>("ID")
        .ok_or_else(|| anyhow!("A target id is required"))?;
    let target = db
        .get_target(id)?
        .ok_or_else(|| anyhow!("Target {} not found", id))?;

    println!("{}", format_target_row(&target));
    println!("       updated {}", format_timestamp(target.updated_at));
    if let Some(ref message) = target.error_message {
        println!("       {}", message.red());
    }
    Ok(())
}

pub fn handle_show(args: &ArgMatches) -> Result<()> {
    let db = open_database(args)?;
    let id = *args
        .get_one::<i64>("ID")
        .ok_or_else(|| anyhow!("A target id is required"))?;
    let format = parse_report_format(args)?;

    let report = gather_report(db.as_ref(), id)?;
    let content = render_report(&report, format)?;
    emit(&content, args.get_one::<PathBuf>("output"))
}

pub fn handle_delete(args: &ArgMatches) -> Result<()> {
    let db = open_database(args)?;
    let mut failed = false;

    for id in id_args(args) {
        match db.delete_target(id) {
            Ok(()) => println!("{} Deleted target {}", "✓".green().bold(), id),
            Err(e) => {
                failed = true;
                eprintln!("{} {}", "✗".red().bold(), e);
            }
        }
    }

    if failed {
        bail!("Some targets could not be deleted");
    }
    Ok(())
}

pub async fn handle_scan(args: &ArgMatches) -> Result<()> {
    let quiet = args.get_flag("quiet");
    let url = args
        .get_one::<Url>("URL")
        .ok_or_else(|| anyhow!("A URL is required"))?;
    let format = parse_report_format(args)?;
    let config = load_config(args)?;

    let pb = spinner(quiet, "{spinner:.cyan} {pos} links probed {msg}")?;
    pb.set_message(url.to_string());

    let progress = pb.clone();
    let analyzer = PageAnalyzer::new(&config.analyzer)?.with_progress_callback(Arc::new(
        move |outcome: &ProbeOutcome| {
            progress.inc(1);
            if outcome.is_broken() {
                progress.set_message(format!("broken: {}", outcome.url));
            }
        },
    ));

    let cancel = CancellationToken::new();
    let result = tokio::select! {
        result = analyzer.analyze(url.as_str(), &cancel) => result,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            pb.finish_and_clear();
            bail!("Interrupted");
        }
    };
    pb.finish_and_clear();

    let report = result.with_context(|| format!("Analysis of {} failed", url))?;
    let content = render_page_report(&report, format)?;
    emit(&content, args.get_one::<PathBuf>("output"))
}
