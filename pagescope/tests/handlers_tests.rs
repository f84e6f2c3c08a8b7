use pagescope::commands::command_argument_builder;
use pagescope::handlers::*;
use pagescope_core::model::{Target, TargetStatus};
use pagescope_core::report::ReportFormat;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_parse_url_line_with_scheme() {
    let result = parse_url_line("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_url_line_without_scheme() {
    assert_eq!(
        parse_url_line("example.com"),
        Some("http://example.com".to_string())
    );
    assert_eq!(
        parse_url_line("localhost:8080"),
        Some("http://localhost:8080".to_string())
    );
}

#[test]
fn test_parse_url_line_invalid() {
    assert_eq!(parse_url_line("not a valid url!!!"), None);
}

#[test]
fn test_load_urls_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "https://example.com")?;
    writeln!(temp_file, "# staging hosts")?;
    writeln!(temp_file, "httpbin.org")?;
    writeln!(temp_file)?;
    writeln!(temp_file, "  https://api.example.com  ")?;

    let path = PathBuf::from(temp_file.path());
    let urls = load_urls_from_file(&path)?;

    assert_eq!(
        urls,
        vec![
            "https://example.com",
            "http://httpbin.org",
            "https://api.example.com"
        ]
    );
    Ok(())
}

#[test]
fn test_load_urls_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();

    let path = PathBuf::from(temp_file.path());
    let result = load_urls_from_file(&path);
    assert!(result.unwrap_err().contains("No valid URLs"));
}

#[test]
fn test_load_urls_from_missing_file() {
    let result = load_urls_from_file(&PathBuf::from("/nonexistent/hosts.txt"));
    assert!(result.unwrap_err().contains("Failed to read hosts file"));
}

#[test]
fn test_expand_path_tilde() {
    let expanded = expand_path("~/pagescope.db");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("pagescope.db"));

    assert_eq!(expand_path("/tmp/x.db"), PathBuf::from("/tmp/x.db"));
}

#[test]
fn test_log_filter() {
    assert!(log_filter(false, true).contains("pagescope=debug"));
    assert_eq!(log_filter(true, false), "warn");
    assert!(log_filter(false, false).contains("pagescope=info"));
}

#[test]
fn test_format_target_row() {
    let target = Target {
        id: 12,
        url: "https://example.com/".to_string(),
        status: TargetStatus::Queued,
        title: None,
        html_version: None,
        error_message: None,
        created_at: 0,
        updated_at: 0,
    };

    let row = format_target_row(&target);
    assert!(row.contains("12"));
    assert!(row.contains("queued"));
    assert!(row.contains("https://example.com/"));
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_app_config_defaults_without_file() {
    let config = AppConfig::load(None).unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.analyzer.probe_budget, 10);
    assert!(config.dispatcher.max_concurrent_jobs.is_none());
}

#[test]
fn test_app_config_partial_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(
        temp_file,
        r#"{{"analyzer": {{"probe_timeout_secs": 2}}, "dispatcher": {{"max_concurrent_jobs": 3}}}}"#
    )
    .unwrap();

    let config = AppConfig::load(Some(temp_file.path())).unwrap();
    assert_eq!(config.analyzer.probe_timeout_secs, 2);
    assert_eq!(config.analyzer.probe_budget, 10);
    assert_eq!(config.dispatcher.max_concurrent_jobs, Some(3));
}

#[test]
fn test_app_config_rejects_invalid_values() {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, r#"{{"analyzer": {{"probe_budget": 0}}}}"#).unwrap();

    assert!(AppConfig::load(Some(temp_file.path())).is_err());
}

#[test]
fn test_app_config_rejects_malformed_json() {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "not json").unwrap();

    let err = AppConfig::load(Some(temp_file.path())).unwrap_err();
    assert!(err.to_string().contains("Invalid config file"));
}

#[test]
fn test_flags_override_config() {
    let matches = command_argument_builder()
        .try_get_matches_from([
            "pagescope",
            "analyze",
            "1",
            "2",
            "--probe-budget",
            "4",
            "--max-jobs",
            "2",
        ])
        .unwrap();
    let (_, args) = matches.subcommand().unwrap();

    let mut config = AppConfig::default();
    config.apply_overrides(args);
    assert_eq!(config.analyzer.probe_budget, 4);
    assert_eq!(config.analyzer.probe_timeout_secs, 5);
    assert_eq!(config.dispatcher.max_concurrent_jobs, Some(2));
}

// ============================================================================
// Command Line Tests
// ============================================================================

#[test]
fn test_cli_analyze_accepts_many_ids() {
    let matches = command_argument_builder()
        .try_get_matches_from(["pagescope", "analyze", "3", "5", "8"])
        .unwrap();
    let (name, args) = matches.subcommand().unwrap();

    assert_eq!(name, "analyze");
    let ids: Vec<i64> = args.get_many::<i64>("ID").unwrap().copied().collect();
    assert_eq!(ids, vec![3, 5, 8]);
}

#[test]
fn test_dedup_ids_keeps_first_occurrence() {
    assert_eq!(dedup_ids([3, 3, 5, 3, 1, 5]), vec![3, 5, 1]);
    assert!(dedup_ids(Vec::new()).is_empty());
}

#[test]
fn test_cli_analyze_repeated_id_is_one_target() {
    let matches = command_argument_builder()
        .try_get_matches_from(["pagescope", "analyze", "3", "3"])
        .unwrap();
    let (_, args) = matches.subcommand().unwrap();

    let ids = dedup_ids(args.get_many::<i64>("ID").unwrap().copied());
    assert_eq!(ids, vec![3]);
}

#[test]
fn test_cli_rejects_non_numeric_id() {
    let result = command_argument_builder().try_get_matches_from(["pagescope", "stop", "abc"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_global_db_flag() {
    let matches = command_argument_builder()
        .try_get_matches_from(["pagescope", "list", "--db", "/tmp/custom.db"])
        .unwrap();
    let (_, args) = matches.subcommand().unwrap();
    assert_eq!(args.get_one::<String>("db").unwrap(), "/tmp/custom.db");
}

#[test]
fn test_cli_scan_format() {
    let matches = command_argument_builder()
        .try_get_matches_from(["pagescope", "scan", "https://example.com", "--format", "JSON"])
        .unwrap();
    let (_, args) = matches.subcommand().unwrap();
    assert_eq!(parse_report_format(args).unwrap(), ReportFormat::Json);
}

#[test]
fn test_cli_add_requires_url_or_file() {
    let result = command_argument_builder().try_get_matches_from(["pagescope", "add"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_quiet_conflicts_with_verbose() {
    let result =
        command_argument_builder().try_get_matches_from(["pagescope", "-q", "-v", "list"]);
    assert!(result.is_err());
}
