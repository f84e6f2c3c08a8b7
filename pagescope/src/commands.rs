use clap::{arg, command};
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/pagescope/";
pub const DEFAULT_DB_PATH: &str = "~/.config/pagescope/pagescope.db";

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

fn format_arg() -> clap::Arg {
    arg!(-f --"format" <FORMAT>)
        .required(false)
        .help("Report format: text, json")
        .value_parser(["text", "json"])
        .ignore_case(true)
        .default_value("text")
}

fn probe_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"probe-budget" <NUM>)
            .required(false)
            .help("Maximum concurrent link probes per analysis (default: 10)")
            .value_parser(clap::value_parser!(usize)),
    )
    .arg(
        arg!(--"probe-timeout" <SECONDS>)
            .required(false)
            .help("Per-link probe timeout in seconds (default: 5)")
            .value_parser(clap::value_parser!(u64)),
    )
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("pagescope")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("pagescope")
        .about("Analyze web pages: structure, links and broken links")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress progress output and informational logs")
                .required(false)
                .global(true)
                .conflicts_with("verbose"),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(--"db" <PATH>)
                .required(false)
                .global(true)
                .help("Path to the pagescope database")
                .default_value(DEFAULT_DB_PATH),
        )
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .global(true)
                .help("JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("init")
                .about("Initializes the pagescope database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Directory to store the pagescope database")
                        .default_value(DEFAULT_CONFIG_DIR),
                )
                .arg(
                    arg!(--"force")
                        .help("Overwrite any existing database at the specified location.")
                        .required(false),
                ),
        )
        .subcommand(
            command!("add")
                .about("Register one or more target URLs for analysis")
                .arg(
                    arg!([URL])
                        .required_unless_present("hosts-file")
                        .help("The URL to register")
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of URLs to register")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("list")
                .about("List registered targets, newest first")
                .arg(
                    arg!(-p --"page" <NUM>)
                        .required(false)
                        .value_parser(clap::value_parser!(u32))
                        .default_value("1"),
                )
                .arg(
                    arg!(-s --"page-size" <NUM>)
                        .required(false)
                        .help("Targets per page (1-50)")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("10"),
                )
                .arg(format_arg()),
        )
        .subcommand(probe_args(
            command!("analyze")
                .about("Analyze one or more registered targets and wait for the results")
                .arg(
                    arg!(<ID> ...)
                        .help("Target ids to analyze")
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    arg!(-j --"max-jobs" <NUM>)
                        .required(false)
                        .help("Maximum number of targets analyzed at once")
                        .value_parser(clap::value_parser!(usize)),
                ),
        ))
        .subcommand(
            command!("stop")
                .about("Stop a running analysis")
                .arg(arg!(<ID>).value_parser(clap::value_parser!(i64))),
        )
        .subcommand(
            command!("status")
                .about("Show the status of a target")
                .arg(arg!(<ID>).value_parser(clap::value_parser!(i64))),
        )
        .subcommand(
            command!("show")
                .about("Show the stored analysis results of a target")
                .arg(arg!(<ID>).value_parser(clap::value_parser!(i64)))
                .arg(format_arg())
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("delete")
                .about("Delete targets and their results")
                .arg(
                    arg!(<ID> ...)
                        .help("Target ids to delete")
                        .value_parser(clap::value_parser!(i64)),
                ),
        )
        .subcommand(probe_args(
            command!("scan")
                .about("Analyze a single URL without storing anything")
                .arg(
                    arg!(<URL>)
                        .help("The URL to analyze")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(format_arg())
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        ))
}
