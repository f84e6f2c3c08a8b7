use colored::Colorize;
use pagescope::commands::command_argument_builder;
use pagescope::handlers::{
    handle_add, handle_analyze, handle_delete, handle_init, handle_list, handle_scan,
    handle_show, handle_status, handle_stop, log_filter,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(quiet: bool, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(log_filter(quiet, verbose))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(quiet, verbose)))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let chosen_command = command_argument_builder().get_matches();
    init_tracing(
        chosen_command.get_flag("quiet"),
        chosen_command.get_flag("verbose"),
    );

    let result = match chosen_command.subcommand() {
        Some(("init", args)) => handle_init(args),
        Some(("add", args)) => handle_add(args),
        Some(("list", args)) => handle_list(args),
        Some(("analyze", args)) => handle_analyze(args).await,
        Some(("stop", args)) => handle_stop(args),
        Some(("status", args)) => handle_status(args),
        Some(("show", args)) => handle_show(args),
        Some(("delete", args)) => handle_delete(args),
        Some(("scan", args)) => handle_scan(args).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
