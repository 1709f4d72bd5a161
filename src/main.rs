use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod domain;
mod services;

use cli::Cli;
use commands::{
    handle_diag_commands, handle_export_commands, handle_perms_commands, handle_ports_commands,
    handle_remote_commands, handle_stack_commands,
};
use domain::errors::classify;
use services::output::print_error;
use services::process::SystemRunner;
use services::storage::load_config;

const LOG_ENV: &str = "STACKOPS_LOG";

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    let runner = SystemRunner;

    if handle_ports_commands(cli, &cfg, &runner)? {
        return Ok(());
    }
    if handle_perms_commands(cli, &cfg, &runner)? {
        return Ok(());
    }
    if handle_remote_commands(cli, &cfg, &runner)? {
        return Ok(());
    }
    if handle_diag_commands(cli, &cfg, &runner)? {
        return Ok(());
    }
    if handle_export_commands(cli, &cfg, &runner)? {
        return Ok(());
    }
    handle_stack_commands(cli, &cfg, &runner)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        let (code, exit) = classify(&err);
        tracing::debug!(code, error = ?err, "command failed");
        print_error(cli.json, code, &format!("{:#}", err));
        std::process::exit(exit);
    }
}
