use crate::cli::{Cli, Commands, DiagCommands, RemoteCommands};
use crate::domain::config::Config;
use crate::domain::errors::OpsError;
use crate::services::diagnostics::collect;
use crate::services::extract::{extract, ExtractRequest};
use crate::services::output::{print_one, print_out, step_row};
use crate::services::process::CommandRunner;
use crate::services::remote::{execute, parse_request};
use crate::services::storage::audit;
use std::io::Read;

pub fn handle_diag_commands(
    cli: &Cli,
    cfg: &Config,
    runner: &dyn CommandRunner,
) -> anyhow::Result<bool> {
    let Commands::Diag { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        DiagCommands::Collect { out_root } => {
            let out_root = out_root.as_deref().unwrap_or(&cfg.diagnostics.out_root);
            let report = collect(
                runner,
                &cfg.general,
                &cfg.diagnostics,
                out_root,
                chrono::Utc::now(),
            )?;
            audit(
                "diag.collect",
                serde_json::json!({"archive": report.archive, "failed_captures": report.failed_captures}),
            );
            if cli.json {
                print_one(true, report, |_| String::new())?;
            } else {
                print_out(false, &report.captures, step_row)?;
                println!("archive: {}", report.archive);
                println!("sha256: {}", report.checksum);
            }
        }
        DiagCommands::Extract {
            archive,
            out_root,
            lines,
        } => {
            let out_root = out_root.as_deref().unwrap_or(&cfg.diagnostics.out_root);
            let report = extract(
                runner,
                &cfg.general,
                &cfg.diagnostics,
                &ExtractRequest {
                    out_root,
                    archive: archive.as_deref(),
                    lines: *lines,
                },
            )?;
            if cli.json {
                print_one(true, report, |_| String::new())?;
            } else {
                println!("archive: {} (checksum {})", report.archive, report.checksum);
                println!("extracted to: {}", report.extracted_to);
                for s in &report.sections {
                    println!();
                    println!("=== {} [{}] ===", s.name, s.source);
                    for l in &s.lines {
                        println!("{}", l);
                    }
                }
            }
        }
    }
    Ok(true)
}

fn read_request(path: Option<&str>) -> anyhow::Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p)
            .map_err(|e| OpsError::NotFound(format!("request file {}: {}", p, e)).into()),
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

/// `remote exec` always prints the bare response envelope, `--json` or not.
pub fn handle_remote_commands(
    cli: &Cli,
    cfg: &Config,
    runner: &dyn CommandRunner,
) -> anyhow::Result<bool> {
    let Commands::Remote { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        RemoteCommands::Exec { request } => {
            let raw = read_request(request.as_deref())?;
            let req = parse_request(&raw)?;
            let resp = execute(runner, &cfg.remote, &req);
            println!("{}", serde_json::to_string(&resp)?);
        }
    }
    Ok(true)
}
