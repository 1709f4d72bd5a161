use crate::cli::{Cli, Commands, ExportCommands, PermsCommands, PortsCommands};
use crate::domain::config::Config;
use crate::domain::models::FileOutcome;
use crate::services::compose::{remap_port, RemapRequest};
use crate::services::export::{run_export, ExportRequest};
use crate::services::output::{print_one, print_out, step_row, tsv_row};
use crate::services::perms::fix_executable_bits;
use crate::services::process::CommandRunner;
use crate::services::redact::redact_one;
use crate::services::storage::audit;
use std::io::Write;
use std::path::Path;

pub fn handle_ports_commands(
    cli: &Cli,
    cfg: &Config,
    runner: &dyn CommandRunner,
) -> anyhow::Result<bool> {
    let Commands::Ports { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        PortsCommands::Remap {
            compose,
            service,
            from,
            to,
            no_restart,
        } => {
            let report = remap_port(
                runner,
                &cfg.general,
                &RemapRequest {
                    compose_file: compose,
                    service,
                    from,
                    to,
                    restart: !no_restart,
                },
            )?;
            audit(
                "ports.remap",
                serde_json::json!({"file": report.compose_file, "service": report.service, "from": report.from, "to": report.to}),
            );
            print_one(cli.json, report, |r| {
                format!(
                    "{}: {} -> {} (line {}, backup {}, restart {})",
                    r.service, r.from, r.to, r.line, r.backup, r.restart.status
                )
            })?;
        }
    }
    Ok(true)
}

pub fn handle_perms_commands(
    cli: &Cli,
    cfg: &Config,
    runner: &dyn CommandRunner,
) -> anyhow::Result<bool> {
    let Commands::Perms { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        PermsCommands::Fix {
            path,
            pattern,
            dry_run,
        } => {
            let report = fix_executable_bits(runner, &cfg.general, path, pattern, *dry_run)?;
            if !dry_run {
                audit(
                    "perms.fix",
                    serde_json::json!({"root": report.root, "pattern": report.pattern, "changed": report.count(FileOutcome::Changed)}),
                );
            }
            if cli.json {
                print_one(true, &report, |_| String::new())?;
            } else {
                for e in &report.entries {
                    let outcome = serde_json::to_value(e.outcome)?;
                    let outcome = outcome.as_str().unwrap_or_default();
                    println!("{}", tsv_row(&[outcome, &e.path], e.reason.as_deref()));
                }
                println!();
                print_out(false, &report.listing, |l| tsv_row(&[&l.mode, &l.path], None))?;
            }
        }
    }
    Ok(true)
}

pub fn handle_export_commands(
    cli: &Cli,
    cfg: &Config,
    runner: &dyn CommandRunner,
) -> anyhow::Result<bool> {
    let Commands::Export { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        ExportCommands::Run {
            repo_name,
            private,
            publish,
            src,
            dest,
            exclude,
            force,
        } => {
            let report = run_export(
                runner,
                &cfg.general,
                &cfg.export,
                &ExportRequest {
                    repo_name,
                    src,
                    dest,
                    extra_excludes: exclude,
                    private: *private,
                    publish: *publish,
                    force: *force,
                },
            )?;
            audit(
                "export.run",
                serde_json::json!({"repo": report.repo_name, "destination": report.destination, "redacted_files": report.redacted_files.len()}),
            );
            if cli.json {
                print_one(true, report, |_| String::new())?;
            } else {
                println!(
                    "exported {} -> {} ({} copied, {} skipped)",
                    report.source, report.destination, report.copied, report.skipped
                );
                for f in &report.redacted_files {
                    println!("{}", tsv_row(&["redacted", f], None));
                }
                print_out(false, &report.steps, step_row)?;
            }
        }
        ExportCommands::Redact { file, in_place } => {
            let report = redact_one(Path::new(file), *in_place)?;
            if *in_place {
                audit(
                    "export.redact",
                    serde_json::json!({"file": report.file, "redacted_lines": report.redacted_lines}),
                );
            }
            if cli.json {
                print_one(true, report, |_| String::new())?;
            } else if let Some(content) = &report.content {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(content)?;
                stdout.flush()?;
            } else {
                println!("redacted {} line(s) in {}", report.redacted_lines, report.file);
            }
        }
    }
    Ok(true)
}
