use crate::cli::{Cli, Commands, StackCommands};
use crate::domain::config::Config;
use crate::domain::errors::OpsError;
use crate::services::output::{print_envelope, print_one, step_row, tsv_row};
use crate::services::process::CommandRunner;
use crate::services::stack::{bootstrap, probe_health, restart_service, BootstrapRequest};
use crate::services::storage::audit;

fn ensure_compose_available(cfg: &Config) -> anyhow::Result<()> {
    let program = cfg
        .general
        .compose_cmd
        .first()
        .map(String::as_str)
        .unwrap_or("docker");
    which::which(program).map_err(|_| {
        OpsError::Precondition(format!("compose runtime not found on PATH: {}", program))
    })?;
    Ok(())
}

pub fn handle_stack_commands(
    cli: &Cli,
    cfg: &Config,
    runner: &dyn CommandRunner,
) -> anyhow::Result<bool> {
    let Commands::Stack { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        StackCommands::Bootstrap {
            dir,
            variant,
            force,
            no_up,
            follow,
        } => {
            if *follow && cli.json {
                return Err(OpsError::InvalidInput(
                    "--follow streams logs and cannot be combined with --json".to_string(),
                )
                .into());
            }
            if !no_up {
                ensure_compose_available(cfg)?;
            }
            let project_dir = dir.as_deref().unwrap_or(&cfg.general.project_dir);
            let report = bootstrap(
                runner,
                &cfg.general,
                &BootstrapRequest {
                    project_dir,
                    variant: variant.clone(),
                    force: *force,
                    up: !no_up,
                    follow: *follow,
                },
                |k| std::env::var(k).ok(),
            )?;
            audit(
                "stack.bootstrap",
                serde_json::json!({"project_dir": report.project_dir, "variant": report.variant, "written": report.written}),
            );
            if cli.json {
                print_one(true, report, |_| String::new())?;
            } else {
                for w in &report.written {
                    println!("{}", tsv_row(&["wrote", w], None));
                }
                for k in &report.kept {
                    println!("{}", tsv_row(&["kept", k], None));
                }
                for s in &report.steps {
                    println!("{}", step_row(s));
                }
                if let Some(ps) = &report.ps {
                    println!();
                    print!("{}", ps);
                }
                if let Some(logs) = &report.logs {
                    println!();
                    print!("{}", logs);
                }
                if let Some(pid) = report.follow_pid {
                    println!("following logs in background (pid {})", pid);
                }
            }
        }
        StackCommands::Restart { service } => {
            let report = restart_service(runner, &cfg.general, &cfg.stack, service)?;
            audit("stack.restart", serde_json::json!({"service": report.service}));
            print_one(cli.json, report, |r| format!("restarted {}", r.service))?;
        }
        StackCommands::Health => {
            let items = probe_health(&cfg.stack)?;
            let down = items.iter().filter(|i| i.status != "up").count();
            if cli.json {
                print_envelope(down == 0, &items)?;
            } else {
                for i in &items {
                    let code = i.http_status.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string());
                    println!("{}", tsv_row(&[&i.name, &i.status, &code, &i.url], i.error.as_deref()));
                }
            }
            if down > 0 {
                tracing::warn!(down, "health check failed");
                std::process::exit(1);
            }
        }
    }
    Ok(true)
}
