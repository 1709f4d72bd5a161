use crate::cli::BootstrapVariant;
use crate::domain::config::{GeneralConfig, StackConfig};
use crate::domain::constants::BOOTSTRAP_API_KEY_ENV;
use crate::domain::errors::OpsError;
use crate::domain::models::{BootstrapReport, HealthItem, RestartReport, StepOutcome};
use crate::services::process::{compose_spec, CommandRunner};
use crate::services::templates::{HEALTH_SERVER, PROMETHEUS_YML, RQ_PROXY_APP};
use std::path::PathBuf;
use std::time::Duration;

const BOOTSTRAP_LOG_TAIL: &str = "100";

pub fn template_files(variant: &BootstrapVariant) -> Vec<(&'static str, &'static str)> {
    let mut files = vec![("prometheus/prometheus.yml", PROMETHEUS_YML)];
    if matches!(variant, BootstrapVariant::Proxy | BootstrapVariant::Full) {
        files.push(("rq-proxy/app.py", RQ_PROXY_APP));
    }
    if matches!(variant, BootstrapVariant::Full) {
        files.push(("health/health_server.py", HEALTH_SERVER));
    }
    files
}

pub struct BootstrapRequest<'a> {
    pub project_dir: &'a str,
    pub variant: BootstrapVariant,
    pub force: bool,
    pub up: bool,
    pub follow: bool,
}

pub fn bootstrap(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    req: &BootstrapRequest<'_>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<BootstrapReport> {
    if matches!(req.variant, BootstrapVariant::Full)
        && env(BOOTSTRAP_API_KEY_ENV).map_or(true, |v| v.trim().is_empty())
    {
        return Err(OpsError::Precondition(format!(
            "{} must be set for the full stack",
            BOOTSTRAP_API_KEY_ENV
        ))
        .into());
    }

    let root = PathBuf::from(req.project_dir);
    if !root.is_dir() {
        return Err(OpsError::Precondition(format!(
            "project directory not found: {}",
            req.project_dir
        ))
        .into());
    }

    let mut written = Vec::new();
    let mut kept = Vec::new();
    for (rel, body) in template_files(&req.variant) {
        let path = root.join(rel);
        if path.exists() && !req.force {
            kept.push(rel.to_string());
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, body)?;
        written.push(rel.to_string());
    }
    tracing::info!(written = written.len(), kept = kept.len(), "stub files in place");

    let mut report = BootstrapReport {
        project_dir: req.project_dir.to_string(),
        variant: format!("{:?}", req.variant).to_lowercase(),
        written,
        kept,
        steps: Vec::new(),
        ps: None,
        logs: None,
        follow_pid: None,
    };
    if !req.up {
        report.steps.push(StepOutcome::skipped("up"));
        return Ok(report);
    }

    let project = GeneralConfig {
        project_dir: req.project_dir.to_string(),
        ..general.clone()
    };
    let compose = || compose_spec(&project, None);

    let up = runner.run(&compose().args(["up", "-d"]))?;
    if !up.success() {
        anyhow::bail!("compose up failed: {}", up.failure_detail());
    }
    report.steps.push(StepOutcome::ok("up"));

    match runner.run(&compose().args(["ps"])) {
        Ok(out) if out.success() => {
            report.steps.push(StepOutcome::ok("ps"));
            report.ps = Some(out.stdout_text());
        }
        Ok(out) => report.steps.push(StepOutcome::failed("ps", out.failure_detail())),
        Err(e) => report.steps.push(StepOutcome::failed("ps", e.to_string())),
    }
    match runner.run(&compose().args(["logs", "--no-color", "--tail", BOOTSTRAP_LOG_TAIL])) {
        Ok(out) if out.success() => {
            report.steps.push(StepOutcome::ok("logs"));
            report.logs = Some(out.stdout_text());
        }
        Ok(out) => report.steps.push(StepOutcome::failed("logs", out.failure_detail())),
        Err(e) => report.steps.push(StepOutcome::failed("logs", e.to_string())),
    }

    if req.follow {
        // Fire and forget: the follower outlives this process.
        match runner.spawn_detached(&compose().args(["logs", "-f"])) {
            Ok(pid) => {
                report.steps.push(StepOutcome::ok("follow"));
                report.follow_pid = Some(pid);
            }
            Err(e) => report.steps.push(StepOutcome::failed("follow", e.to_string())),
        }
    }
    Ok(report)
}

pub fn restart_service(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    cfg: &StackConfig,
    service: &str,
) -> anyhow::Result<RestartReport> {
    if !cfg.restart_allowlist.is_empty() && !cfg.restart_allowlist.iter().any(|s| s == service) {
        return Err(OpsError::NotAllowed(service.to_string()).into());
    }
    let out = runner.run(&compose_spec(general, None).args(["restart", service]))?;
    if !out.success() {
        anyhow::bail!("restart of {} failed: {}", service, out.failure_detail());
    }
    tracing::info!(service, "service restarted");
    Ok(RestartReport {
        service: service.to_string(),
        returncode: out.status_code,
        output: format!("{}{}", out.stdout_text(), out.stderr_text()),
    })
}

pub fn probe_health(cfg: &StackConfig) -> anyhow::Result<Vec<HealthItem>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_millis(cfg.health_timeout_ms))
        .no_proxy()
        .build()?;
    let mut out = Vec::new();
    for (name, url) in &cfg.health {
        let item = match client.get(url).send() {
            Ok(resp) => {
                let status = resp.status();
                HealthItem {
                    name: name.clone(),
                    url: url.clone(),
                    status: if status.is_success() { "up" } else { "down" }.to_string(),
                    http_status: Some(status.as_u16()),
                    error: None,
                }
            }
            Err(e) => HealthItem {
                name: name.clone(),
                url: url.clone(),
                status: "down".to_string(),
                http_status: None,
                error: Some(e.to_string()),
            },
        };
        if item.status != "up" {
            tracing::warn!(name = %item.name, url = %item.url, "endpoint down");
        }
        out.push(item);
    }
    Ok(out)
}
