use crate::domain::config::RemoteConfig;
use crate::domain::errors::OpsError;
use crate::domain::models::{RemoteRequest, RemoteResponse};
use crate::services::process::{CommandRunner, CommandSpec};

/// Exit code reported when the ssh client itself cannot be started.
pub const SPAWN_FAILURE_CODE: i32 = 127;

pub fn parse_request(raw: &str) -> anyhow::Result<RemoteRequest> {
    let req: RemoteRequest = serde_json::from_str(raw)
        .map_err(|e| OpsError::InvalidInput(format!("request is not valid JSON: {}", e)))?;
    if req.host.trim().is_empty() {
        return Err(OpsError::InvalidInput("request.host is empty".to_string()).into());
    }
    if req.cmd.trim().is_empty() {
        return Err(OpsError::InvalidInput("request.cmd is empty".to_string()).into());
    }
    // ssh would read a leading dash in the target as an option.
    let fields = [("host", Some(req.host.as_str())), ("user", req.user.as_deref())];
    for (name, value) in fields {
        if value.is_some_and(|v| v.trim_start().starts_with('-')) {
            return Err(OpsError::InvalidInput(format!("request.{} must not start with '-'", name)).into());
        }
    }
    Ok(req)
}

pub fn ssh_spec(cfg: &RemoteConfig, req: &RemoteRequest) -> CommandSpec {
    let mut spec = CommandSpec::new(&cfg.ssh_bin).args([
        "-o",
        "StrictHostKeyChecking=no",
        "-o",
        "UserKnownHostsFile=/dev/null",
    ]);
    if let Some(key) = req.key_path.as_deref().filter(|k| !k.is_empty()) {
        spec = spec.arg("-i").arg(key);
    }
    let target = match req.user.as_deref().filter(|u| !u.is_empty()) {
        Some(user) => format!("{}@{}", user, req.host),
        None => req.host.clone(),
    };
    spec.arg(target).arg(req.cmd.clone())
}

/// Runs the request once, synchronously; never retries.
pub fn execute(runner: &dyn CommandRunner, cfg: &RemoteConfig, req: &RemoteRequest) -> RemoteResponse {
    let spec = ssh_spec(cfg, req);
    tracing::info!(host = %req.host, "running remote command");
    match runner.run(&spec) {
        Ok(out) => RemoteResponse {
            returncode: out.status_code,
            stdout: out.stdout_text(),
            stderr: out.stderr_text(),
        },
        Err(e) => {
            tracing::warn!(error = %e, program = %cfg.ssh_bin, "ssh could not start");
            RemoteResponse {
                returncode: SPAWN_FAILURE_CODE,
                stdout: String::new(),
                stderr: format!("failed to start {}: {}", cfg.ssh_bin, e),
            }
        }
    }
}
