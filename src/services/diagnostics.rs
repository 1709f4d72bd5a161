use crate::domain::config::{DiagnosticsConfig, GeneralConfig};
use crate::domain::constants::{
    inspect_file, service_logs_file, ARCHIVE_PREFIX, ARCHIVE_SUFFIX, COMPOSE_CONFIG_FILE,
    COMPOSE_PS_FILE, DOCKER_PS_FILE, EVENTS_FILE, SOCKETS_FILE, SUMMARY_FILE, TIMESTAMP_FORMAT,
};
use crate::domain::models::{DiagReport, StepOutcome};
use crate::services::process::{compose_spec, CommandOutput, CommandRunner, CommandSpec};
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn archive_name(stamp: &str) -> String {
    format!("{}{}{}", ARCHIVE_PREFIX, stamp, ARCHIVE_SUFFIX)
}

pub fn checksum_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

pub fn sha256_file(path: &Path) -> anyhow::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

struct Collector<'a> {
    runner: &'a dyn CommandRunner,
    general: &'a GeneralConfig,
    dir: PathBuf,
    captures: Vec<StepOutcome>,
}

impl Collector<'_> {
    fn docker(&self) -> CommandSpec {
        CommandSpec::new(&self.general.docker_bin)
    }

    fn compose(&self) -> CommandSpec {
        compose_spec(self.general, None)
    }

    /// Runs `spec` and stores its output in `file`; failures are written into
    /// the file instead and recorded, never propagated.
    fn capture(&mut self, file: &str, spec: CommandSpec) {
        let outcome = match self.runner.run(&spec) {
            Ok(out) if out.success() || out.timed_out => {
                self.write(file, &render_output(&out));
                StepOutcome::ok(file)
            }
            Ok(out) => {
                let detail = out.failure_detail();
                self.write(
                    file,
                    &format!("# {} failed: {}\n{}", spec.render(), detail, out.stdout_text()),
                );
                StepOutcome::failed(file, detail)
            }
            Err(e) => {
                self.write(file, &format!("# {} could not start: {}\n", spec.render(), e));
                StepOutcome::failed(file, e.to_string())
            }
        };
        if outcome.status != "ok" {
            tracing::warn!(file, detail = ?outcome.detail, "capture failed");
        }
        self.captures.push(outcome);
    }

    fn write(&self, file: &str, body: &str) {
        if let Err(e) = std::fs::write(self.dir.join(file), body) {
            tracing::warn!(file, error = %e, "could not write capture");
        }
    }

    fn summary(&mut self, now: &DateTime<Utc>) {
        let host = nix::unistd::gethostname()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let mut body = String::new();
        let _ = writeln!(body, "captured_at: {}", now.to_rfc3339());
        let _ = writeln!(body, "host: {}", host);
        let _ = writeln!(body, "project_dir: {}", self.general.project_dir);

        let mut failures = Vec::new();
        for (title, spec) in [
            ("docker version", self.docker().arg("version")),
            ("compose version", self.compose().arg("version")),
        ] {
            let _ = writeln!(body, "\n== {} ==", title);
            match self.runner.run(&spec) {
                Ok(out) if out.success() => body.push_str(&render_output(&out)),
                Ok(out) => {
                    let _ = writeln!(body, "unavailable: {}", out.failure_detail());
                    failures.push(format!("{}: {}", title, out.failure_detail()));
                }
                Err(e) => {
                    let _ = writeln!(body, "unavailable: {}", e);
                    failures.push(format!("{}: {}", title, e));
                }
            }
        }
        self.write(SUMMARY_FILE, &body);
        self.captures.push(if failures.is_empty() {
            StepOutcome::ok(SUMMARY_FILE)
        } else {
            StepOutcome::failed(SUMMARY_FILE, failures.join("; "))
        });
    }

    fn inspect(&mut self, service: &str) {
        let file = inspect_file(service);
        let ids = match self.runner.run(&self.compose().args(["ps", "-q", service])) {
            Ok(out) if out.success() => out
                .stdout_text()
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        if ids.is_empty() {
            // Fall back to the conventional container name.
            self.capture(&file, self.docker().args(["inspect", service]));
        } else {
            self.capture(&file, self.docker().arg("inspect").args(ids));
        }
    }
}

fn render_output(out: &CommandOutput) -> String {
    let mut text = out.stdout_text();
    let stderr = out.stderr_text();
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}

pub fn collect(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    cfg: &DiagnosticsConfig,
    out_root: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<DiagReport> {
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();
    let dir_name = format!("{}{}", ARCHIVE_PREFIX, stamp);
    let root = PathBuf::from(out_root);
    let dir = root.join(&dir_name);
    std::fs::create_dir_all(&dir)?;
    tracing::info!(dir = %dir.display(), "collecting diagnostics");

    let mut c = Collector {
        runner,
        general,
        dir: dir.clone(),
        captures: Vec::new(),
    };

    c.summary(&now);
    c.capture(COMPOSE_CONFIG_FILE, c.compose().arg("config"));
    c.capture(COMPOSE_PS_FILE, c.compose().args(["ps", "-a"]));
    c.capture(DOCKER_PS_FILE, c.docker().args(["ps", "-a"]));
    c.capture(SOCKETS_FILE, CommandSpec::new("ss").arg("-tulpn"));
    for service in &cfg.services {
        let tail = cfg.log_lines.to_string();
        c.capture(
            &service_logs_file(service),
            c.compose()
                .args(["logs", "--no-color", "--tail", tail.as_str()])
                .arg(service.as_str()),
        );
    }
    c.inspect(&cfg.inspect_service);
    c.capture(
        EVENTS_FILE,
        c.docker()
            .args(["events", "--since", cfg.events_since.as_str()])
            .timeout(Duration::from_millis(cfg.events_timeout_ms)),
    );

    let archive = root.join(archive_name(&stamp));
    write_archive(&dir, &dir_name, &archive)?;
    let checksum = sha256_file(&archive)?;
    std::fs::write(
        checksum_path(&archive),
        format!("{}  {}\n", checksum, archive_name(&stamp)),
    )?;

    if !cfg.keep_staging {
        if let Err(e) = std::fs::remove_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "could not remove staging dir");
        }
    }

    let failed_captures = c.captures.iter().filter(|s| s.status != "ok").count();
    tracing::info!(archive = %archive.display(), failed_captures, "diagnostics archived");
    Ok(DiagReport {
        archive: archive.to_string_lossy().to_string(),
        checksum,
        captures: c.captures,
        failed_captures,
    })
}

fn write_archive(dir: &Path, dir_name: &str, archive: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(archive)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(dir_name, dir)?;
    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}
