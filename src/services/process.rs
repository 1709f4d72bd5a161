use crate::domain::config::GeneralConfig;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn render(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().map(|a| {
            if a.is_empty() || a.contains(char::is_whitespace) {
                format!("'{}'", a)
            } else {
                a.clone()
            }
        }));
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Short failure description for step reports.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr_text();
        let stderr = stderr.trim();
        if stderr.is_empty() {
            format!("exit status {}", self.status_code)
        } else {
            format!("exit status {}: {}", self.status_code, stderr)
        }
    }
}

/// Seam between the commands and the external tools they drive.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput>;

    /// Start a process without waiting for it; returns its pid.
    fn spawn_detached(&self, spec: &CommandSpec) -> io::Result<u32>;
}

pub struct SystemRunner;

impl SystemRunner {
    fn command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).stdin(Stdio::null());
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        tracing::debug!(command = %spec.render(), "running");
        let mut cmd = Self::command(spec);
        let Some(timeout) = spec.timeout else {
            let output = cmd.output()?;
            return Ok(CommandOutput {
                status_code: exit_code(output.status),
                stdout: output.stdout,
                stderr: output.stderr,
                timed_out: false,
            });
        };

        let mut child = cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let (status_code, timed_out) = wait_with_deadline(&mut child, timeout)?;

        Ok(CommandOutput {
            status_code,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
            timed_out,
        })
    }

    fn spawn_detached(&self, spec: &CommandSpec) -> io::Result<u32> {
        tracing::debug!(command = %spec.render(), "spawning detached");
        let child = Self::command(spec).spawn()?;
        Ok(child.id())
    }
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or(if status.success() { 0 } else { 1 })
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut s) = stream {
            let _ = s.read_to_end(&mut buf);
        }
        buf
    })
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<(i32, bool)> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((exit_code(status), false));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let status = child.wait()?;
            return Ok((exit_code(status), true));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// `docker compose [-f <file>] <args...>` rooted at the project directory.
pub fn compose_spec(general: &GeneralConfig, compose_file: Option<&Path>) -> CommandSpec {
    let mut parts = general.compose_cmd.iter();
    let program = parts.next().cloned().unwrap_or_else(|| "docker".to_string());
    let mut spec = CommandSpec::new(program).args(parts.cloned());
    if let Some(file) = compose_file {
        spec = spec.arg("-f").arg(file.to_string_lossy().to_string());
    }
    spec.cwd(&general.project_dir)
}
