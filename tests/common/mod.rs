#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Config that points every external tool at something harmless.
pub const QUIET_CONFIG: &str = r#"
[general]
compose_cmd = ["stackops-missing-compose"]
docker_bin = "stackops-missing-docker"
sudo_bin = "stackops-missing-sudo"
git_bin = "stackops-missing-git"
gh_bin = "stackops-missing-gh"

[diagnostics]
services = ["webui", "prometheus"]
events_timeout_ms = 200

[remote]
ssh_bin = "echo"
"#;

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub work: PathBuf,
    pub config: PathBuf,
    cargo_home: PathBuf,
    rustup_home: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(QUIET_CONFIG)
    }

    pub fn with_config(config: &str) -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        let work = tmp.path().join("work");
        fs::create_dir_all(&home).expect("create isolated home");
        fs::create_dir_all(&work).expect("create work dir");

        let config_path = tmp.path().join("stackops.toml");
        let body = format!(
            "{}\n",
            config.replacen(
                "[general]",
                &format!("[general]\nproject_dir = {:?}", work.to_string_lossy()),
                1
            )
        );
        fs::write(&config_path, body).expect("write config");

        let orig_home = std::env::var("HOME").unwrap_or_default();
        let cargo_home = PathBuf::from(&orig_home).join(".cargo");
        let rustup_home = PathBuf::from(&orig_home).join(".rustup");

        Self {
            _tmp: tmp,
            home,
            work,
            config: config_path,
            cargo_home,
            rustup_home,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("stackops");
        cmd.env("HOME", &self.home)
            .env("CARGO_HOME", &self.cargo_home)
            .env("RUSTUP_HOME", &self.rustup_home)
            .env("STACKOPS_CONFIG", &self.config)
            .env_remove("STACKOPS_LOG")
            .env_remove("AGENT_UI_API_KEY");
        cmd
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let mut cmd = self.cmd();
        let out = cmd
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    /// Runs with `--json`, expects `exit`, and returns the error envelope.
    pub fn run_json_failure(&self, args: &[&str], exit: i32) -> Value {
        let mut cmd = self.cmd();
        let out = cmd
            .arg("--json")
            .args(args)
            .assert()
            .code(exit)
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json error output")
    }

    pub fn path(&self, rel: &str) -> String {
        self.work.join(rel).to_string_lossy().to_string()
    }

    pub fn write(&self, rel: &str, body: &str) -> PathBuf {
        let p = self.work.join(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&p, body).expect("write fixture file");
        p
    }
}

pub const COMPOSE_FIXTURE: &str = r#"services:
  rq_proxy:
    image: rq-proxy
    ports:
      - "8080:80"
  webui:
    image: open-webui
    ports:
      - "8080:80"
    environment:
      - WEBUI_PORT=8080
"#;

pub fn load_schema(name: &str) -> Value {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let raw = fs::read_to_string(root.join("docs/contracts").join(name)).unwrap();
    serde_json::from_str(&raw).unwrap()
}

pub fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}
