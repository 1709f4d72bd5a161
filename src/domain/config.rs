use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub diagnostics: DiagnosticsConfig,
    pub export: ExportConfig,
    pub remote: RemoteConfig,
    pub stack: StackConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    pub project_dir: String,
    /// Program plus leading arguments, e.g. `["docker", "compose"]`.
    pub compose_cmd: Vec<String>,
    pub docker_bin: String,
    pub sudo_bin: String,
    pub git_bin: String,
    pub gh_bin: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_dir: ".".to_string(),
            compose_cmd: vec!["docker".to_string(), "compose".to_string()],
            docker_bin: "docker".to_string(),
            sudo_bin: "sudo".to_string(),
            git_bin: "git".to_string(),
            gh_bin: "gh".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub out_root: String,
    pub services: Vec<String>,
    pub inspect_service: String,
    pub log_lines: usize,
    pub events_since: String,
    pub events_timeout_ms: u64,
    pub keep_staging: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            out_root: "/tmp".to_string(),
            services: ["webui", "rq_dashboard", "rq_proxy", "prometheus", "dco_agent"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            inspect_service: "webui".to_string(),
            log_lines: 500,
            events_since: "10m".to_string(),
            events_timeout_ms: 1000,
            keep_staging: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    pub config_dir: String,
    pub exclude: Vec<String>,
    pub commit_message: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            config_dir: "config".to_string(),
            exclude: ["models", "venv", ".venv", "__pycache__", ".git", ".env", "*.gguf"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            commit_message: "Sanitized export".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RemoteConfig {
    pub ssh_bin: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            ssh_bin: "ssh".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StackConfig {
    pub restart_allowlist: Vec<String>,
    /// Endpoint name -> URL probed by `stack health`.
    pub health: BTreeMap<String, String>,
    pub health_timeout_ms: u64,
}

impl Default for StackConfig {
    fn default() -> Self {
        let mut health = BTreeMap::new();
        health.insert(
            "dco_agent".to_string(),
            "http://127.0.0.1:8000/health".to_string(),
        );
        Self {
            restart_allowlist: Vec::new(),
            health,
            health_timeout_ms: 3000,
        }
    }
}
