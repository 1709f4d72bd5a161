/// Key fragments that mark a `KEY=VALUE` line as secret (matched upper-cased).
pub const SENSITIVE_FRAGMENTS: &[&str] = &[
    "PASS",
    "SECRET",
    "TOKEN",
    "KEY",
    "ADMIN",
    "CREDENTIAL",
    "API_KEY",
    "APIKEY",
    "AUTH",
];

pub const REDACTED_MARKER: &str = "REDACTED";

pub const ARCHIVE_PREFIX: &str = "infra_diag_";
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";
pub const EXTRACT_PREFIX: &str = "infra_diag_extract_";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// File names shared by `diag collect` and `diag extract`.
pub const SUMMARY_FILE: &str = "summary.txt";
pub const COMPOSE_CONFIG_FILE: &str = "compose_config.txt";
pub const COMPOSE_PS_FILE: &str = "compose_ps.txt";
pub const DOCKER_PS_FILE: &str = "docker_ps.txt";
pub const SOCKETS_FILE: &str = "listening_sockets.txt";
pub const EVENTS_FILE: &str = "docker_events.txt";

pub fn service_logs_file(service: &str) -> String {
    format!("{}_logs.txt", service)
}

pub fn inspect_file(service: &str) -> String {
    format!("{}_inspect.json", service)
}

pub const SUMMARY_HEAD_LINES: usize = 40;

pub const GITIGNORE_BODY: &str = "\
# secrets
.env
.env.local
*.pem
*.key
secrets/

# models and caches
models/
*.gguf
*.safetensors
venv/
.venv/
__pycache__/
";

pub const BOOTSTRAP_API_KEY_ENV: &str = "AGENT_UI_API_KEY";
