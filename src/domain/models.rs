use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

#[derive(Serialize)]
pub struct JsonErr {
    pub ok: bool,
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Outcome of one best-effort external step (git, gh, compose, capture).
#[derive(Debug, Serialize, Clone)]
pub struct StepOutcome {
    pub step: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StepOutcome {
    pub fn ok(step: &str) -> Self {
        Self {
            step: step.to_string(),
            status: "ok".to_string(),
            detail: None,
        }
    }

    pub fn failed(step: &str, detail: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            status: "failed".to_string(),
            detail: Some(detail.into()),
        }
    }

    pub fn skipped(step: &str) -> Self {
        Self {
            step: step.to_string(),
            status: "skipped".to_string(),
            detail: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportReport {
    pub repo_name: String,
    pub source: String,
    pub destination: String,
    pub copied: usize,
    pub skipped: usize,
    pub redacted_files: Vec<String>,
    pub redacted_lines: usize,
    pub steps: Vec<StepOutcome>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    AlreadyExecutable,
    WouldChange,
    Changed,
    Failed,
}

#[derive(Debug, Serialize, Clone)]
pub struct PermsEntry {
    pub path: String,
    pub outcome: FileOutcome,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub escalated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ListingEntry {
    pub path: String,
    pub mode: String,
}

#[derive(Debug, Serialize)]
pub struct PermsReport {
    pub root: String,
    pub pattern: String,
    pub dry_run: bool,
    pub entries: Vec<PermsEntry>,
    pub listing: Vec<ListingEntry>,
}

impl PermsReport {
    pub fn count(&self, outcome: FileOutcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }
}

#[derive(Debug, Serialize)]
pub struct DiagReport {
    pub archive: String,
    pub checksum: String,
    pub captures: Vec<StepOutcome>,
    pub failed_captures: usize,
}

#[derive(Debug, Serialize)]
pub struct ExtractSection {
    pub name: String,
    /// `archive`, `live` or `unavailable`.
    pub source: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractReport {
    pub archive: String,
    pub extracted_to: String,
    /// `ok` or `absent`; a mismatch aborts before extraction.
    pub checksum: String,
    pub sections: Vec<ExtractSection>,
}

#[derive(Debug, Serialize)]
pub struct RemapReport {
    pub compose_file: String,
    pub service: String,
    pub from: String,
    pub to: String,
    /// 1-based line number of the rewritten mapping.
    pub line: usize,
    pub backup: String,
    pub restart: StepOutcome,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RemoteRequest {
    pub host: String,
    #[serde(default)]
    pub user: Option<String>,
    pub cmd: String,
    #[serde(default)]
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RemoteResponse {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
pub struct BootstrapReport {
    pub project_dir: String,
    pub variant: String,
    pub written: Vec<String>,
    pub kept: Vec<String>,
    pub steps: Vec<StepOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_pid: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HealthItem {
    pub name: String,
    pub url: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RestartReport {
    pub service: String,
    pub returncode: i32,
    pub output: String,
}

#[derive(Debug, Serialize)]
pub struct RedactReport {
    pub file: String,
    pub redacted_lines: usize,
    pub in_place: bool,
    /// Redacted bytes when the file was not rewritten.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "lossy_text"
    )]
    pub content: Option<Vec<u8>>,
}

fn lossy_text<S: serde::Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(b) => s.serialize_str(&String::from_utf8_lossy(b)),
        None => s.serialize_none(),
    }
}
