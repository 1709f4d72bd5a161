use crate::domain::config::{DiagnosticsConfig, GeneralConfig};
use crate::domain::constants::{
    service_logs_file, ARCHIVE_PREFIX, ARCHIVE_SUFFIX, EXTRACT_PREFIX, SUMMARY_FILE,
    SUMMARY_HEAD_LINES,
};
use crate::domain::errors::OpsError;
use crate::domain::models::{ExtractReport, ExtractSection};
use crate::services::diagnostics::{checksum_path, sha256_file};
use crate::services::process::{compose_spec, CommandRunner};
use flate2::read::GzDecoder;
use std::path::{Path, PathBuf};

pub fn latest_archive(out_root: &Path) -> anyhow::Result<PathBuf> {
    let mut names: Vec<String> = match std::fs::read_dir(out_root) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with(ARCHIVE_PREFIX) && n.ends_with(ARCHIVE_SUFFIX))
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    match names.pop() {
        Some(name) => Ok(out_root.join(name)),
        None => Err(OpsError::NotFound(format!(
            "no {}*{} archive under {}",
            ARCHIVE_PREFIX,
            ARCHIVE_SUFFIX,
            out_root.display()
        ))
        .into()),
    }
}

fn archive_stamp(archive: &Path) -> String {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    name.strip_prefix(ARCHIVE_PREFIX)
        .and_then(|n| n.strip_suffix(ARCHIVE_SUFFIX))
        .unwrap_or(&name)
        .to_string()
}

/// Returns `ok` or `absent`; a mismatch is an error.
fn verify_checksum(archive: &Path) -> anyhow::Result<&'static str> {
    let sidecar = checksum_path(archive);
    if !sidecar.exists() {
        return Ok("absent");
    }
    let raw = std::fs::read_to_string(&sidecar)?;
    let expected = raw.split_whitespace().next().unwrap_or("").to_ascii_lowercase();
    let actual = sha256_file(archive)?;
    if expected != actual {
        return Err(OpsError::ChecksumMismatch {
            path: archive.to_string_lossy().to_string(),
            expected,
            actual,
        }
        .into());
    }
    Ok("ok")
}

fn unpack(archive: &Path, dest: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dest)?;
    let file = std::fs::File::open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    tar.set_preserve_permissions(false);
    tar.unpack(dest)?;
    Ok(())
}

/// The archive normally holds one `infra_diag_<ts>/` directory; tolerate flat ones.
fn content_dir(extract_dir: &Path, stamp: &str) -> PathBuf {
    let expected = extract_dir.join(format!("{}{}", ARCHIVE_PREFIX, stamp));
    if expected.join(SUMMARY_FILE).exists() {
        return expected;
    }
    if extract_dir.join(SUMMARY_FILE).exists() {
        return extract_dir.to_path_buf();
    }
    std::fs::read_dir(extract_dir)
        .ok()
        .and_then(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.path())
                .find(|p| p.join(SUMMARY_FILE).exists())
        })
        .unwrap_or(expected)
}

fn head(text: &str, n: usize) -> Vec<String> {
    text.lines().take(n).map(str::to_string).collect()
}

fn tail(text: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

pub struct ExtractRequest<'a> {
    pub out_root: &'a str,
    pub archive: Option<&'a str>,
    pub lines: usize,
}

pub fn extract(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    cfg: &DiagnosticsConfig,
    req: &ExtractRequest<'_>,
) -> anyhow::Result<ExtractReport> {
    let out_root = PathBuf::from(req.out_root);
    let archive = match req.archive {
        Some(a) => {
            let p = PathBuf::from(a);
            if !p.is_file() {
                return Err(OpsError::NotFound(format!("archive not found: {}", a)).into());
            }
            p
        }
        None => latest_archive(&out_root)?,
    };
    let checksum = verify_checksum(&archive)?;

    let stamp = archive_stamp(&archive);
    let extract_dir = out_root.join(format!("{}{}", EXTRACT_PREFIX, stamp));
    unpack(&archive, &extract_dir)?;
    tracing::info!(archive = %archive.display(), dest = %extract_dir.display(), "extracted diagnostics");

    let content = content_dir(&extract_dir, &stamp);
    let mut sections = Vec::new();

    sections.push(match std::fs::read_to_string(content.join(SUMMARY_FILE)) {
        Ok(text) => ExtractSection {
            name: "summary".to_string(),
            source: "archive".to_string(),
            lines: head(&text, SUMMARY_HEAD_LINES),
        },
        Err(_) => ExtractSection {
            name: "summary".to_string(),
            source: "unavailable".to_string(),
            lines: vec![],
        },
    });

    for service in &cfg.services {
        sections.push(service_section(runner, general, &content, service, req.lines));
    }

    Ok(ExtractReport {
        archive: archive.to_string_lossy().to_string(),
        extracted_to: extract_dir.to_string_lossy().to_string(),
        checksum: checksum.to_string(),
        sections,
    })
}

fn service_section(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    content: &Path,
    service: &str,
    lines: usize,
) -> ExtractSection {
    let name = format!("{} logs", service);
    if let Ok(text) = std::fs::read_to_string(content.join(service_logs_file(service))) {
        return ExtractSection {
            name,
            source: "archive".to_string(),
            lines: tail(&text, lines),
        };
    }

    let n = lines.to_string();
    let spec = compose_spec(general, None).args(["logs", "--no-color", "--tail", n.as_str(), service]);
    match runner.run(&spec) {
        Ok(out) if out.success() => ExtractSection {
            name,
            source: "live".to_string(),
            lines: tail(&out.stdout_text(), lines),
        },
        Ok(out) => {
            tracing::warn!(service, detail = %out.failure_detail(), "live log fallback failed");
            ExtractSection {
                name,
                source: "unavailable".to_string(),
                lines: vec![out.failure_detail()],
            }
        }
        Err(e) => {
            tracing::warn!(service, error = %e, "live log fallback could not start");
            ExtractSection {
                name,
                source: "unavailable".to_string(),
                lines: vec![e.to_string()],
            }
        }
    }
}
