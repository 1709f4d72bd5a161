use crate::domain::config::GeneralConfig;
use crate::domain::errors::OpsError;
use crate::domain::models::{RemapReport, StepOutcome};
use crate::services::process::{compose_spec, CommandRunner};
use std::path::{Path, PathBuf};

pub struct RemapRequest<'a> {
    pub compose_file: &'a str,
    pub service: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub restart: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Patched {
    pub text: String,
    /// 1-based line number of the rewritten item.
    pub line: usize,
}

fn split_terminator(raw: &str) -> (&str, &str) {
    if let Some(body) = raw.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = raw.strip_suffix('\n') {
        (body, "\n")
    } else {
        (raw, "")
    }
}

fn is_service_key(trimmed: &str, service: &str) -> bool {
    let Some(rest) = trimmed
        .strip_prefix(service)
        .and_then(|r| r.strip_prefix(':'))
    else {
        return false;
    };
    let rest = rest.trim_start();
    rest.is_empty() || rest.starts_with('#')
}

/// Rewrites `- <from>` (bare or quoted) in a list item line, keeping quoting,
/// indentation and any trailing comment.
fn replace_list_item(body: &str, from: &str, to: &str) -> Option<String> {
    let trimmed = body.trim_start();
    let after_dash = trimmed.strip_prefix('-')?;
    if !after_dash.starts_with([' ', '\t']) {
        return None;
    }
    let item = after_dash.trim_start();
    let value_len = match item.find(" #") {
        Some(i) => item[..i].trim_end().len(),
        None => item.trim_end().len(),
    };
    let value = &item[..value_len];
    let replacement = if value == from {
        to.to_string()
    } else if value == format!("\"{}\"", from) {
        format!("\"{}\"", to)
    } else if value == format!("'{}'", from) {
        format!("'{}'", to)
    } else {
        return None;
    };
    let start = body.len() - item.len();
    Some(format!(
        "{}{}{}",
        &body[..start],
        replacement,
        &body[start + value_len..]
    ))
}

/// Replaces the first `from` port item inside the `service` block.
///
/// The block starts at the `service:` key line and ends at the next
/// non-blank, non-comment line indented at or below that key.
pub fn patch_port_mapping(text: &str, service: &str, from: &str, to: &str) -> anyhow::Result<Patched> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut block_indent: Option<usize> = None;
    let mut service_seen = false;

    for (i, raw) in lines.iter().enumerate() {
        let (body, _) = split_terminator(raw);
        let trimmed = body.trim_start();
        let indent = body.len() - trimmed.len();

        if let Some(key_indent) = block_indent {
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if indent > key_indent {
                if let Some(new_body) = replace_list_item(body, from, to) {
                    let (_, ending) = split_terminator(raw);
                    let mut out = String::with_capacity(text.len() + to.len());
                    for prev in &lines[..i] {
                        out.push_str(prev);
                    }
                    out.push_str(&new_body);
                    out.push_str(ending);
                    for next in &lines[i + 1..] {
                        out.push_str(next);
                    }
                    return Ok(Patched {
                        text: out,
                        line: i + 1,
                    });
                }
                continue;
            }
            block_indent = None;
        }

        if is_service_key(trimmed, service) {
            service_seen = true;
            block_indent = Some(indent);
        }
    }

    if !service_seen {
        return Err(OpsError::NotFound(format!("service block not found: {}", service)).into());
    }
    Err(OpsError::PatchFailed(format!(
        "port mapping {} not found in service {}",
        from, service
    ))
    .into())
}

fn yaml_item_text(v: &serde_yaml::Value) -> Option<String> {
    match v {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_compose(text: &str, which: &str) -> anyhow::Result<serde_yaml::Value> {
    serde_yaml::from_str(text).map_err(|e| {
        OpsError::PatchFailed(format!("{} document is not valid YAML: {}", which, e)).into()
    })
}

/// How many entries of `services.<service>.ports` equal `mapping`.
fn ports_count(doc: &serde_yaml::Value, service: &str, mapping: &str) -> usize {
    let services = doc.get("services").unwrap_or(doc);
    services
        .get(service)
        .and_then(|s| s.get("ports"))
        .and_then(|p| p.as_sequence())
        .map_or(0, |ports| {
            ports
                .iter()
                .filter_map(yaml_item_text)
                .filter(|p| p == mapping)
                .count()
        })
}

/// Checks that the edit moved exactly one `from` entry of `services.<service>.ports` to `to`.
pub fn validate_patched(
    original: &str,
    patched: &str,
    service: &str,
    from: &str,
    to: &str,
) -> anyhow::Result<()> {
    let before = parse_compose(original, "original")?;
    let after = parse_compose(patched, "patched")?;
    let moved = if from == to {
        ports_count(&after, service, to) > 0
    } else {
        ports_count(&after, service, to) == ports_count(&before, service, to) + 1
            && ports_count(&after, service, from) + 1 == ports_count(&before, service, from)
    };
    if moved {
        Ok(())
    } else {
        Err(OpsError::PatchFailed(format!(
            "the edited line is not a {} entry of services.{}.ports",
            from, service
        ))
        .into())
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

fn write_replacing(path: &Path, body: &str) -> anyhow::Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".stackops-tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, body)?;
    if let Ok(meta) = std::fs::metadata(path) {
        let _ = std::fs::set_permissions(&tmp, meta.permissions());
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn remap_port(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    req: &RemapRequest<'_>,
) -> anyhow::Result<RemapReport> {
    let path = PathBuf::from(req.compose_file);
    if !path.is_file() {
        return Err(OpsError::Precondition(format!(
            "compose file not found: {}",
            req.compose_file
        ))
        .into());
    }
    let original = std::fs::read_to_string(&path)?;
    let patched = patch_port_mapping(&original, req.service, req.from, req.to)?;
    validate_patched(&original, &patched.text, req.service, req.from, req.to)?;

    let backup = backup_path(&path);
    std::fs::copy(&path, &backup)?;
    write_replacing(&path, &patched.text)?;
    tracing::info!(
        file = %path.display(),
        service = req.service,
        from = req.from,
        to = req.to,
        line = patched.line,
        "port mapping rewritten"
    );

    let restart = if req.restart {
        let spec = compose_spec(general, Some(&path)).args(["restart", req.service]);
        match runner.run(&spec) {
            Ok(out) if out.success() => StepOutcome::ok("restart"),
            Ok(out) => anyhow::bail!(
                "compose file updated but restart of {} failed: {}",
                req.service,
                out.failure_detail()
            ),
            Err(e) => anyhow::bail!(
                "compose file updated but restart of {} could not start: {}",
                req.service,
                e
            ),
        }
    } else {
        StepOutcome::skipped("restart")
    };

    Ok(RemapReport {
        compose_file: req.compose_file.to_string(),
        service: req.service.to_string(),
        from: req.from.to_string(),
        to: req.to.to_string(),
        line: patched.line,
        backup: backup.to_string_lossy().to_string(),
        restart,
    })
}
