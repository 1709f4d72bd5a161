use crate::domain::config::Config;
use crate::domain::errors::OpsError;
use std::path::PathBuf;

pub const CONFIG_ENV: &str = "STACKOPS_CONFIG";

fn config_home() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home).join(".config/stackops"))
}

/// `--config` wins over `$STACKOPS_CONFIG`, which wins over the home default.
pub fn config_path(explicit: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(PathBuf::from(p));
    }
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        if !p.is_empty() {
            return Ok(PathBuf::from(p));
        }
    }
    Ok(config_home()?.join("config.toml"))
}

pub fn load_config(explicit: Option<&str>) -> anyhow::Result<Config> {
    let path = match config_path(explicit) {
        Ok(p) => p,
        Err(_) => return Ok(Config::default()),
    };
    if !path.exists() {
        if explicit.is_some() {
            return Err(OpsError::Precondition(format!(
                "config file not found: {}",
                path.display()
            ))
            .into());
        }
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(cfg)
}

pub fn audit(action: &str, data: serde_json::Value) {
    let path = match config_home() {
        Ok(dir) => dir.join("audit.jsonl"),
        Err(_) => return,
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let event = serde_json::json!({
        "ts": chrono::Utc::now().to_rfc3339(),
        "action": action,
        "data": data
    });
    let line = format!("{}\n", event);
    let _ = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
}
