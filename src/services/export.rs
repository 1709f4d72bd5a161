use crate::domain::config::{ExportConfig, GeneralConfig};
use crate::domain::constants::GITIGNORE_BODY;
use crate::domain::errors::OpsError;
use crate::domain::models::{ExportReport, StepOutcome};
use crate::services::pattern::{compile_all, NameGlob};
use crate::services::process::{CommandRunner, CommandSpec};
use crate::services::redact::redact_file;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

pub struct ExportRequest<'a> {
    pub repo_name: &'a str,
    pub src: &'a str,
    pub dest: &'a str,
    pub extra_excludes: &'a [String],
    pub private: bool,
    pub publish: bool,
    pub force: bool,
}

pub fn run_export(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    cfg: &ExportConfig,
    req: &ExportRequest<'_>,
) -> anyhow::Result<ExportReport> {
    let src = PathBuf::from(req.src);
    if !src.is_dir() {
        return Err(OpsError::Precondition(format!("source directory not found: {}", req.src)).into());
    }
    let dest = PathBuf::from(req.dest);
    if src.canonicalize()?.starts_with(resolved(&dest)?) {
        return Err(OpsError::Precondition(format!(
            "destination {} is or contains the source {}",
            req.dest, req.src
        ))
        .into());
    }
    prepare_destination(&dest, req.force)?;

    let mut patterns = cfg.exclude.clone();
    patterns.extend(req.extra_excludes.iter().cloned());
    let excludes = compile_all(&patterns)?;

    let (copied, skipped) = copy_filtered(&src, &dest, &excludes)?;
    tracing::info!(copied, skipped, dest = %dest.display(), "copied export tree");

    let (redacted_files, redacted_lines) = redact_targets(&dest, &cfg.config_dir)?;
    write_gitignore(&dest)?;

    let mut steps = snapshot(runner, general, &dest, &cfg.commit_message);
    steps.push(if req.publish {
        publish(runner, general, &dest, req.repo_name, req.private)
    } else {
        StepOutcome::skipped("publish")
    });

    Ok(ExportReport {
        repo_name: req.repo_name.to_string(),
        source: req.src.to_string(),
        destination: req.dest.to_string(),
        copied,
        skipped,
        redacted_files,
        redacted_lines,
        steps,
    })
}

/// Absolute `path` with symlinks resolved as far as it exists on disk.
fn resolved(path: &Path) -> std::io::Result<PathBuf> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut missing = Vec::new();
    let mut cur = abs.as_path();
    loop {
        if let Ok(real) = cur.canonicalize() {
            return Ok(missing.iter().rev().fold(real, |acc, name| acc.join(name)));
        }
        match (cur.parent(), cur.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                cur = parent;
            }
            _ => return Ok(abs),
        }
    }
}

fn prepare_destination(dest: &Path, force: bool) -> anyhow::Result<()> {
    if dest.exists() {
        let empty = dest.is_dir() && std::fs::read_dir(dest)?.next().is_none();
        if !empty {
            if !force {
                return Err(OpsError::Precondition(format!(
                    "destination is not empty: {} (use --force to replace it)",
                    dest.display()
                ))
                .into());
            }
            if dest.is_dir() {
                std::fs::remove_dir_all(dest)?;
            } else {
                std::fs::remove_file(dest)?;
            }
        }
    }
    std::fs::create_dir_all(dest)?;
    Ok(())
}

fn excluded(name: &str, excludes: &[NameGlob]) -> bool {
    excludes.iter().any(|g| g.matches(name))
}

fn copy_filtered(src: &Path, dest: &Path, excludes: &[NameGlob]) -> anyhow::Result<(usize, usize)> {
    let dest_abs = dest.canonicalize()?;
    let mut copied = 0usize;
    let mut skipped = 0usize;

    let walker = WalkDir::new(src).follow_links(false).into_iter();
    let walker = walker.filter_entry(|e| {
        if e.depth() == 0 {
            return true;
        }
        let keep = !excluded(&e.file_name().to_string_lossy(), excludes)
            && e.path().canonicalize().map(|p| p != dest_abs).unwrap_or(true);
        if !keep {
            tracing::debug!(path = %e.path().display(), "excluded from export");
            skipped += 1;
        }
        keep
    });

    for entry in walker {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }
        let rel = entry.path().strip_prefix(src)?;
        let to = dest.join(rel);
        let ty = entry.file_type();
        if ty.is_dir() {
            std::fs::create_dir_all(&to)?;
        } else if ty.is_symlink() {
            let target = std::fs::read_link(entry.path())?;
            std::os::unix::fs::symlink(target, &to)?;
            copied += 1;
        } else {
            std::fs::copy(entry.path(), &to)?;
            copied += 1;
        }
    }
    Ok((copied, skipped))
}

fn redact_targets(dest: &Path, config_dir: &str) -> anyhow::Result<(Vec<String>, usize)> {
    let env_glob = NameGlob::new("*.env")?;
    let config_root = dest.join(config_dir);
    let mut targets: Vec<PathBuf> = Vec::new();

    if config_root.is_dir() {
        for entry in WalkDir::new(&config_root).follow_links(false) {
            let entry = entry?;
            if entry.file_type().is_file() {
                targets.push(entry.into_path());
            }
        }
    }
    for entry in std::fs::read_dir(dest)? {
        let entry = entry?;
        if entry.file_type()?.is_file() && env_glob.matches(&entry.file_name().to_string_lossy()) {
            targets.push(entry.path());
        }
    }
    targets.sort();

    let mut files = Vec::new();
    let mut lines = 0usize;
    for path in targets {
        let count = redact_file(&path)?;
        if count > 0 {
            files.push(relative_display(dest, &path));
            lines += count;
        }
    }
    tracing::info!(files = files.len(), lines, "redacted export");
    Ok((files, lines))
}

fn relative_display(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn write_gitignore(dest: &Path) -> anyhow::Result<()> {
    let path = dest.join(".gitignore");
    let mut body = if path.exists() {
        std::fs::read_to_string(&path)?
    } else {
        String::new()
    };
    if !body.contains(GITIGNORE_BODY) {
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        body.push_str(GITIGNORE_BODY);
        std::fs::write(path, body)?;
    }
    Ok(())
}

fn step(runner: &dyn CommandRunner, name: &str, spec: CommandSpec) -> StepOutcome {
    match runner.run(&spec) {
        Ok(out) if out.success() => StepOutcome::ok(name),
        Ok(out) => {
            tracing::warn!(step = name, detail = %out.failure_detail(), "export step failed");
            StepOutcome::failed(name, out.failure_detail())
        }
        Err(e) => {
            tracing::warn!(step = name, error = %e, "export step could not start");
            StepOutcome::failed(name, e.to_string())
        }
    }
}

fn snapshot(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    dest: &Path,
    message: &str,
) -> Vec<StepOutcome> {
    let git = |args: &[&str]| {
        CommandSpec::new(&general.git_bin)
            .args(args.iter().copied())
            .cwd(dest)
    };
    vec![
        step(runner, "git_init", git(&["init", "--quiet"])),
        step(runner, "git_add", git(&["add", "-A"])),
        step(runner, "git_commit", git(&["commit", "--quiet", "-m", message])),
    ]
}

fn publish(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    dest: &Path,
    repo_name: &str,
    private: bool,
) -> StepOutcome {
    let visibility = if private { "--private" } else { "--public" };
    let spec = CommandSpec::new(&general.gh_bin)
        .args(["repo", "create", repo_name, visibility, "--source"])
        .arg(dest.to_string_lossy().to_string())
        .arg("--push")
        .cwd(dest);
    step(runner, "publish", spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::process::testing::{failing, RecordingRunner};
    use std::fs;

    fn fixture(root: &Path) {
        fs::create_dir_all(root.join("config/nested")).unwrap();
        fs::create_dir_all(root.join("models/llama")).unwrap();
        fs::create_dir_all(root.join("app/__pycache__")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("config/app.conf"), "PORT=80\nADMIN_PASSWORD=x\n").unwrap();
        fs::write(root.join("config/nested/db.ini"), "# creds\nDB_TOKEN=abc\n").unwrap();
        fs::write(root.join("models/llama/w.gguf"), "weights").unwrap();
        fs::write(root.join("app/main.py"), "SECRET_KEY='stays in code'\n").unwrap();
        fs::write(root.join("app/__pycache__/main.pyc"), "bytes").unwrap();
        fs::write(root.join(".git/HEAD"), "ref").unwrap();
        fs::write(root.join(".env"), "OPENAI_API_KEY=sk-live\n").unwrap();
        fs::write(root.join("prod.env"), "RQ_HOST=redis\nRQ_PASSWORD=pw\n").unwrap();
    }

    fn request<'a>(src: &'a str, dest: &'a str, publish: bool) -> ExportRequest<'a> {
        ExportRequest {
            repo_name: "stack-export",
            src,
            dest,
            extra_excludes: &[],
            private: true,
            publish,
            force: false,
        }
    }

    #[test]
    fn export_copies_filters_and_redacts() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        fixture(&src);

        let runner = RecordingRunner::default();
        let report = run_export(
            &runner,
            &GeneralConfig::default(),
            &ExportConfig::default(),
            &request(src.to_str().unwrap(), dest.to_str().unwrap(), false),
        )
        .unwrap();

        assert!(!dest.join("models").exists());
        assert!(!dest.join(".env").exists());
        assert!(!dest.join(".git/HEAD").exists());
        assert!(!dest.join("app/__pycache__").exists());
        assert_eq!(
            fs::read_to_string(dest.join("app/main.py")).unwrap(),
            "SECRET_KEY='stays in code'\n"
        );
        assert_eq!(
            fs::read_to_string(dest.join("config/app.conf")).unwrap(),
            "PORT=80\nADMIN_PASSWORD=REDACTED\n"
        );
        assert_eq!(
            fs::read_to_string(dest.join("prod.env")).unwrap(),
            "RQ_HOST=redis\nRQ_PASSWORD=REDACTED\n"
        );
        assert_eq!(
            report.redacted_files,
            vec!["config/app.conf", "config/nested/db.ini", "prod.env"]
        );
        assert_eq!(report.redacted_lines, 3);
        assert!(fs::read_to_string(dest.join(".gitignore"))
            .unwrap()
            .contains("models/"));

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].args, vec!["init", "--quiet"]);
        assert_eq!(calls[2].args[..2], ["commit", "--quiet"]);
        assert_eq!(report.steps.last().unwrap().status, "skipped");
    }

    #[test]
    fn failed_git_and_publish_steps_are_not_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        fixture(&src);

        let runner = RecordingRunner::default();
        runner.push_missing_program();
        runner.push_output(failing(128, "not a repo"));
        runner.push_output(failing(1, "nothing to commit"));
        runner.push_output(failing(1, "gh: not logged in"));

        let report = run_export(
            &runner,
            &GeneralConfig::default(),
            &ExportConfig::default(),
            &request(src.to_str().unwrap(), dest.to_str().unwrap(), true),
        )
        .unwrap();

        assert!(report.steps.iter().all(|s| s.status == "failed"));
        let gh = runner.calls().pop().unwrap();
        assert_eq!(gh.program, "gh");
        assert!(gh.args.contains(&"--private".to_string()));
        assert!(gh.args.contains(&"stack-export".to_string()));
    }

    #[test]
    fn destination_inside_source_is_not_copied_into_itself() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fixture(&src);
        let dest = src.join("export");

        let runner = RecordingRunner::default();
        run_export(
            &runner,
            &GeneralConfig::default(),
            &ExportConfig::default(),
            &request(src.to_str().unwrap(), dest.to_str().unwrap(), false),
        )
        .unwrap();
        assert!(!dest.join("export").exists());
        assert!(dest.join("prod.env").exists());
    }

    #[test]
    fn non_empty_destination_needs_force() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        fixture(&src);
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("old.txt"), "stale").unwrap();

        let runner = RecordingRunner::default();
        let err = run_export(
            &runner,
            &GeneralConfig::default(),
            &ExportConfig::default(),
            &request(src.to_str().unwrap(), dest.to_str().unwrap(), false),
        )
        .unwrap_err();
        assert_eq!(crate::domain::errors::classify(&err), ("PRECONDITION", 2));

        let mut forced = request(src.to_str().unwrap(), dest.to_str().unwrap(), false);
        forced.force = true;
        run_export(&runner, &GeneralConfig::default(), &ExportConfig::default(), &forced).unwrap();
        assert!(!dest.join("old.txt").exists());
    }

    #[test]
    fn destination_containing_source_is_refused_before_removal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("app");
        fixture(&src);

        let runner = RecordingRunner::default();
        for dest in [tmp.path().to_path_buf(), src.clone(), src.join("..")] {
            let mut req = request(src.to_str().unwrap(), dest.to_str().unwrap(), false);
            req.force = true;
            let err = run_export(&runner, &GeneralConfig::default(), &ExportConfig::default(), &req)
                .unwrap_err();
            assert_eq!(crate::domain::errors::classify(&err), ("PRECONDITION", 2));
        }
        assert!(src.join("prod.env").exists());
        assert!(src.join("config/app.conf").exists());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn non_utf8_config_files_are_still_redacted() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dest = tmp.path().join("out");
        fixture(&src);
        fs::write(src.join("config/app.conf"), b"# caf\xe9\nADMIN_PASSWORD=x\n").unwrap();

        let runner = RecordingRunner::default();
        let report = run_export(
            &runner,
            &GeneralConfig::default(),
            &ExportConfig::default(),
            &request(src.to_str().unwrap(), dest.to_str().unwrap(), false),
        )
        .unwrap();

        assert_eq!(
            fs::read(dest.join("config/app.conf")).unwrap(),
            b"# caf\xe9\nADMIN_PASSWORD=REDACTED\n".to_vec()
        );
        assert!(report.redacted_files.contains(&"config/app.conf".to_string()));
    }
}
