use crate::domain::config::GeneralConfig;
use crate::domain::errors::OpsError;
use crate::domain::models::{FileOutcome, ListingEntry, PermsEntry, PermsReport};
use crate::services::pattern::NameGlob;
use crate::services::process::{CommandRunner, CommandSpec};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const OWNER_EXEC: u32 = 0o100;
const ALL_EXEC: u32 = 0o111;

pub fn fix_executable_bits(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    root: &str,
    pattern: &str,
    dry_run: bool,
) -> anyhow::Result<PermsReport> {
    let root_path = PathBuf::from(root);
    if !root_path.is_dir() {
        return Err(OpsError::Precondition(format!("directory not found: {}", root)).into());
    }
    let glob = NameGlob::new(pattern)?;
    let files = matching_files(&root_path, &glob);
    tracing::info!(root, pattern, matched = files.len(), dry_run, "normalizing executable bits");

    let mut entries = Vec::with_capacity(files.len());
    for path in &files {
        entries.push(normalize_one(runner, general, path, dry_run));
    }

    let listing = files
        .iter()
        .map(|p| ListingEntry {
            path: p.to_string_lossy().to_string(),
            mode: std::fs::symlink_metadata(p)
                .map(|m| mode_string(m.permissions().mode(), m.is_dir()))
                .unwrap_or_else(|_| "?".to_string()),
        })
        .collect();

    Ok(PermsReport {
        root: root.to_string(),
        pattern: glob.as_str().to_string(),
        dry_run,
        entries,
        listing,
    })
}

fn matching_files(root: &Path, glob: &NameGlob) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| glob.matches(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect()
}

fn normalize_one(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    path: &Path,
    dry_run: bool,
) -> PermsEntry {
    let shown = path.to_string_lossy().to_string();
    let mode = match std::fs::metadata(path) {
        Ok(m) => m.permissions().mode(),
        Err(e) => return failed(shown, format!("stat failed: {}", e)),
    };
    if mode & OWNER_EXEC != 0 {
        return entry(shown, FileOutcome::AlreadyExecutable);
    }
    if dry_run {
        return entry(shown, FileOutcome::WouldChange);
    }

    let direct = std::fs::set_permissions(path, std::fs::Permissions::from_mode((mode & 0o7777) | ALL_EXEC));
    match direct {
        Ok(()) => entry(shown, FileOutcome::Changed),
        Err(err) => escalate(runner, general, shown, &err, nix::unistd::Uid::effective().is_root()),
    }
}

/// Retries a failed chmod through `sudo -n`. Root has nobody to escalate to.
fn escalate(
    runner: &dyn CommandRunner,
    general: &GeneralConfig,
    shown: String,
    err: &std::io::Error,
    is_root: bool,
) -> PermsEntry {
    if is_root {
        return failed(shown, format!("chmod failed: {}", err));
    }
    tracing::info!(path = %shown, error = %err, "direct chmod failed, escalating");
    let spec = CommandSpec::new(&general.sudo_bin)
        .args(["-n", "chmod", "+x"])
        .arg(shown.clone());
    match runner.run(&spec) {
        Ok(out) if out.success() => PermsEntry {
            path: shown,
            outcome: FileOutcome::Changed,
            escalated: true,
            reason: None,
        },
        Ok(out) => failed(
            shown,
            format!("chmod failed: {}; sudo: {}", err, out.failure_detail()),
        ),
        Err(e) => failed(shown, format!("chmod failed: {}; sudo: {}", err, e)),
    }
}

fn entry(path: String, outcome: FileOutcome) -> PermsEntry {
    PermsEntry {
        path,
        outcome,
        escalated: false,
        reason: None,
    }
}

fn failed(shown: String, reason: String) -> PermsEntry {
    tracing::warn!(path = %shown, reason = %reason, "could not make executable");
    PermsEntry {
        path: shown,
        outcome: FileOutcome::Failed,
        escalated: false,
        reason: Some(reason),
    }
}

/// `ls -l` style permission string, e.g. `-rwxr-xr-x`.
pub fn mode_string(mode: u32, is_dir: bool) -> String {
    let mut s = String::with_capacity(10);
    s.push(if is_dir { 'd' } else { '-' });
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::process::testing::{failing, RecordingRunner};
    use std::fs;
    use std::io;

    fn denied() -> io::Error {
        io::Error::from(io::ErrorKind::PermissionDenied)
    }

    fn write_mode(path: &Path, mode: u32) {
        fs::write(path, "#!/bin/sh\necho hi\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn mode_string_matches_ls_format() {
        assert_eq!(mode_string(0o755, false), "-rwxr-xr-x");
        assert_eq!(mode_string(0o640, false), "-rw-r-----");
        assert_eq!(mode_string(0o700, true), "drwx------");
    }

    #[test]
    fn dry_run_changes_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let plain = dir.path().join("plain.sh");
        let exec = dir.path().join("exec.sh");
        write_mode(&plain, 0o644);
        write_mode(&exec, 0o755);

        let runner = RecordingRunner::default();
        let report = fix_executable_bits(
            &runner,
            &GeneralConfig::default(),
            dir.path().to_str().unwrap(),
            "*.sh",
            true,
        )
        .unwrap();

        assert_eq!(mode_of(&plain), 0o644);
        assert_eq!(mode_of(&exec), 0o755);
        assert_eq!(report.count(FileOutcome::WouldChange), 1);
        assert_eq!(report.count(FileOutcome::AlreadyExecutable), 1);
        assert_eq!(report.entries.len(), 2);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn fixes_nested_files_with_awkward_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("sub dir");
        fs::create_dir_all(&nested).unwrap();
        let odd = nested.join("line\nbreak.sh");
        let spaced = dir.path().join("has space.sh");
        let other = dir.path().join("notes.txt");
        write_mode(&odd, 0o644);
        write_mode(&spaced, 0o600);
        write_mode(&other, 0o644);

        let runner = RecordingRunner::default();
        let report = fix_executable_bits(
            &runner,
            &GeneralConfig::default(),
            dir.path().to_str().unwrap(),
            "*.sh",
            false,
        )
        .unwrap();

        assert_eq!(report.count(FileOutcome::Changed), 2);
        assert_eq!(mode_of(&odd), 0o755);
        assert_eq!(mode_of(&spaced), 0o711);
        assert_eq!(mode_of(&other), 0o644);
        assert_eq!(report.listing.len(), 2);
        assert!(report.listing.iter().all(|l| l.mode.starts_with("-rwx")));
    }

    #[test]
    fn missing_root_is_a_precondition_failure() {
        let runner = RecordingRunner::default();
        let err = fix_executable_bits(
            &runner,
            &GeneralConfig::default(),
            "/definitely/not/here",
            "*.sh",
            false,
        )
        .unwrap_err();
        assert_eq!(crate::domain::errors::classify(&err).1, 2);
    }

    #[test]
    fn denied_chmod_escalates_through_sudo() {
        let runner = RecordingRunner::default();
        let entry = escalate(&runner, &GeneralConfig::default(), "/srv/run.sh".into(), &denied(), false);

        assert_eq!(entry.outcome, FileOutcome::Changed);
        assert!(entry.escalated);
        assert!(entry.reason.is_none());
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "sudo");
        assert_eq!(calls[0].args, vec!["-n", "chmod", "+x", "/srv/run.sh"]);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["escalated"], true);
        assert_eq!(json["outcome"], "changed");
    }

    #[test]
    fn sudo_refusal_is_reported_with_both_errors() {
        let runner = RecordingRunner::default();
        runner.push_output(failing(1, "sudo: a password is required"));
        let entry = escalate(&runner, &GeneralConfig::default(), "/srv/run.sh".into(), &denied(), false);

        assert_eq!(entry.outcome, FileOutcome::Failed);
        assert!(!entry.escalated);
        let reason = entry.reason.unwrap();
        assert!(reason.starts_with("chmod failed: "), "{}", reason);
        assert!(reason.contains("a password is required"), "{}", reason);
    }

    #[test]
    fn missing_sudo_is_a_failed_entry() {
        let runner = RecordingRunner::default();
        runner.push_missing_program();
        let entry = escalate(&runner, &GeneralConfig::default(), "/srv/run.sh".into(), &denied(), false);
        assert_eq!(entry.outcome, FileOutcome::Failed);
        assert!(entry.reason.unwrap().contains("sudo: not found"));
    }

    #[test]
    fn root_does_not_escalate() {
        let runner = RecordingRunner::default();
        let entry = escalate(&runner, &GeneralConfig::default(), "/srv/run.sh".into(), &denied(), true);
        assert_eq!(entry.outcome, FileOutcome::Failed);
        assert!(runner.calls().is_empty());
    }
}
