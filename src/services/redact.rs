use crate::domain::constants::{REDACTED_MARKER, SENSITIVE_FRAGMENTS};
use crate::domain::errors::OpsError;
use crate::domain::models::RedactReport;
use std::borrow::Cow;
use std::path::Path;

pub fn is_sensitive_key(key: &str) -> bool {
    is_sensitive_key_bytes(key.as_bytes())
}

fn is_sensitive_key_bytes(key: &[u8]) -> bool {
    let upper = key.to_ascii_uppercase();
    SENSITIVE_FRAGMENTS
        .iter()
        .any(|f| upper.windows(f.len()).any(|w| w == f.as_bytes()))
}

/// Redact one line (without its terminator). `None` means unchanged.
fn redact_line_bytes(line: &[u8]) -> Option<Vec<u8>> {
    let first = line.iter().position(|b| !b.is_ascii_whitespace())?;
    if line[first] == b'#' {
        return None;
    }
    let eq = line.iter().position(|&b| b == b'=')?;
    let (key, value) = (&line[..eq], &line[eq + 1..]);
    if !is_sensitive_key_bytes(key) || value == REDACTED_MARKER.as_bytes() {
        return None;
    }
    let mut out = Vec::with_capacity(eq + 1 + REDACTED_MARKER.len());
    out.extend_from_slice(key);
    out.push(b'=');
    out.extend_from_slice(REDACTED_MARKER.as_bytes());
    Some(out)
}

pub fn redact_line(line: &str) -> Cow<'_, str> {
    match redact_line_bytes(line.as_bytes()) {
        Some(out) => Cow::Owned(String::from_utf8_lossy(&out).into_owned()),
        None => Cow::Borrowed(line),
    }
}

/// Returns the redacted bytes and how many lines were rewritten.
pub fn redact_bytes(input: &[u8]) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(input.len());
    let mut count = 0usize;
    for raw in input.split_inclusive(|&b| b == b'\n') {
        let (body, ending) = split_terminator(raw);
        match redact_line_bytes(body) {
            Some(line) => {
                count += 1;
                out.extend_from_slice(&line);
            }
            None => out.extend_from_slice(body),
        }
        out.extend_from_slice(ending);
    }
    (out, count)
}

pub fn redact_text(text: &str) -> (String, usize) {
    let (out, count) = redact_bytes(text.as_bytes());
    (String::from_utf8_lossy(&out).into_owned(), count)
}

fn split_terminator(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = raw.strip_suffix(b"\r\n") {
        (body, b"\r\n")
    } else if let Some(body) = raw.strip_suffix(b"\n") {
        (body, b"\n")
    } else {
        (raw, b"")
    }
}

/// Rewrites `path` in place when anything changed.
pub fn redact_file(path: &Path) -> anyhow::Result<usize> {
    let bytes = std::fs::read(path)?;
    let (redacted, count) = redact_bytes(&bytes);
    if count > 0 {
        std::fs::write(path, redacted)?;
    }
    Ok(count)
}

/// Redacts a single file, either rewriting it or returning the redacted bytes.
pub fn redact_one(path: &Path, in_place: bool) -> anyhow::Result<RedactReport> {
    if !path.is_file() {
        return Err(OpsError::NotFound(format!("file not found: {}", path.display())).into());
    }
    let file = path.to_string_lossy().to_string();
    if in_place {
        let redacted_lines = redact_file(path)?;
        return Ok(RedactReport {
            file,
            redacted_lines,
            in_place,
            content: None,
        });
    }
    let bytes = std::fs::read(path)
        .map_err(|e| OpsError::InvalidInput(format!("{}: {}", path.display(), e)))?;
    let (redacted, redacted_lines) = redact_bytes(&bytes);
    Ok(RedactReport {
        file,
        redacted_lines,
        in_place,
        content: Some(redacted),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_keys_are_redacted() {
        assert_eq!(redact_line("DB_PASSWORD=hunter2"), "DB_PASSWORD=REDACTED");
        assert_eq!(redact_line("github_token=ghp_abc"), "github_token=REDACTED");
        assert_eq!(redact_line("AGENT_UI_API_KEY=changeme"), "AGENT_UI_API_KEY=REDACTED");
        assert_eq!(redact_line("basic_auth=a:b"), "basic_auth=REDACTED");
        assert_eq!(redact_line("ADMIN_USER=root"), "ADMIN_USER=REDACTED");
    }

    #[test]
    fn only_the_key_is_inspected() {
        assert_eq!(redact_line("OLLAMA_HOST=my-secret-box"), "OLLAMA_HOST=my-secret-box");
        assert_eq!(redact_line("MODEL=token-llama"), "MODEL=token-llama");
    }

    #[test]
    fn value_split_happens_at_first_equals() {
        assert_eq!(redact_line("SECRET=a=b=c"), "SECRET=REDACTED");
        assert_eq!(redact_line("URL=http://x?token=1"), "URL=http://x?token=1");
    }

    #[test]
    fn comments_blanks_and_plain_lines_pass_through() {
        assert_eq!(redact_line("# PASSWORD=visible"), "# PASSWORD=visible");
        assert_eq!(redact_line("   # SECRET=also"), "   # SECRET=also");
        assert_eq!(redact_line(""), "");
        assert_eq!(redact_line("   "), "   ");
        assert_eq!(redact_line("export PASSWORD"), "export PASSWORD");
    }

    #[test]
    fn text_keeps_line_endings_and_counts_rewrites() {
        let input = "A=1\r\nTOKEN=abc\r\n\n# KEY=x\nAUTH_HEADER=Bearer y";
        let (out, count) = redact_text(input);
        assert_eq!(
            out,
            "A=1\r\nTOKEN=REDACTED\r\n\n# KEY=x\nAUTH_HEADER=REDACTED"
        );
        assert_eq!(count, 2);
    }

    #[test]
    fn redaction_is_idempotent() {
        let input = "PASS=1\nAPIKEY=2\nHOST=example\n# SECRET=3\nnot a pair\n";
        let (once, first) = redact_text(input);
        let (twice, second) = redact_text(&once);
        assert_eq!(once, twice);
        assert_eq!(first, 2);
        assert_eq!(second, 0);
    }

    #[test]
    fn redact_file_rewrites_in_place() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("prod.env");
        std::fs::write(&path, "REDIS_URL=redis://cache\nREDIS_PASSWORD=pw\n").unwrap();
        assert_eq!(redact_file(&path).unwrap(), 1);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "REDIS_URL=redis://cache\nREDIS_PASSWORD=REDACTED\n"
        );
    }

    #[test]
    fn latin1_bytes_do_not_stop_redaction() {
        let (out, count) = redact_bytes(b"# caf\xe9\nDB_PASSWORD=hunter2\r\nNOTE=cr\xe8me\n");
        assert_eq!(out, b"# caf\xe9\nDB_PASSWORD=REDACTED\r\nNOTE=cr\xe8me\n".to_vec());
        assert_eq!(count, 1);
    }

    #[test]
    fn redact_file_handles_non_utf8_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("legacy.env");
        std::fs::write(&path, b"# caf\xe9\nSMTP_SECRET=\xff\xfe\n").unwrap();
        assert_eq!(redact_file(&path).unwrap(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"# caf\xe9\nSMTP_SECRET=REDACTED\n".to_vec());

        let preview = redact_one(&path, false).unwrap();
        assert_eq!(preview.redacted_lines, 0);
    }

    #[test]
    fn redact_one_leaves_file_alone_unless_in_place() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("app.env");
        std::fs::write(&file, "API_KEY=abc\nHOST=db\n").unwrap();

        let preview = redact_one(&file, false).unwrap();
        assert_eq!(preview.content.as_deref(), Some(&b"API_KEY=REDACTED\nHOST=db\n"[..]));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "API_KEY=abc\nHOST=db\n");

        let rewritten = redact_one(&file, true).unwrap();
        assert_eq!(rewritten.redacted_lines, 1);
        assert!(rewritten.content.is_none());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "API_KEY=REDACTED\nHOST=db\n");
    }

    #[test]
    fn redact_one_missing_file_is_not_found() {
        let err = redact_one(Path::new("/nonexistent/app.env"), false).unwrap_err();
        assert_eq!(crate::domain::errors::classify(&err), ("NOT_FOUND", 2));
    }
}
