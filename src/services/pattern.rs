use crate::domain::errors::OpsError;
use regex::Regex;

/// Shell-style file name glob (`*`, `?`, `[abc]`, `[!abc]`), matched against
/// a single path component.
#[derive(Debug, Clone)]
pub struct NameGlob {
    raw: String,
    re: Regex,
}

impl NameGlob {
    pub fn new(pattern: &str) -> anyhow::Result<Self> {
        let mut out = String::from("^");
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => out.push_str("[^/]*"),
                '?' => out.push_str("[^/]"),
                '[' => {
                    let mut class = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == ']' && !class.is_empty() {
                            closed = true;
                            break;
                        }
                        class.push(n);
                    }
                    if !closed {
                        return Err(OpsError::InvalidInput(format!(
                            "unterminated character class in pattern: {}",
                            pattern
                        ))
                        .into());
                    }
                    let (negate, body) = match class.strip_prefix('!') {
                        Some(rest) => (true, rest.to_string()),
                        None => (false, class),
                    };
                    out.push('[');
                    if negate {
                        out.push('^');
                    }
                    out.push_str(&body.replace('\\', "\\\\").replace('[', "\\["));
                    out.push(']');
                }
                other => out.push_str(&regex::escape(&other.to_string())),
            }
        }
        out.push('$');
        let re = Regex::new(&out)
            .map_err(|e| OpsError::InvalidInput(format!("bad pattern {}: {}", pattern, e)))?;
        Ok(Self {
            raw: pattern.to_string(),
            re,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.re.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

pub fn compile_all(patterns: &[String]) -> anyhow::Result<Vec<NameGlob>> {
    patterns.iter().map(|p| NameGlob::new(p)).collect()
}
