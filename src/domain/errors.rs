/// Failures with a stable code for `--json` output and a process exit code.
///
/// Anything that is not an `OpsError` is reported as `INTERNAL` with exit 1.
#[derive(thiserror::Error, Debug)]
pub enum OpsError {
    #[error("{0}")]
    Precondition(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("patch failed: {0}")]
    PatchFailed(String),
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("service not allowed: {0}")]
    NotAllowed(String),
}

impl OpsError {
    pub fn code(&self) -> &'static str {
        match self {
            OpsError::Precondition(_) => "PRECONDITION",
            OpsError::NotFound(_) => "NOT_FOUND",
            OpsError::InvalidInput(_) => "INVALID_INPUT",
            OpsError::PatchFailed(_) => "PATCH_FAILED",
            OpsError::ChecksumMismatch { .. } => "CHECKSUM_MISMATCH",
            OpsError::NotAllowed(_) => "NOT_ALLOWED",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            OpsError::Precondition(_)
            | OpsError::NotFound(_)
            | OpsError::InvalidInput(_)
            | OpsError::NotAllowed(_) => 2,
            OpsError::PatchFailed(_) | OpsError::ChecksumMismatch { .. } => 1,
        }
    }
}

pub fn classify(err: &anyhow::Error) -> (&'static str, i32) {
    match err.downcast_ref::<OpsError>() {
        Some(e) => (e.code(), e.exit_code()),
        None => ("INTERNAL", 1),
    }
}
