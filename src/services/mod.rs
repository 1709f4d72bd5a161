//! Service layer containing business logic and side-effect helpers.
//!
//! ## Service map
//! - `process.rs` — `CommandRunner` seam over external tools (compose, docker, ssh, git).
//! - `redact.rs` — line-local secret redaction.
//! - `pattern.rs` — shell-style file name globs.
//! - `export.rs` — sanitized copy + git snapshot + optional publish.
//! - `perms.rs` — executable-bit normalizer.
//! - `diagnostics.rs` — best-effort capture into a checksummed archive.
//! - `extract.rs` — archive selection, verification and summaries.
//! - `compose.rs` — port mapping patch inside one service block.
//! - `remote.rs` — one-shot ssh adapter.
//! - `stack.rs` — bootstrap templates, restart, health probes.
//! - `templates.rs` — stub files written by bootstrap.
//! - `storage.rs` — config file resolution + audit log.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Prefer pure helpers where possible.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod compose;
pub mod diagnostics;
pub mod export;
pub mod extract;
pub mod output;
pub mod pattern;
pub mod perms;
pub mod process;
pub mod redact;
pub mod remote;
pub mod stack;
pub mod storage;
pub mod templates;
