//! Shared data model layer (structs/constants only).
//!
//! ## Purpose
//! - Keep DTO/report structs in one place.
//! - Avoid cyclic imports and duplicated type definitions.
//! - Make JSON output schema changes explicit and reviewable.
//!
//! ## Files
//! - `models.rs` — report/output structs and the remote wire envelopes.
//! - `config.rs` — `config.toml` shape and defaults.
//! - `errors.rs` — classified failures with stable codes and exit codes.
//! - `constants.rs` — redaction fragments, file-name contract, defaults.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem/network side effects.
//!
//! ## Compatibility note
//! Changes in these structs can affect `--json` outputs and integration contracts.
//! Keep schema-impacting changes explicit and synchronized with `docs/contracts/*`.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
