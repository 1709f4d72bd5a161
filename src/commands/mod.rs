//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `maintenance.rs` — ports/perms/export command trees.
//! - `diagnostics.rs` — diag collect/extract and remote exec.
//! - `stack.rs` — bootstrap/restart/health.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - Keep behavior and output schema stable.
//! - Each handler returns `Ok(false)` when the command is not its own.

pub mod diagnostics;
pub mod maintenance;
pub mod stack;

pub use diagnostics::{handle_diag_commands, handle_remote_commands};
pub use maintenance::{handle_export_commands, handle_perms_commands, handle_ports_commands};
pub use stack::handle_stack_commands;
