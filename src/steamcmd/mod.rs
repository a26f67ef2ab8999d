//! SteamCMD integration
//!
//! This module launches steamcmd with a single login + download batch, exposes
//! its merged output as a [`LineSource`] and classifies that output into
//! login failures and per-item failures. The classifier only sees lines, so it
//! works the same on a live process and on canned output.

mod batch;
mod classifier;
mod process;
mod traits;

// Re-exports
pub use batch::{Credentials, FetchBatch, GUARD_CODE_VAR, PASSWORD_VAR, USERNAME_VAR};
pub use classifier::{ClassificationResult, LineClass, OutputClassifier};
pub use process::{SteamCmd, SteamCmdProcess};
pub use traits::{LineSource, StaticLines};
