//! # workshop-dl
//!
//! Steam Workshop mod downloader and installer for Arma 3 dedicated servers.
//!
//! A run downloads a whole mod list with one steamcmd invocation, reads its
//! output as it is produced, and installs every mod steamcmd did not report
//! as failed into the server's `mods/` directory under a lowercased tree
//! (the Linux server only loads lowercase file names). Mods that failed are
//! written to a JSON retry manifest.
//!
//! ## Quick Start
//!
//! ```no_run
//! use workshop_dl::{Config, ModDownloader};
//! use workshop_dl::modpack::load_modpack;
//! use workshop_dl::steamcmd::Credentials;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_default(None)?;
//!     let downloader = ModDownloader::new(config)?;
//!
//!     let mods = load_modpack(Path::new("Arma 3 Preset Coop.html")).await?;
//!     let summary = downloader.install(&mods, Credentials::from_env()?).await?;
//!
//!     for failed in summary.report.fetch_failed.iter() {
//!         println!("failed: {failed}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Replaying captured output
//!
//! The classifier reads from any [`steamcmd::LineSource`], so a captured
//! steamcmd log can be reconciled without launching steamcmd again:
//!
//! ```no_run
//! use workshop_dl::{Config, ModDownloader, ModList};
//! use workshop_dl::steamcmd::StaticLines;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> workshop_dl::Result<()> {
//! let downloader = ModDownloader::new(Config::default())?;
//! let log = std::fs::read_to_string("steamcmd.log")?;
//! let mut lines = StaticLines::from_text(&log);
//!
//! let summary = downloader.replay(&ModList::empty(), &mut lines).await?;
//! # let _ = summary;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Mod identifiers and ordered mod lists
pub mod catalog;
/// Configuration types
pub mod config;
/// Download-and-install pipeline
pub mod downloader;
/// Error types
pub mod error;
/// Local install of staged mods
pub mod install;
/// Retry manifest
pub mod manifest;
/// Launcher preset parsing
pub mod modpack;
/// Server parameter files
pub mod params;
/// Reconciliation of requested and fetched mods
pub mod reconcile;
/// Dedicated server configs and launch
pub mod server;
/// SteamCMD process and output classification
pub mod steamcmd;

// Re-export commonly used types
pub use catalog::{Mod, ModId, ModList};
pub use config::{Config, InstallStrategy};
pub use downloader::{InstallSummary, ModDownloader};
pub use error::{Error, InstallError, Result};
pub use install::{InstallOutcome, Installer};
pub use reconcile::{InstallFailure, InstallFailureKind, ReconcileReport, Reconciler};
pub use steamcmd::{ClassificationResult, Credentials, LineSource, OutputClassifier};
