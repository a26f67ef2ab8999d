//! Download-and-install pipeline
//!
//! One pass: build a single steamcmd batch for the mod list, classify its
//! output, install the mods that were fetched and write a retry manifest for
//! everything that was not.

use crate::catalog::ModList;
use crate::config::Config;
use crate::error::Result;
use crate::manifest::{clear_manifest, write_manifest};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::steamcmd::{
    ClassificationResult, Credentials, FetchBatch, LineSource, OutputClassifier, SteamCmd,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Result of one install pass
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSummary {
    /// Number of mods requested
    pub requested: usize,
    /// Per-mod outcome
    pub report: ReconcileReport,
    /// Retry manifest written for the failures, if any failed
    pub manifest: Option<PathBuf>,
}

impl InstallSummary {
    /// Whether every requested mod was installed
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }
}

/// Downloads and installs workshop mods with steamcmd
///
/// # Examples
///
/// ```no_run
/// use workshop_dl::{Config, ModDownloader};
/// use workshop_dl::modpack::load_modpack;
/// use workshop_dl::steamcmd::Credentials;
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let downloader = ModDownloader::new(Config::default())?;
/// let mods = load_modpack(Path::new("preset.html")).await?;
///
/// let summary = downloader.install(&mods, Credentials::from_env()?).await?;
/// println!("{} of {} installed", summary.report.installed.len(), summary.requested);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ModDownloader {
    config: Config,
    steamcmd: SteamCmd,
    classifier: OutputClassifier,
    reconciler: Reconciler,
}

impl ModDownloader {
    /// Create a downloader, locating steamcmd as configured
    pub fn new(config: Config) -> Result<Self> {
        let steamcmd = SteamCmd::from_config(&config.steamcmd)?;
        Self::with_steamcmd(config, steamcmd)
    }

    /// Create a downloader around an explicit steamcmd launcher
    pub fn with_steamcmd(config: Config, steamcmd: SteamCmd) -> Result<Self> {
        let classifier = OutputClassifier::new(&config.patterns)?;
        let reconciler = Reconciler::from_config(&config);
        Ok(Self {
            config,
            steamcmd,
            classifier,
            reconciler,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Download `mods` in one steamcmd batch and install the ones that arrived
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`](crate::Error::Authentication) when
    /// the login fails; nothing is installed in that case and steamcmd is
    /// killed. Per-mod failures are reported in the summary, not as errors.
    pub async fn install(&self, mods: &ModList, credentials: Credentials) -> Result<InstallSummary> {
        if mods.is_empty() {
            info!("no mods requested");
            return Ok(InstallSummary {
                requested: 0,
                report: ReconcileReport::default(),
                manifest: None,
            });
        }

        let batch = FetchBatch::new(credentials, self.config.steamcmd.app_id, mods);
        info!(
            count = mods.len(),
            workshop = ?self.reconciler.workshop_dir(),
            "downloading mods in one steamcmd batch"
        );

        let mut process = self.steamcmd.launch(&batch)?;
        let result = self
            .classifier
            .classify(&mut process, self.config.steamcmd.echo_output)
            .await?;
        if let Err(e) = process.finish().await {
            warn!(error = %e, "could not collect steamcmd exit status");
        }

        self.apply(mods, &result).await
    }

    /// Reconcile `mods` against already captured steamcmd output
    ///
    /// Same as [`install`](Self::install) minus launching the process.
    pub async fn replay<S>(&self, mods: &ModList, lines: &mut S) -> Result<InstallSummary>
    where
        S: LineSource + ?Sized,
    {
        let result = self
            .classifier
            .classify(lines, self.config.steamcmd.echo_output)
            .await?;
        self.apply(mods, &result).await
    }

    async fn apply(&self, mods: &ModList, result: &ClassificationResult) -> Result<InstallSummary> {
        if !result.unrecognized_errors.is_empty() {
            warn!(
                count = result.unrecognized_errors.len(),
                "steamcmd printed error lines no pattern recognized; check patterns in the config"
            );
        }

        let report = self.reconciler.reconcile(mods, result).await;
        let manifest_path = &self.config.paths.manifest_path;

        let manifest = if report.is_success() {
            clear_manifest(manifest_path).await?;
            info!(installed = report.installed.len(), "all mods installed");
            None
        } else {
            write_manifest(manifest_path, &report.failed_mods(mods)).await?;
            warn!(
                failed = report.failed_count(),
                fetch_failed = report.fetch_failed.len(),
                install_failed = report.install_failed.len(),
                total = mods.len(),
                manifest = ?manifest_path,
                "{} out of {} mods failed, retry list written",
                report.failed_count(),
                mods.len()
            );
            Some(manifest_path.clone())
        };

        Ok(InstallSummary {
            requested: mods.len(),
            report,
            manifest,
        })
    }
}
