//! Reconciliation of requested mods against classified steamcmd output
//!
//! Splits the requested list into fetched and failed mods, installs the
//! fetched ones in catalog order and keeps "steamcmd reported a failure"
//! apart from "steamcmd reported success but the files are not there".

use crate::catalog::{Mod, ModId, ModList};
use crate::config::Config;
use crate::install::{InstallOutcome, Installer};
use crate::steamcmd::ClassificationResult;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Requested mods split by fetch outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Mods steamcmd did not report as failed
    pub succeeded: ModList,
    /// Mods steamcmd reported as failed, one entry per mod
    pub failed: ModList,
}

/// Split `requested` by the failures in `result`
///
/// Every requested mod ends up in exactly one half. Failure reports for ids
/// that were never requested are logged and ignored.
pub fn partition(requested: &ModList, result: &ClassificationResult) -> Partition {
    for id in &result.failed_ids {
        if requested.find(id).is_none() {
            warn!(%id, "steamcmd reported a failure for an id that was not requested");
        }
    }

    let failed = requested.retain_ids(&result.failed_ids);
    let succeeded = requested.difference(&failed);
    Partition { succeeded, failed }
}

/// Why an item that steamcmd fetched could not be installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallFailureKind {
    /// steamcmd reported success but nothing was staged
    SourceMissing,
    /// A filesystem operation failed
    Filesystem(String),
}

impl std::fmt::Display for InstallFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceMissing => f.write_str("staged files missing"),
            Self::Filesystem(reason) => f.write_str(reason),
        }
    }
}

/// A fetched mod that failed to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFailure {
    /// The mod
    pub item: Mod,
    /// What went wrong
    pub kind: InstallFailureKind,
}

/// Outcome of one reconciliation pass
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Mods fetched and installed
    pub installed: ModList,
    /// Mods steamcmd failed to fetch
    pub fetch_failed: ModList,
    /// Mods fetched but not installed
    pub install_failed: Vec<InstallFailure>,
}

impl ReconcileReport {
    /// Whether every requested mod was installed
    pub fn is_success(&self) -> bool {
        self.fetch_failed.is_empty() && self.install_failed.is_empty()
    }

    /// Number of mods that failed either way
    pub fn failed_count(&self) -> usize {
        self.fetch_failed.len() + self.install_failed.len()
    }

    /// All failed mods (fetch and install) in the order of `requested`
    pub fn failed_mods(&self, requested: &ModList) -> ModList {
        let ids: Vec<&ModId> = self
            .fetch_failed
            .ids()
            .chain(self.install_failed.iter().map(|f| f.item.id()))
            .collect();
        requested.retain_ids(ids)
    }
}

/// Installs fetched mods from the staging directory into the server
#[derive(Debug, Clone)]
pub struct Reconciler {
    installer: Installer,
    workshop_dir: PathBuf,
    mods_dir: PathBuf,
}

impl Reconciler {
    /// Create a reconciler staging from `workshop_dir` and installing into `mods_dir`
    pub fn new(installer: Installer, workshop_dir: PathBuf, mods_dir: PathBuf) -> Self {
        Self {
            installer,
            workshop_dir,
            mods_dir,
        }
    }

    /// Create a reconciler for the layout in `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Installer::new(config.install.strategy),
            config.workshop_dir(),
            config.paths.mods_dir(),
        )
    }

    /// Where steamcmd stages `item`
    pub fn staging_path(&self, item: &Mod) -> PathBuf {
        self.workshop_dir.join(item.id().as_str())
    }

    /// Where `item` is installed
    pub fn install_path(&self, item: &Mod) -> PathBuf {
        self.mods_dir.join(format!("@{}", item.name()))
    }

    /// Staging root
    pub fn workshop_dir(&self) -> &Path {
        &self.workshop_dir
    }

    /// Partition `requested` by `result` and install the fetched mods
    ///
    /// Install failures are recorded per mod and never stop the remaining
    /// installs.
    pub async fn reconcile(
        &self,
        requested: &ModList,
        result: &ClassificationResult,
    ) -> ReconcileReport {
        let Partition { succeeded, failed } = partition(requested, result);

        for item in &failed {
            warn!(name = item.name(), id = %item.id(), "download failed");
        }

        let total = succeeded.len();
        let mut installed_ids = Vec::with_capacity(total);
        let mut install_failed = Vec::new();

        for (index, item) in succeeded.iter().enumerate() {
            info!(
                item = index + 1,
                total,
                name = item.name(),
                id = %item.id(),
                "installing"
            );

            let source = self.staging_path(item);
            let dest = self.install_path(item);
            match self.installer.install(&source, &dest).await {
                Ok(InstallOutcome::Installed { .. }) => installed_ids.push(item.id().clone()),
                Ok(InstallOutcome::SourceMissing) => {
                    warn!(
                        name = item.name(),
                        ?source,
                        "steamcmd reported success but nothing was staged"
                    );
                    install_failed.push(InstallFailure {
                        item: item.clone(),
                        kind: InstallFailureKind::SourceMissing,
                    });
                }
                Err(e) => {
                    warn!(name = item.name(), error = %e, "install failed");
                    install_failed.push(InstallFailure {
                        item: item.clone(),
                        kind: InstallFailureKind::Filesystem(e.to_string()),
                    });
                }
            }
        }

        ReconcileReport {
            installed: succeeded.retain_ids(&installed_ids),
            fetch_failed: failed,
            install_failed,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstallStrategy;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn requested() -> ModList {
        ModList::new(vec![
            Mod::new("ace", "463939057"),
            Mod::new("cba_a3", "711159033"),
            Mod::new("tfar", "894678801"),
        ])
        .unwrap()
    }

    fn result_with(failed: &[&str]) -> ClassificationResult {
        ClassificationResult {
            failed_ids: failed.iter().map(|id| ModId::from(*id)).collect(),
            ..Default::default()
        }
    }

    fn ids(list: &ModList) -> Vec<&str> {
        list.ids().map(ModId::as_str).collect()
    }

    fn stage(workshop: &Path, id: &str) {
        let dir = workshop.join(id).join("Addons");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Main.PBO"), id).unwrap();
    }

    #[test]
    fn partition_dedups_reported_failures() {
        let requested = ModList::new(vec![
            Mod::new("a", "111"),
            Mod::new("b", "222"),
            Mod::new("c", "333"),
        ])
        .unwrap();

        let p = partition(&requested, &result_with(&["111", "222", "111"]));

        assert_eq!(ids(&p.failed), vec!["111", "222"]);
        assert_eq!(ids(&p.succeeded), vec!["333"]);
    }

    #[test]
    fn partition_is_total_and_disjoint() {
        let requested = requested();
        let cases: [&[&str]; 5] = [
            &[],
            &["463939057"],
            &["894678801", "463939057", "894678801"],
            &["463939057", "711159033", "894678801"],
            &["unknown", "711159033"],
        ];

        for failed in cases {
            let p = partition(&requested, &result_with(failed));
            let succeeded: HashSet<&str> = ids(&p.succeeded).into_iter().collect();
            let failed: HashSet<&str> = ids(&p.failed).into_iter().collect();
            let all: HashSet<&str> = ids(&requested).into_iter().collect();

            assert!(succeeded.is_disjoint(&failed));
            assert_eq!(&succeeded | &failed, all);
        }
    }

    #[test]
    fn partition_keeps_catalog_order_not_report_order() {
        let p = partition(&requested(), &result_with(&["894678801", "463939057"]));
        assert_eq!(ids(&p.failed), vec!["463939057", "894678801"]);
    }

    #[test]
    fn paths_follow_staging_and_install_layout() {
        let reconciler = Reconciler::new(
            Installer::default(),
            PathBuf::from("/steam/workshop/content/107410"),
            PathBuf::from("/arma/mods"),
        );
        let item = Mod::new("CBA A3", "450814997");

        assert_eq!(
            reconciler.staging_path(&item),
            PathBuf::from("/steam/workshop/content/107410/450814997")
        );
        assert_eq!(reconciler.install_path(&item), PathBuf::from("/arma/mods/@cba_a3"));
    }

    #[tokio::test]
    async fn reconcile_installs_only_fetched_mods() {
        let tmp = TempDir::new().unwrap();
        let workshop = tmp.path().join("workshop");
        let mods = tmp.path().join("mods");
        // ace failed, so steamcmd left nothing usable for it
        stage(&workshop, "711159033");
        stage(&workshop, "894678801");

        let reconciler = Reconciler::new(Installer::default(), workshop, mods.clone());
        let report = reconciler
            .reconcile(&requested(), &result_with(&["463939057"]))
            .await;

        assert_eq!(ids(&report.installed), vec!["711159033", "894678801"]);
        assert_eq!(ids(&report.fetch_failed), vec!["463939057"]);
        assert!(report.install_failed.is_empty());
        assert!(!mods.join("@ace").exists());
        assert!(mods.join("@cba_a3/addons/main.pbo").is_file());
        assert!(mods.join("@tfar/addons/main.pbo").is_file());
    }

    #[tokio::test]
    async fn reconcile_reports_missing_staging_separately() {
        let tmp = TempDir::new().unwrap();
        let workshop = tmp.path().join("workshop");
        stage(&workshop, "463939057");
        stage(&workshop, "894678801");

        let reconciler = Reconciler::new(
            Installer::new(InstallStrategy::Copy),
            workshop,
            tmp.path().join("mods"),
        );
        let report = reconciler.reconcile(&requested(), &result_with(&[])).await;

        assert_eq!(ids(&report.installed), vec!["463939057", "894678801"]);
        assert!(report.fetch_failed.is_empty());
        assert_eq!(report.install_failed.len(), 1);
        assert_eq!(report.install_failed[0].item.name(), "cba_a3");
        assert_eq!(report.install_failed[0].kind, InstallFailureKind::SourceMissing);
        assert!(!report.is_success());
        assert_eq!(report.failed_count(), 1);
    }

    #[tokio::test]
    async fn filesystem_error_on_one_mod_does_not_stop_the_rest() {
        let tmp = TempDir::new().unwrap();
        let workshop = tmp.path().join("workshop");
        let mods = tmp.path().join("mods");
        stage(&workshop, "711159033");
        stage(&workshop, "894678801");
        let ace = workshop.join("463939057");
        std::fs::create_dir_all(&ace).unwrap();
        std::fs::write(ace.join("Foo.txt"), "one").unwrap();

        // a lowercase collision needs a case-sensitive filesystem
        if std::fs::write(ace.join("FOO.txt"), "two").is_err()
            || std::fs::read_dir(&ace).unwrap().count() < 2
        {
            return;
        }

        let reconciler = Reconciler::new(Installer::default(), workshop, mods.clone());
        let report = reconciler.reconcile(&requested(), &result_with(&[])).await;

        assert_eq!(report.install_failed.len(), 1);
        assert_eq!(report.install_failed[0].item.name(), "ace");
        assert!(matches!(
            report.install_failed[0].kind,
            InstallFailureKind::Filesystem(ref reason) if reason.contains("collide")
        ));
        assert_eq!(ids(&report.installed), vec!["711159033", "894678801"]);
        assert!(mods.join("@cba_a3/addons/main.pbo").is_file());
        assert!(mods.join("@tfar/addons/main.pbo").is_file());
        assert!(!mods.join("@ace").exists());
        assert_eq!(ids(&report.failed_mods(&requested())), vec!["463939057"]);
    }

    #[tokio::test]
    async fn failed_mods_merges_both_kinds_in_catalog_order() {
        let tmp = TempDir::new().unwrap();
        let workshop = tmp.path().join("workshop");
        stage(&workshop, "711159033");

        let reconciler = Reconciler::new(Installer::default(), workshop, tmp.path().join("mods"));
        let requested = requested();
        let report = reconciler
            .reconcile(&requested, &result_with(&["894678801"]))
            .await;

        // ace: install failed (not staged), tfar: fetch failed
        assert_eq!(ids(&report.failed_mods(&requested)), vec!["463939057", "894678801"]);
    }
}
