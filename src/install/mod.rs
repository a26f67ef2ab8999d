//! Local installation of staged workshop items
//!
//! Installing a mod is a full replace: the staged tree is normalized to
//! lowercase names, any previous install is removed, and the staged tree is
//! copied (or moved) into place. Running it twice gives the same result as
//! running it once.

use crate::config::InstallStrategy;
use crate::error::{Error, InstallError, Result};
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tracing::{debug, info, warn};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of installing one mod
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The mod was installed
    Installed {
        /// Number of files placed in the install directory
        files: usize,
    },
    /// Nothing was staged for this mod; no changes were made
    SourceMissing,
}

/// Copies or moves staged trees into install directories
#[derive(Debug, Clone, Copy, Default)]
pub struct Installer {
    strategy: InstallStrategy,
}

impl Installer {
    /// Create an installer using `strategy`
    pub fn new(strategy: InstallStrategy) -> Self {
        Self { strategy }
    }

    /// Strategy in use
    pub fn strategy(&self) -> InstallStrategy {
        self.strategy
    }

    /// Install `source` as `dest`, replacing any previous content of `dest`
    ///
    /// # Errors
    ///
    /// Filesystem failures (permissions, disk full, lowercase name collisions)
    /// are returned for this item only.
    pub async fn install(&self, source: &Path, dest: &Path) -> Result<InstallOutcome> {
        match fs::metadata(source).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                warn!(?source, "staged path is not a directory");
                return Ok(InstallOutcome::SourceMissing);
            }
            Err(_) => {
                debug!(?source, "staged directory does not exist");
                return Ok(InstallOutcome::SourceMissing);
            }
        }

        let renamed = normalize_case(source).await?;
        debug!(?source, renamed, "normalized staged file names");

        remove_existing(dest).await?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        let files = match self.strategy {
            InstallStrategy::Copy => copy_tree(source, dest).await?,
            InstallStrategy::Move => move_tree(source, dest).await?,
        };

        info!(?dest, files, strategy = ?self.strategy, "installed");
        Ok(InstallOutcome::Installed { files })
    }
}

/// Rename every file and directory below `root` to its lowercase form
///
/// Children are renamed before their parent. Returns the number of renamed
/// entries. Entries whose names are not valid UTF-8 are left untouched.
///
/// # Errors
///
/// Returns [`InstallError::NameCollision`] if two entries of one directory
/// share a lowercase name.
pub async fn normalize_case(root: &Path) -> Result<usize> {
    normalize_dir(root.to_path_buf()).await
}

fn normalize_dir(dir: PathBuf) -> BoxFuture<'static, Result<usize>> {
    Box::pin(async move {
        let mut entries = fs::read_dir(&dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let is_dir = entry.file_type().await?.is_dir();
            names.push((entry.file_name(), is_dir));
        }

        // names that are already lowercase keep their slot
        let mut taken: HashSet<String> = names
            .iter()
            .filter_map(|(name, _)| name.to_str())
            .filter(|name| *name == name.to_lowercase())
            .map(str::to_string)
            .collect();

        let mut renamed = 0;
        for (name, is_dir) in names {
            let path = dir.join(&name);
            if is_dir {
                renamed += normalize_dir(path.clone()).await?;
            }

            let Some(name) = name.to_str() else {
                warn!(?path, "skipping non UTF-8 file name");
                continue;
            };
            let lower = name.to_lowercase();
            if lower == name {
                continue;
            }

            let target = dir.join(&lower);
            if !taken.insert(lower) {
                return Err(InstallError::NameCollision {
                    first: target,
                    second: path,
                }
                .into());
            }

            fs::rename(&path, &target)
                .await
                .map_err(|e| InstallError::RenameFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            renamed += 1;
        }

        Ok(renamed)
    })
}

async fn remove_existing(dest: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(dest).await {
        Ok(meta) => meta,
        Err(_) => return Ok(()),
    };

    debug!(?dest, "removing previous install");
    let removed = if meta.is_dir() {
        fs::remove_dir_all(dest).await
    } else {
        fs::remove_file(dest).await
    };

    removed.map_err(|e| {
        Error::from(InstallError::RemoveFailed {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })
    })
}

/// Recursively copy `source` into a new directory `dest`, returning the file count
fn copy_tree<'a>(source: &'a Path, dest: &'a Path) -> BoxFuture<'a, Result<usize>> {
    Box::pin(async move {
        let copy_failed = |reason: String| {
            Error::from(InstallError::CopyFailed {
                source_path: source.to_path_buf(),
                dest_path: dest.to_path_buf(),
                reason,
            })
        };

        fs::create_dir_all(dest)
            .await
            .map_err(|e| copy_failed(e.to_string()))?;

        let mut entries = fs::read_dir(source).await?;
        let mut files = 0;
        while let Some(entry) = entries.next_entry().await? {
            let from = entry.path();
            let to = dest.join(entry.file_name());
            let mut file_type = entry.file_type().await?;

            // links are copied as the content they point to
            if file_type.is_symlink() {
                match fs::metadata(&from).await {
                    Ok(meta) => file_type = meta.file_type(),
                    Err(e) => {
                        warn!(path = ?from, error = %e, "skipping dangling symlink");
                        continue;
                    }
                }
            }

            if file_type.is_dir() {
                files += copy_tree(&from, &to).await?;
            } else if file_type.is_file() {
                fs::copy(&from, &to).await.map_err(|e| {
                    Error::from(InstallError::CopyFailed {
                        source_path: from.clone(),
                        dest_path: to.clone(),
                        reason: e.to_string(),
                    })
                })?;
                files += 1;
            } else {
                warn!(path = ?from, "skipping special file");
            }
        }

        Ok(files)
    })
}

/// Move `source` to `dest`, falling back to copy + remove across filesystems
async fn move_tree(source: &Path, dest: &Path) -> Result<usize> {
    match fs::rename(source, dest).await {
        Ok(()) => count_files(dest.to_path_buf()).await,
        Err(e) => {
            debug!(?source, ?dest, error = %e, "rename failed, copying instead");
            let files = copy_tree(source, dest).await?;
            fs::remove_dir_all(source).await?;
            Ok(files)
        }
    }
}

fn count_files(dir: PathBuf) -> BoxFuture<'static, Result<usize>> {
    Box::pin(async move {
        let mut entries = fs::read_dir(&dir).await?;
        let mut files = 0;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                files += count_files(entry.path()).await?;
            } else if file_type.is_file() {
                files += 1;
            }
        }
        Ok(files)
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    fn stage(root: &Path, files: &[(&str, &str)]) {
        for (rel, content) in files {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
    }

    /// Relative path -> content for every file under `root`
    fn snapshot(root: &Path) -> BTreeMap<String, String> {
        WalkDir::new(root)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(root).unwrap();
                (
                    rel.to_string_lossy().replace('\\', "/"),
                    std::fs::read_to_string(e.path()).unwrap(),
                )
            })
            .collect()
    }

    fn all_lowercase(root: &Path) -> bool {
        WalkDir::new(root).min_depth(1).into_iter().all(|e| {
            let name = e.unwrap().file_name().to_string_lossy().into_owned();
            name == name.to_lowercase()
        })
    }

    #[tokio::test]
    async fn install_normalizes_every_path_component() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("staging/463939057");
        let dest = tmp.path().join("server/mods/@ace");
        stage(
            &source,
            &[
                ("MyFile.PBO", "pbo"),
                ("SubDir/Other.bisign", "sig"),
                ("SubDir/Nested/Deep.TXT", "deep"),
            ],
        );

        let outcome = Installer::default().install(&source, &dest).await.unwrap();

        assert_eq!(outcome, InstallOutcome::Installed { files: 3 });
        assert!(all_lowercase(&dest));
        let files = snapshot(&dest);
        assert_eq!(files.get("myfile.pbo").map(String::as_str), Some("pbo"));
        assert_eq!(files.get("subdir/other.bisign").map(String::as_str), Some("sig"));
        assert_eq!(files.get("subdir/nested/deep.txt").map(String::as_str), Some("deep"));
    }

    #[tokio::test]
    async fn install_twice_equals_install_once() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("staging/1");
        let dest = tmp.path().join("mods/@cba");
        stage(&source, &[("Addons/CBA_Main.pbo", "main"), ("Keys/cba.bikey", "key")]);

        let installer = Installer::new(InstallStrategy::Copy);
        let first = installer.install(&source, &dest).await.unwrap();
        let once = snapshot(&dest);
        let second = installer.install(&source, &dest).await.unwrap();

        assert_eq!(first, second);

        assert_eq!(snapshot(&dest), once);
        assert_eq!(once.len(), 2);
    }

    #[tokio::test]
    async fn install_replaces_previous_content() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("staging/1");
        let dest = tmp.path().join("mods/@cba");
        stage(&source, &[("addons/new.pbo", "new")]);
        stage(&dest, &[("addons/old.pbo", "old"), ("stale.txt", "stale")]);

        let outcome = Installer::default().install(&source, &dest).await.unwrap();

        assert_eq!(outcome, InstallOutcome::Installed { files: 1 });
        let files = snapshot(&dest);
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["addons/new.pbo"]);
    }

    #[tokio::test]
    async fn install_missing_source_has_no_side_effects() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("mods/@ace");
        stage(&dest, &[("keep.pbo", "old")]);

        let outcome = Installer::default()
            .install(&tmp.path().join("staging/404"), &dest)
            .await
            .unwrap();

        assert_eq!(outcome, InstallOutcome::SourceMissing);
        assert_eq!(snapshot(&dest).len(), 1);
    }

    #[tokio::test]
    async fn copy_keeps_staged_files() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("staging/1");
        stage(&source, &[("A.pbo", "a")]);

        let outcome = Installer::new(InstallStrategy::Copy)
            .install(&source, &tmp.path().join("mods/@a"))
            .await
            .unwrap();

        assert_eq!(outcome, InstallOutcome::Installed { files: 1 });
        // staging is normalized in place and kept for later re-installs
        assert_eq!(snapshot(&source).keys().collect::<Vec<_>>(), vec!["a.pbo"]);
    }

    #[tokio::test]
    async fn move_consumes_staged_files() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("staging/1");
        let dest = tmp.path().join("mods/@a");
        stage(&source, &[("A.pbo", "a"), ("Sub/B.pbo", "b")]);

        let outcome = Installer::new(InstallStrategy::Move)
            .install(&source, &dest)
            .await
            .unwrap();

        assert_eq!(outcome, InstallOutcome::Installed { files: 2 });
        assert!(!source.exists());
        assert!(all_lowercase(&dest));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn copy_follows_symlinks() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("staging/1");
        let dest = tmp.path().join("mods/@a");
        stage(&source, &[("Addons/A.pbo", "a")]);
        stage(tmp.path(), &[("shared/keys/shared.bikey", "key")]);
        std::os::unix::fs::symlink(
            tmp.path().join("shared/keys/shared.bikey"),
            source.join("Shared.bikey"),
        )
        .unwrap();
        std::os::unix::fs::symlink(tmp.path().join("shared/keys"), source.join("keys")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("missing"), source.join("dangling")).unwrap();

        let outcome = Installer::new(InstallStrategy::Copy)
            .install(&source, &dest)
            .await
            .unwrap();

        assert_eq!(outcome, InstallOutcome::Installed { files: 3 });
        let linked = std::fs::symlink_metadata(dest.join("shared.bikey")).unwrap();
        assert!(linked.file_type().is_file());
        assert!(std::fs::symlink_metadata(dest.join("keys")).unwrap().is_dir());
        assert!(std::fs::symlink_metadata(dest.join("dangling")).is_err());

        let files = snapshot(&dest);
        assert_eq!(files.get("shared.bikey").map(String::as_str), Some("key"));
        assert_eq!(files.get("keys/shared.bikey").map(String::as_str), Some("key"));
        assert_eq!(files.get("addons/a.pbo").map(String::as_str), Some("a"));
    }

    #[tokio::test]
    async fn normalize_case_detects_collisions() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("staging");
        stage(&root, &[("Readme.TXT", "one")]);

        // only meaningful on case-sensitive filesystems
        if std::fs::write(root.join("README.txt"), "two").is_err()
            || std::fs::read_dir(&root).unwrap().count() < 2
        {
            return;
        }

        let err = normalize_case(&root).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::NameCollision { .. })
        ));
    }

    #[tokio::test]
    async fn normalize_case_counts_renames() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("staging");
        stage(&root, &[("already.pbo", "x"), ("Dir/File.PBO", "y")]);

        let renamed = normalize_case(&root).await.unwrap();

        assert_eq!(renamed, 2);
        assert!(root.join("dir/file.pbo").is_file());
        assert!(root.join("already.pbo").is_file());
    }
}
