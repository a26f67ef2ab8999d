//! Retry manifest of failed mods
//!
//! A pretty-printed JSON array of `{"name", "id"}` records in catalog order.
//! Written after a run with failures, read back by `retry`.

use crate::catalog::ModList;
use crate::error::{Error, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Write `mods` to `path`, replacing any previous manifest
pub async fn write_manifest(path: &Path, mods: &ModList) -> Result<()> {
    let json = serde_json::to_string_pretty(mods)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, json + "\n").await?;
    debug!(?path, count = mods.len(), "wrote retry manifest");
    Ok(())
}

/// Read a manifest written by [`write_manifest`]
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the file does not exist and
/// [`Error::CatalogParse`] if it is not a valid, id-unique mod list.
pub async fn read_manifest(path: &Path) -> Result<ModList> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!("manifest {}", path.display())));
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&content)
        .map_err(|e| Error::CatalogParse(format!("{}: {}", path.display(), e)))
}

/// Remove a stale manifest, returning whether one existed
pub async fn clear_manifest(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(?path, "removed stale retry manifest");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
