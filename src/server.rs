//! Dedicated server helpers: parameter config lookup and launch

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::info;

/// Path of config `name` inside `configs_dir`
///
/// # Errors
///
/// Returns [`Error::InvalidConfigName`] for empty names and names containing
/// path separators or `..`.
pub fn config_path(configs_dir: &Path, name: &str) -> Result<PathBuf> {
    let name = name.strip_suffix(".txt").unwrap_or(name);
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(Error::InvalidConfigName(name.to_string()));
    }
    Ok(configs_dir.join(format!("{name}.txt")))
}

/// Names of the available configs (`*.txt` stems), sorted
///
/// A missing directory has no configs.
pub async fn list_configs(configs_dir: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(configs_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "txt")
            && entry.file_type().await?.is_file()
            && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
        {
            names.push(stem.to_string());
        }
    }

    names.sort();
    Ok(names)
}

/// Run the dedicated server with config `name` and wait for it to exit
///
/// The server inherits stdio and is started from `server_dir`.
pub async fn start(
    server_dir: &Path,
    binary: &str,
    configs_dir: &Path,
    name: &str,
) -> Result<ExitStatus> {
    let config = config_path(configs_dir, name)?;
    if !tokio::fs::try_exists(&config).await? {
        return Err(Error::NotFound(format!(
            "config {name}, run `workshop-dl configs` to list available configs"
        )));
    }

    let binary = server_dir.join(binary);
    info!(?binary, ?config, "starting server");

    let status = Command::new(&binary)
        .arg(format!("-par={}", config.display()))
        .current_dir(server_dir)
        .status()
        .await
        .map_err(|e| Error::ExternalTool(format!("Failed to execute {}: {}", binary.display(), e)))?;

    info!(?status, "server exited");
    Ok(status)
}
