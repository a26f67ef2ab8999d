//! Server parameter files
//!
//! Appends a `-mod=` (or `-servermod=`) line listing the installed mod folders
//! to `<server>/configs/<name>.txt`, which the server reads with `-par=`.

use crate::catalog::ModList;
use crate::error::Result;
use crate::server::config_path;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Render the parameter line for `mods`, starting with a newline
///
/// ```
/// use workshop_dl::catalog::{Mod, ModList};
/// use workshop_dl::params::render_params;
///
/// let mods = ModList::new(vec![Mod::new("cba_a3", "450814997"), Mod::new("ace", "463939057")])?;
/// assert_eq!(render_params(&mods, false), "\n-mod=mods/@cba_a3;mods/@ace;");
/// # Ok::<(), workshop_dl::Error>(())
/// ```
pub fn render_params(mods: &ModList, server_mod: bool) -> String {
    let flag = if server_mod { "-servermod=" } else { "-mod=" };
    let folders: String = mods.names().map(|name| format!("mods/@{name};")).collect();
    format!("\n{flag}{folders}")
}

/// Append the parameter line for `mods` to config `name` in `configs_dir`
///
/// Creates the directory and file if needed. Returns the file path.
pub async fn append_params(
    configs_dir: &Path,
    name: &str,
    mods: &ModList,
    server_mod: bool,
) -> Result<PathBuf> {
    let path = config_path(configs_dir, name)?;
    tokio::fs::create_dir_all(configs_dir).await?;

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    file.write_all(render_params(mods, server_mod).as_bytes())
        .await?;
    file.flush().await?;

    info!(?path, mods = mods.len(), server_mod, "appended server parameters");
    Ok(path)
}
