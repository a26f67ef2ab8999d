//! Common test utilities: fake steamcmd scripts
//!
//! The scripts are plain `/bin/sh` programs that print canned steamcmd output
//! and optionally stage files the way steamcmd would.

use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use workshop_dl::{Error, Result};

/// Write an executable shell script named `steamcmd` into `dir`
pub fn write_fake_steamcmd(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("steamcmd");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Shell snippet staging `<workshop>/<id>/Addons/<file>` the way steamcmd does
#[allow(dead_code)]
pub fn stage_snippet(workshop: &Path, id: &str, file: &str) -> String {
    let dir = workshop.join(id).join("Addons");
    format!(
        "mkdir -p '{dir}' && printf '{id}' > '{dir}/{file}'",
        dir = dir.display()
    )
}

/// Run `op`, retrying while the freshly written script is still busy
///
/// Another test thread forking while the script's write handle is open makes
/// exec fail with ETXTBSY for a short moment.
pub async fn retry_text_busy<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0;
    loop {
        match op().await {
            Err(Error::ExternalTool(msg)) if msg.contains("Text file busy") && attempts < 20 => {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            other => return other,
        }
    }
}
