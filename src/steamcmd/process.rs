//! Supervised steamcmd child process

use super::batch::FetchBatch;
use super::traits::LineSource;
use crate::config::SteamCmdConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_stream::wrappers::SplitStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

type LineStream = Pin<Box<dyn Stream<Item = std::io::Result<String>> + Send>>;

/// Launcher for the external steamcmd binary
///
/// # Examples
///
/// ```no_run
/// use workshop_dl::catalog::{Mod, ModList};
/// use workshop_dl::steamcmd::{Credentials, FetchBatch, LineSource, SteamCmd};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let steamcmd = SteamCmd::from_path().expect("steamcmd not found in PATH");
/// let mods = ModList::new(vec![Mod::new("cba_a3", "450814997")])?;
/// let batch = FetchBatch::new(Credentials::from_env()?, 107410, &mods);
///
/// let mut process = steamcmd.launch(&batch)?;
/// while let Some(line) = process.next_line().await? {
///     println!("{line}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SteamCmd {
    binary_path: PathBuf,
    read_timeout: Option<Duration>,
}

impl SteamCmd {
    /// Create a launcher with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            read_timeout: None,
        }
    }

    /// Attempt to find steamcmd in PATH
    pub fn from_path() -> Option<Self> {
        which::which("steamcmd").ok().map(Self::new)
    }

    /// Resolve the binary from config: explicit path first, then PATH if allowed
    pub fn from_config(config: &SteamCmdConfig) -> Result<Self> {
        let launcher = match &config.binary {
            Some(path) => Self::new(path.clone()),
            None if config.search_path => Self::from_path().ok_or_else(|| {
                Error::NotSupported("steamcmd binary not found in PATH".to_string())
            })?,
            None => {
                return Err(Error::config(
                    "no steamcmd binary configured and PATH search is disabled",
                    "steamcmd.binary",
                ));
            }
        };
        Ok(launcher.with_read_timeout(config.read_timeout))
    }

    /// Abort reads that wait longer than `timeout` for a line
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Path of the binary this launcher runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Spawn steamcmd for `batch`
    ///
    /// Standard output and standard error are merged into one line stream.
    pub fn launch(&self, batch: &FetchBatch) -> Result<SteamCmdProcess> {
        debug!(
            binary = ?self.binary_path,
            args = ?batch.redacted_args(),
            "launching steamcmd"
        );

        let mut child = Command::new(&self.binary_path)
            .args(batch.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ExternalTool(format!("Failed to execute steamcmd: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ExternalTool("steamcmd stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::ExternalTool("steamcmd stderr was not captured".to_string()))?;

        let stdout = SplitStream::new(BufReader::new(stdout).split(b'\n'));
        let stderr = SplitStream::new(BufReader::new(stderr).split(b'\n'));
        let lines = stdout
            .merge(stderr)
            .map(|chunk| chunk.map(|bytes| decode_line(&bytes)));

        Ok(SteamCmdProcess {
            child,
            lines: Box::pin(lines),
            read_timeout: self.read_timeout,
            lines_read: 0,
        })
    }
}

/// A running steamcmd batch
///
/// Owns the child process. Dropping it kills the child if it is still
/// running, so abandoning the line stream early never leaves steamcmd behind.
pub struct SteamCmdProcess {
    child: Child,
    lines: LineStream,
    read_timeout: Option<Duration>,
    lines_read: usize,
}

impl SteamCmdProcess {
    /// OS process id, if the child has not been reaped yet
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Number of lines read so far
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Wait for the child to exit after its output is exhausted
    ///
    /// steamcmd exits with status 0 even when downloads failed, so the status
    /// is only logged, never used to judge the batch.
    pub async fn finish(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait().await?;
        debug!(
            ?status,
            lines = self.lines_read,
            "steamcmd exited"
        );
        Ok(status)
    }
}

#[async_trait]
impl LineSource for SteamCmdProcess {
    async fn next_line(&mut self) -> Result<Option<String>> {
        let next = match self.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.lines.next())
                .await
                .map_err(|_| Error::ProcessTimeout { timeout })?,
            None => self.lines.next().await,
        };

        match next {
            Some(Ok(line)) => {
                self.lines_read += 1;
                Ok(Some(line))
            }
            Some(Err(e)) => Err(Error::ExternalTool(format!(
                "failed to read steamcmd output: {}",
                e
            ))),
            None => Ok(None),
        }
    }
}

impl Drop for SteamCmdProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            warn!(
                pid = ?self.child.id(),
                lines = self.lines_read,
                "steamcmd still running, killing it"
            );
            if let Err(e) = self.child.start_kill() {
                warn!(error = %e, "failed to kill steamcmd");
            }
        }
    }
}

impl std::fmt::Debug for SteamCmdProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteamCmdProcess")
            .field("pid", &self.child.id())
            .field("read_timeout", &self.read_timeout)
            .field("lines_read", &self.lines_read)
            .finish_non_exhaustive()
    }
}

/// Decode one raw output line, tolerating invalid UTF-8 and CRLF endings
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
