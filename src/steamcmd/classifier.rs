//! Classifier for steamcmd output lines
//!
//! steamcmd exits with status 0 even when downloads fail, so its output is
//! the only reliable signal. Each line is matched, in priority order, against
//! login failure patterns, per-item failure patterns and the item success
//! pattern. Lines carrying the error marker that match nothing are reported
//! instead of silently dropped.

use super::traits::LineSource;
use crate::catalog::ModId;
use crate::config::PatternConfig;
use crate::error::{Error, Result};
use regex::Regex;
use tracing::{debug, info, warn};

/// Classification of a single output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// Login failed; the whole batch is invalid
    AuthFailure {
        /// Reason reported by steamcmd
        reason: String,
    },
    /// Download of one item failed
    ItemFailure {
        /// The failed item
        id: ModId,
    },
    /// Download of one item was reported successful
    ItemDownloaded {
        /// The downloaded item
        id: ModId,
    },
    /// Line carries the error marker but matches no known pattern
    UnrecognizedError,
    /// Anything else
    Info,
}

/// Outcome of classifying a complete batch output
///
/// Only produced when the batch completed; a login failure is returned as
/// [`Error::Authentication`] instead.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationResult {
    /// Failed ids in report order; may contain duplicates
    pub failed_ids: Vec<ModId>,
    /// Ids reported as downloaded, in report order
    pub downloaded_ids: Vec<ModId>,
    /// Error-looking lines no pattern recognized
    pub unrecognized_errors: Vec<String>,
    /// Number of lines consumed
    pub lines_seen: usize,
}

impl ClassificationResult {
    /// Whether no item failure was reported
    pub fn all_succeeded(&self) -> bool {
        self.failed_ids.is_empty()
    }
}

/// Compiled steamcmd output patterns
#[derive(Debug, Clone)]
pub struct OutputClassifier {
    auth_failure: Vec<Regex>,
    item_failure: Vec<Regex>,
    item_success: Option<Regex>,
    error_marker: String,
}

impl OutputClassifier {
    /// Compile `patterns`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a pattern does not compile or lacks its
    /// named capture group (`reason` for login failures, `id` for items).
    pub fn new(patterns: &PatternConfig) -> Result<Self> {
        let auth_failure = patterns
            .auth_failure
            .iter()
            .map(|p| compile(p, "reason", "patterns.auth_failure"))
            .collect::<Result<Vec<_>>>()?;
        let item_failure = patterns
            .item_failure
            .iter()
            .map(|p| compile(p, "id", "patterns.item_failure"))
            .collect::<Result<Vec<_>>>()?;
        let item_success = patterns
            .item_success
            .as_deref()
            .map(|p| compile(p, "id", "patterns.item_success"))
            .transpose()?;

        Ok(Self {
            auth_failure,
            item_failure,
            item_success,
            error_marker: patterns.error_marker.clone(),
        })
    }

    /// Classify one line
    pub fn classify_line(&self, line: &str) -> LineClass {
        if let Some(reason) = first_capture(&self.auth_failure, line, "reason") {
            return LineClass::AuthFailure {
                reason: reason.trim().to_string(),
            };
        }

        if let Some(id) = first_capture(&self.item_failure, line, "id") {
            return LineClass::ItemFailure { id: ModId::new(id) };
        }

        if let Some(id) = self
            .item_success
            .as_ref()
            .and_then(|re| re.captures(line))
            .and_then(|caps| caps.name("id"))
        {
            return LineClass::ItemDownloaded {
                id: ModId::new(id.as_str()),
            };
        }

        if !self.error_marker.is_empty() && line.contains(&self.error_marker) {
            return LineClass::UnrecognizedError;
        }

        LineClass::Info
    }

    /// Consume `lines` to exhaustion and collect per-item failures
    ///
    /// With `echo`, every line is forwarded to the log (target `steamcmd`)
    /// before it is classified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] as soon as a login failure line is
    /// seen; no further lines are read and failures collected so far are
    /// discarded. Read errors from `lines` are propagated.
    pub async fn classify<S>(&self, lines: &mut S, echo: bool) -> Result<ClassificationResult>
    where
        S: LineSource + ?Sized,
    {
        let mut result = ClassificationResult::default();

        while let Some(line) = lines.next_line().await? {
            result.lines_seen += 1;
            if echo {
                info!(target: "steamcmd", "{}", line);
            }

            match self.classify_line(&line) {
                LineClass::AuthFailure { reason } => {
                    warn!(reason = %reason, line = result.lines_seen, "steam login failed");
                    return Err(Error::Authentication { reason });
                }
                LineClass::ItemFailure { id } => {
                    warn!(%id, "steamcmd reported download failure");
                    result.failed_ids.push(id);
                }
                LineClass::ItemDownloaded { id } => {
                    debug!(%id, "steamcmd reported download success");
                    result.downloaded_ids.push(id);
                }
                LineClass::UnrecognizedError => {
                    warn!(line = %line, "unrecognized steamcmd error line");
                    result.unrecognized_errors.push(line);
                }
                LineClass::Info => {}
            }
        }

        debug!(
            lines = result.lines_seen,
            failed = result.failed_ids.len(),
            downloaded = result.downloaded_ids.len(),
            unrecognized = result.unrecognized_errors.len(),
            "steamcmd output classified"
        );

        Ok(result)
    }
}

fn compile(pattern: &str, group: &str, key: &str) -> Result<Regex> {
    let re = Regex::new(pattern)
        .map_err(|e| Error::config(format!("invalid pattern {pattern:?}: {e}"), key))?;

    if !re.capture_names().flatten().any(|name| name == group) {
        return Err(Error::config(
            format!("pattern {pattern:?} has no named group `{group}`"),
            key,
        ));
    }

    Ok(re)
}

/// First value of `group` among `patterns`; a match without the group falls through
fn first_capture<'a>(patterns: &[Regex], line: &'a str, group: &str) -> Option<&'a str> {
    patterns.iter().find_map(|re| {
        re.captures(line)
            .and_then(|caps| caps.name(group))
            .map(|m| m.as_str())
    })
}
