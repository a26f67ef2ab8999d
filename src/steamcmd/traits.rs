//! Line source abstraction over external tool output

use async_trait::async_trait;
use std::collections::VecDeque;

/// A forward-only, single-pass sequence of output lines
///
/// Implemented by [`SteamCmdProcess`](super::SteamCmdProcess) for a live
/// child process and by [`StaticLines`] for canned output, so the classifier
/// never needs to know where lines come from.
#[async_trait]
pub trait LineSource: Send {
    /// Wait for the next line
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying stream cannot be read or a read
    /// timeout elapses.
    async fn next_line(&mut self) -> crate::Result<Option<String>>;
}

/// In-memory line source
///
/// Useful for replaying captured steamcmd output and for tests. Tracks how
/// many lines were pulled so callers can check how far a consumer read.
#[derive(Debug, Clone, Default)]
pub struct StaticLines {
    lines: VecDeque<String>,
    pulled: usize,
}

impl StaticLines {
    /// Create a source yielding `lines` in order
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            pulled: 0,
        }
    }

    /// Split a captured log into lines
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }

    /// Number of lines handed out so far
    pub fn pulled(&self) -> usize {
        self.pulled
    }

    /// Number of lines not yet handed out
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

#[async_trait]
impl LineSource for StaticLines {
    async fn next_line(&mut self) -> crate::Result<Option<String>> {
        let line = self.lines.pop_front();
        if line.is_some() {
            self.pulled += 1;
        }
        Ok(line)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_lines_yield_in_order_then_none() {
        let mut source = StaticLines::new(["a", "b"]);

        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("a"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("b"));
        assert_eq!(source.next_line().await.unwrap(), None);
        assert_eq!(source.next_line().await.unwrap(), None);
        assert_eq!(source.pulled(), 2);
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test]
    async fn from_text_splits_crlf_lines() {
        let mut source = StaticLines::from_text("Redirecting stderr\r\nLoading Steam API...OK\r\n");

        assert_eq!(
            source.next_line().await.unwrap().as_deref(),
            Some("Redirecting stderr")
        );
        assert_eq!(source.remaining(), 1);
    }
}
