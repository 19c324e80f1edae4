//! QR capture. Decoding itself is delegated to an external program; this
//! module only turns "next decoded payload" into text or an error.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scanner produced no payload")]
    Empty,

    #[error("Scanner exited with {0}")]
    Failed(String),

    #[error("Failed to run scanner: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ScanSource: Send {
    /// Blocks until the next QR code is decoded.
    async fn next_payload(&mut self) -> Result<String, ScanError>;
}

/// Runs a decoder such as `zbarcam --raw --oneshot` and takes its stdout.
#[derive(Debug, Clone)]
pub struct CommandScanner {
    program: String,
    args: Vec<String>,
}

impl CommandScanner {
    /// Splits `command` on whitespace. `None` for a blank command.
    #[must_use]
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl ScanSource for CommandScanner {
    async fn next_payload(&mut self) -> Result<String, ScanError> {
        debug!(program = %self.program, args = ?self.args, "Starting scanner");

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr.trim(), "Scanner failed");
            return Err(ScanError::Failed(output.status.to_string()));
        }

        let text = String::from_utf8_lossy(&output.stdout)
            .trim_end_matches(['\r', '\n'])
            .to_string();

        if text.trim().is_empty() {
            return Err(ScanError::Empty);
        }

        Ok(text)
    }
}

/// Hands out pre-decoded payloads in order.
#[derive(Debug, Clone, Default)]
pub struct QueuedScanner {
    queue: VecDeque<String>,
}

impl QueuedScanner {
    pub fn new(payloads: impl IntoIterator<Item = String>) -> Self {
        Self {
            queue: payloads.into_iter().collect(),
        }
    }

    pub fn push(&mut self, payload: impl Into<String>) {
        self.queue.push_back(payload.into());
    }
}

#[async_trait]
impl ScanSource for QueuedScanner {
    async fn next_payload(&mut self) -> Result<String, ScanError> {
        self.queue.pop_front().ok_or(ScanError::Empty)
    }
}

/// The configured camera scanner, if any.
#[must_use]
pub fn from_config(command: Option<&str>) -> Option<Box<dyn ScanSource>> {
    command
        .and_then(CommandScanner::parse)
        .map(|scanner| Box::new(scanner) as Box<dyn ScanSource>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        let scanner = CommandScanner::parse("zbarcam --raw  --oneshot").unwrap();
        assert_eq!(scanner.program, "zbarcam");
        assert_eq!(scanner.args, vec!["--raw", "--oneshot"]);
        assert!(CommandScanner::parse("   ").is_none());
    }

    #[tokio::test]
    async fn test_queued_scanner_drains_in_order() {
        let mut scanner = QueuedScanner::new(["one".to_string()]);
        scanner.push("two");

        assert_eq!(scanner.next_payload().await.unwrap(), "one");
        assert_eq!(scanner.next_payload().await.unwrap(), "two");
        assert!(matches!(scanner.next_payload().await, Err(ScanError::Empty)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_scanner_reads_stdout() {
        let mut scanner = CommandScanner::parse("echo https://example.com").unwrap();
        assert_eq!(scanner.next_payload().await.unwrap(), "https://example.com");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_scanner_failure() {
        let mut scanner = CommandScanner::parse("false").unwrap();
        assert!(matches!(
            scanner.next_payload().await,
            Err(ScanError::Failed(_))
        ));

        let mut missing = CommandScanner::parse("qrsync-no-such-decoder").unwrap();
        assert!(matches!(missing.next_payload().await, Err(ScanError::Io(_))));
    }
}
