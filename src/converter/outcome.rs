use std::fmt;

use serde::Serialize;

/// How a converter failure should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Worth another attempt (resource exhaustion, deadline, killed by a signal)
    Transient,
    /// Retrying will not help
    Permanent,
}

/// Output signatures that identify a failure class regardless of exit code
pub const KNOWN_SIGNATURES: &[(&str, FailureClass)] = &[
    ("OutOfMemoryError", FailureClass::Transient),
    ("std::bad_alloc", FailureClass::Transient),
];

/// Lines captured from the converter's stdout and stderr
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapturedOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CapturedOutput {
    /// All lines, stdout first
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.iter().chain(&self.stderr).map(String::as_str)
    }

    /// First known signature found in the output
    pub fn signature(&self) -> Option<(&'static str, FailureClass)> {
        KNOWN_SIGNATURES
            .iter()
            .copied()
            .find(|(needle, _)| self.lines().any(|line| line.contains(needle)))
    }

    /// Last `n` stderr lines (stdout when stderr is empty), joined by newlines
    pub fn tail(&self, n: usize) -> String {
        let source = if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let start = source.len().saturating_sub(n);
        source[start..].join("\n")
    }
}

/// Result of one converter invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// Exit code 0
    Success { output: CapturedOutput },
    /// Non-zero exit code, or `None` when terminated by a signal
    Failed {
        exit_code: Option<i32>,
        output: CapturedOutput,
    },
    /// Killed after the deadline passed
    TimedOut {
        timeout_secs: u64,
        output: CapturedOutput,
    },
    /// Killed because the batch was cancelled
    Cancelled,
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Captured output, if the process ran to an end
    pub fn output(&self) -> Option<&CapturedOutput> {
        match self {
            Self::Success { output }
            | Self::Failed { output, .. }
            | Self::TimedOut { output, .. } => Some(output),
            Self::Cancelled => None,
        }
    }

    /// Classify a failed invocation; `None` on success
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            Self::Success { .. } => None,
            Self::Cancelled => Some(FailureClass::Permanent),
            Self::TimedOut { .. } => Some(FailureClass::Transient),
            Self::Failed { exit_code, output } => match (output.signature(), exit_code) {
                (Some((_, class)), _) => Some(class),
                (None, None) => Some(FailureClass::Transient),
                (None, Some(_)) => Some(FailureClass::Permanent),
            },
        }
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { .. } => f.write_str("success"),
            Self::Failed {
                exit_code: Some(code),
                output,
            } => {
                write!(f, "exited with code {code}")?;
                if let Some((signature, _)) = output.signature() {
                    write!(f, " ({signature})")?;
                }
                Ok(())
            }
            Self::Failed {
                exit_code: None, ..
            } => f.write_str("terminated by signal"),
            Self::TimedOut { timeout_secs, .. } => write!(f, "timed out after {timeout_secs}s"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(code: Option<i32>, stderr: &[&str]) -> ToolOutcome {
        ToolOutcome::Failed {
            exit_code: code,
            output: CapturedOutput {
                stdout: vec!["format: mzML".to_string()],
                stderr: stderr.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    #[test]
    fn test_failure_classes() {
        let success = ToolOutcome::Success {
            output: CapturedOutput::default(),
        };
        assert_eq!(success.failure_class(), None);
        assert_eq!(
            failed(Some(1), &["error: unsupported file"]).failure_class(),
            Some(FailureClass::Permanent)
        );
        assert_eq!(
            failed(Some(1), &["terminate called after throwing 'std::bad_alloc'"]).failure_class(),
            Some(FailureClass::Transient)
        );
        assert_eq!(failed(None, &[]).failure_class(), Some(FailureClass::Transient));
        assert_eq!(ToolOutcome::Cancelled.failure_class(), Some(FailureClass::Permanent));
    }

    #[test]
    fn test_display_mentions_signature() {
        let outcome = failed(Some(3), &["java.lang.OutOfMemoryError: heap"]);
        assert_eq!(outcome.to_string(), "exited with code 3 (OutOfMemoryError)");
    }

    #[test]
    fn test_tail_prefers_stderr() {
        let output = CapturedOutput {
            stdout: vec!["a".into()],
            stderr: vec!["x".into(), "y".into(), "z".into()],
        };
        assert_eq!(output.tail(2), "y\nz");
        assert_eq!(CapturedOutput::default().tail(5), "");
    }
}
