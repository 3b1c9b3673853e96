//! What the matrix build does when a capacity query fails.

use std::fmt;
use std::str::FromStr;

/// Failure handling for per-model capacity queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the whole build on the first failed query.
    ///
    /// Failures are reported in discovery order, so the error names the
    /// earliest-discovered model that failed.
    #[default]
    FailFast,

    /// Leave failed models out of the matrix and report them.
    ///
    /// The matrix is still rectangular; only the rows for failed models are
    /// missing. Their capacity is never written as zero.
    SkipFailed,
}

impl FailurePolicy {
    /// Parses a config value (`fail_fast` or `skip_failed`).
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fail_fast" | "failfast" => Some(Self::FailFast),
            "skip_failed" | "skip" => Some(Self::SkipFailed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailFast => "fail_fast",
            Self::SkipFailed => "skip_failed",
        }
    }

    pub fn skips_failures(&self) -> bool {
        matches!(self, Self::SkipFailed)
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_config_str(s)
            .ok_or_else(|| format!("expected fail_fast or skip_failed, got '{}'", s))
    }
}
