// src/golden.rs
//
// Golden-fixture comparison of rendered email bodies.

use eyre::{eyre, Result};
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cfg::policy::LengthPolicy;

/// Line terminator used by the fixture files.
pub const FIXTURE_TERMINATOR: &str = "\n";
/// Line terminator the mail transport leaves in delivered bodies.
pub const TRANSPORT_TERMINATOR: &str = "\r\n";

/// Expected rendering, one entry per line.
#[derive(Debug, Clone, PartialEq)]
pub struct GoldenDocument {
    source: PathBuf,
    lines: Vec<String>,
}

impl GoldenDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read golden fixture {}: {}", path.display(), e))?;
        debug!("Loaded golden fixture {} ({} bytes)", path.display(), content.len());
        Ok(Self::parse(path, &content))
    }

    /// Build from fixture text that is already in memory.
    pub fn parse(source: impl Into<PathBuf>, content: &str) -> Self {
        Self {
            source: source.into(),
            lines: content.split(FIXTURE_TERMINATOR).map(String::from).collect(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonResult {
    Match { lines_compared: usize },
    /// `None` on either side means that document ran out of lines.
    Mismatch {
        index: usize,
        expected: Option<String>,
        actual: Option<String>,
    },
}

impl ComparisonResult {
    pub fn is_match(&self) -> bool {
        matches!(self, ComparisonResult::Match { .. })
    }
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonResult::Match { lines_compared } => {
                write!(f, "match ({} lines)", lines_compared)
            }
            ComparisonResult::Mismatch { index, expected, actual } => write!(
                f,
                "Line {} is not match: expected {:?}, actual {:?}",
                index + 1,
                expected.as_deref().unwrap_or("<end of golden>"),
                actual.as_deref().unwrap_or("<end of message>"),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
    policy: LengthPolicy,
}

impl Comparator {
    pub fn new(policy: LengthPolicy) -> Self {
        Self { policy }
    }

    /// Compare an observed body against the golden, line by line.
    pub fn compare(&self, golden: &GoldenDocument, observed: &str) -> ComparisonResult {
        let actual: Vec<&str> = observed.split(TRANSPORT_TERMINATOR).collect();
        let expected = golden.lines();

        for (index, (exp, act)) in expected.iter().zip(actual.iter()).enumerate() {
            if exp != act {
                return ComparisonResult::Mismatch {
                    index,
                    expected: Some(exp.clone()),
                    actual: Some(act.to_string()),
                };
            }
        }

        let overlap = expected.len().min(actual.len());
        if self.policy == LengthPolicy::Strict && expected.len() != actual.len() {
            return ComparisonResult::Mismatch {
                index: overlap,
                expected: expected.get(overlap).cloned(),
                actual: actual.get(overlap).map(|s| s.to_string()),
            };
        }

        if expected.len() != actual.len() {
            debug!(
                "Prefix match against {}: golden has {} lines, message has {}",
                golden.source().display(),
                expected.len(),
                actual.len()
            );
        }
        ComparisonResult::Match { lines_compared: overlap }
    }
}

/// Load the golden at `path` and compare `observed` against it.
pub fn compare(golden_path: &Path, observed: &str, policy: LengthPolicy) -> Result<ComparisonResult> {
    let golden = GoldenDocument::load(golden_path)?;
    Ok(Comparator::new(policy).compare(&golden, observed))
}
