//! Delegation to the external `zarf dev lint` command.
//!
//! The tool's log lines look like `2024-05-01 10:00:00 ERR message`; only the
//! severity marker and the text after it matter here.

use crate::process;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

const ERR_MARKER: &str = " ERR ";
const WRN_MARKER: &str = " WRN ";
const IGNORED_LINE: &str = "Using build directory";
const LOOSE_FAILURE_WORDS: &[&str] = &["ERROR", "error", "FAIL", "fail"];

#[derive(Debug, Error)]
pub enum LintError {
    #[error("zarf CLI not found - please install Zarf CLI for full validation: {0}")]
    Unavailable(String),
    #[error("failed to run zarf dev lint: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Raw outcome of one lint invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintRun {
    pub success: bool,
    pub code: Option<i32>,
    pub output: String,
}

/// Errors and warnings extracted from lint output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintFindings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub trait LintTool {
    /// Check that the tool can be invoked at all.
    fn probe(&self) -> Result<(), LintError>;

    /// Lint the package in `dir`. Only a failure to start the tool is an
    /// `Err`; a non-zero exit is reported through [`LintRun::success`].
    fn lint(&self, dir: &Path) -> Result<LintRun, LintError>;
}

/// [`LintTool`] backed by the `zarf` binary.
#[derive(Debug, Clone)]
pub struct ZarfLint {
    binary: String,
    extra_args: Vec<String>,
}

impl Default for ZarfLint {
    fn default() -> Self {
        Self::new()
    }
}

impl ZarfLint {
    pub fn new() -> Self {
        Self {
            binary: "zarf".to_owned(),
            extra_args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    #[must_use]
    pub fn with_extra_args(mut self, extra: &str) -> Self {
        self.extra_args = process::split_args(extra);
        self
    }
}

impl LintTool for ZarfLint {
    fn probe(&self) -> Result<(), LintError> {
        let out = process::run(&self.binary, ["version"], None)
            .map_err(|e| LintError::Unavailable(e.to_string()))?;
        if out.success {
            debug!("zarf version: {}", out.stdout.trim());
            Ok(())
        } else {
            Err(LintError::Unavailable(format!(
                "`{} version` exited with {}",
                self.binary,
                exit_label(out.code)
            )))
        }
    }

    fn lint(&self, dir: &Path) -> Result<LintRun, LintError> {
        let mut args = vec!["dev".to_owned(), "lint".to_owned()];
        args.extend(self.extra_args.iter().cloned());
        let out = process::run(&self.binary, &args, Some(dir)).map_err(LintError::Spawn)?;
        Ok(LintRun {
            success: out.success,
            code: out.code,
            output: out.combined(),
        })
    }
}

/// Whether the lint tool can be used for this batch. Resolved once up front
/// and handed to every validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintAvailability {
    Available,
    Unavailable(String),
}

impl LintAvailability {
    pub fn probe(tool: &dyn LintTool) -> Self {
        match tool.probe() {
            Ok(()) => Self::Available,
            Err(e) => {
                warn!("{e}; falling back to basic validation");
                Self::Unavailable(e.to_string())
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

fn exit_label(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".to_owned(), |c| c.to_string())
}

fn after_marker(line: &str, marker: &str) -> String {
    line.split_once(marker)
        .map_or(line, |(_, rest)| rest)
        .trim()
        .to_owned()
}

/// Classify lint output into errors and warnings.
///
/// Marker lines are always classified. When the run failed, unmarked lines
/// mentioning an error or failure are errors too, and if nothing at all was
/// found a generic error naming the exit status is recorded so the package
/// cannot pass.
pub fn classify_lint_output(run: &LintRun) -> LintFindings {
    let mut findings = LintFindings::default();

    for line in run.output.lines().map(str::trim) {
        if line.is_empty() || line.contains(IGNORED_LINE) {
            continue;
        }
        if !run.success && line.contains(ERR_MARKER) {
            findings.errors.push(after_marker(line, ERR_MARKER));
        } else if line.contains(WRN_MARKER) {
            findings.warnings.push(after_marker(line, WRN_MARKER));
        } else if !run.success && LOOSE_FAILURE_WORDS.iter().any(|w| line.contains(w)) {
            findings.errors.push(line.to_owned());
        }
    }

    if !run.success && findings.errors.is_empty() {
        findings.errors.push(format!(
            "zarf dev lint failed with exit status {}",
            exit_label(run.code)
        ));
    }
    findings
}
