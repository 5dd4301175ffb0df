//! Core engine for zt: finding packages, working out which ones changed, and
//! validating them.
//!
//! This crate ties the manifest model from `zt-schema` to the outside world:
//! walking package roots (`locator`), asking Git what changed since the merge
//! base (`git`, `changes`), delegating to the external `zarf dev lint` tool
//! (`lint`), running the validation pipeline (`validate`), aggregating results
//! (`report`), and resolving layered configuration (`config`).

pub mod changes;
pub mod config;
pub mod git;
pub mod lint;
pub mod locator;
pub mod process;
pub mod report;
pub mod validate;

pub use changes::{owning_package, ChangeMapper, ChangeSet};
pub use config::{ConfigError, Configuration};
pub use git::{GitBackend, GitCli, GitError};
pub use lint::{
    classify_lint_output, LintAvailability, LintError, LintFindings, LintRun, LintTool, ZarfLint,
};
pub use locator::{
    discover, ensure_packages, filter_deprecated, filter_excluded, is_package, locate,
};
pub use report::{has_errors, summarize, validate_all, Summary};
pub use validate::{ValidationOptions, ValidationResult, Validator};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] zt_schema::ManifestError),
    #[error("git error: {0}")]
    Git(#[from] GitError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to find packages in directory {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("package validation failed:\n- {}", .0.join("\n- "))]
    MissingPackages(Vec<String>),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
