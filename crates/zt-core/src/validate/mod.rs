//! The validation pipeline.
//!
//! A package runs through a fixed sequence of passes that all write into the
//! same [`ValidationResult`]:
//!
//! 1. existence of the manifest (the only pass that stops the pipeline),
//! 2. `zarf dev lint`, or the [`basic`] checks when the tool is unavailable,
//! 3. version increment against a baseline revision ([`increment`]),
//! 4. image digest pinning ([`images`]),
//! 5. component naming and the dependency graph ([`components`]),
//! 6. security and resource heuristics ([`security`]).
//!
//! Passes 3 to 6 can be switched off through [`ValidationOptions`].

pub mod basic;
pub mod components;
pub mod images;
pub mod increment;
pub mod security;

use crate::git::GitBackend;
use crate::lint::{classify_lint_output, LintAvailability, LintTool};
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zt_schema::{is_package_dir, ZarfPackage};

pub const NO_MANIFEST: &str = "Directory does not contain a zarf.yaml file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    pub check_version_increment: bool,
    pub validate_image_pinning: bool,
    pub validate_components: bool,
    pub validate_security: bool,
    /// Revision the version-increment pass compares against. The pass is
    /// skipped when this is `None`.
    pub baseline: Option<String>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            check_version_increment: true,
            validate_image_pinning: true,
            validate_components: true,
            validate_security: true,
            baseline: None,
        }
    }
}

/// Outcome of validating one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub package_path: PathBuf,
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new(package_path: impl Into<PathBuf>) -> Self {
        Self {
            package_path: package_path.into(),
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn extend(&mut self, errors: Vec<String>, warnings: Vec<String>) {
        self.errors.extend(errors);
        self.warnings.extend(warnings);
    }

    /// Settle `valid` from the accumulated errors.
    fn finish(mut self) -> Self {
        self.valid = self.errors.is_empty();
        self
    }
}

pub struct Validator<'a> {
    lint: &'a dyn LintTool,
    availability: LintAvailability,
    git: Option<&'a dyn GitBackend>,
    options: ValidationOptions,
}

impl<'a> Validator<'a> {
    pub fn new(
        lint: &'a dyn LintTool,
        availability: LintAvailability,
        options: ValidationOptions,
    ) -> Self {
        Self {
            lint,
            availability,
            git: None,
            options,
        }
    }

    /// Enable the version-increment pass with `git` as the history source.
    #[must_use]
    pub fn with_git(mut self, git: &'a dyn GitBackend) -> Self {
        self.git = Some(git);
        self
    }

    /// Validate one package directory.
    ///
    /// Returns `Err` only when the manifest exists but cannot be read or
    /// parsed; every other problem is recorded in the result.
    pub fn validate(&self, dir: &Path) -> Result<ValidationResult, CoreError> {
        let mut result = ValidationResult::new(dir);
        if !is_package_dir(dir) {
            result.error(NO_MANIFEST);
            return Ok(result.finish());
        }
        let pkg = ZarfPackage::load(dir)?;
        info!("validating {}", dir.display());

        self.delegate(&pkg, &mut result);

        if self.options.check_version_increment {
            match (self.git, self.options.baseline.as_deref()) {
                (Some(git), Some(baseline)) => increment::check(&pkg, git, baseline, &mut result),
                _ => debug!("no baseline revision, skipping version increment check"),
            }
        }
        if self.options.validate_image_pinning {
            images::check(&pkg, &mut result);
        }
        if self.options.validate_components {
            components::check(&pkg.manifest, &mut result);
            components::check_dependencies(&pkg.manifest, &mut result);
        }
        if self.options.validate_security {
            security::check(&pkg, &mut result);
            security::check_resources(&pkg, &mut result);
        }

        Ok(result.finish())
    }

    /// Validate every directory in order. Any fatal error aborts the batch.
    pub fn validate_many(&self, dirs: &[PathBuf]) -> Result<Vec<ValidationResult>, CoreError> {
        dirs.iter().map(|d| self.validate(d)).collect()
    }

    fn delegate(&self, pkg: &ZarfPackage, result: &mut ValidationResult) {
        let reason = match &self.availability {
            LintAvailability::Unavailable(reason) => reason.clone(),
            LintAvailability::Available => match self.lint.lint(&pkg.path) {
                Ok(run) => {
                    let findings = classify_lint_output(&run);
                    info!(
                        "zarf dev lint on {}: {} error(s), {} warning(s)",
                        pkg.path.display(),
                        findings.errors.len(),
                        findings.warnings.len()
                    );
                    result.extend(findings.errors, findings.warnings);
                    return;
                }
                Err(e) => {
                    warn!("zarf dev lint failed on {}: {e}", pkg.path.display());
                    e.to_string()
                }
            },
        };
        result.warn(format!(
            "Zarf CLI validation failed, falling back to basic validation: {reason}"
        ));
        basic::check(&pkg.manifest, result);
    }
}
