use crate::validate::{ValidationResult, Validator};
use crate::CoreError;
use serde::Serialize;
use std::path::PathBuf;

/// Validate every package in order; see [`Validator::validate_many`].
pub fn validate_all(
    validator: &Validator<'_>,
    packages: &[PathBuf],
) -> Result<Vec<ValidationResult>, CoreError> {
    validator.validate_many(packages)
}

/// True iff any result is invalid.
pub fn has_errors(results: &[ValidationResult]) -> bool {
    results.iter().any(|r| !r.valid)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub packages: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
}

pub fn summarize(results: &[ValidationResult]) -> Summary {
    results.iter().fold(Summary::default(), |mut s, r| {
        s.packages += 1;
        if r.valid {
            s.passed += 1;
        } else {
            s.failed += 1;
        }
        s.errors += r.errors.len();
        s.warnings += r.warnings.len();
        s
    })
}
