use super::{select_packages, spin_fail, spin_ok, spinner, Selection, EXIT_FAILURE, EXIT_SUCCESS};
use crate::output::Printer;
use std::path::Path;
use zt_core::{
    has_errors, Configuration, GitBackend, LintAvailability, ValidationResult, Validator, ZarfLint,
};

pub fn run(
    cfg: &Configuration,
    git: &dyn GitBackend,
    workdir: &Path,
    printer: &Printer,
) -> Result<u8, String> {
    let selection = select_packages(cfg, git, workdir)?;
    if selection.packages.is_empty() {
        print!("{}", printer.notice(nothing_to_do(&selection))?);
        return Ok(EXIT_SUCCESS);
    }

    let results = validate(cfg, git, &selection, printer)?;
    print!("{}", printer.validation_report(&results)?);
    Ok(if has_errors(&results) {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    })
}

pub(crate) fn nothing_to_do(selection: &Selection) -> &'static str {
    if selection.changed_only {
        "No changed packages found"
    } else {
        "No packages found"
    }
}

/// Validate the selected packages one at a time. The lint tool is probed
/// once for the whole batch.
pub(crate) fn validate(
    cfg: &Configuration,
    git: &dyn GitBackend,
    selection: &Selection,
    printer: &Printer,
) -> Result<Vec<ValidationResult>, String> {
    let lint = ZarfLint::new().with_extra_args(&cfg.zarf_lint_extra_args);
    let availability = LintAvailability::probe(&lint);
    let validator = Validator::new(
        &lint,
        availability,
        cfg.validation_options(selection.baseline.clone()),
    )
    .with_git(git);

    let mut results = Vec::with_capacity(selection.packages.len());
    for dir in &selection.packages {
        let label = dir.display().to_string();
        let pb = printer
            .shows_progress()
            .then(|| spinner(&format!("Linting {label}")));
        let result = match validator.validate(dir) {
            Ok(result) => result,
            Err(e) => {
                if let Some(pb) = &pb {
                    spin_fail(pb, &label);
                }
                return Err(e.to_string());
            }
        };
        if let Some(pb) = &pb {
            if result.valid {
                spin_ok(pb, &label);
            } else {
                spin_fail(pb, &label);
            }
        }
        results.push(result);
    }
    Ok(results)
}
