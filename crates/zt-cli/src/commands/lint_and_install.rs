use super::lint::{nothing_to_do, validate};
use super::{install, select_packages, EXIT_FAILURE, EXIT_SUCCESS};
use crate::output::Printer;
use std::path::{Path, PathBuf};
use tracing::warn;
use zt_core::{has_errors, Configuration, GitBackend};
use zt_deploy::has_deployment_errors;

/// Lint the selected packages, then install the ones that passed.
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

    let lint_results = validate(cfg, git, &selection, printer)?;
    let passed: Vec<PathBuf> = lint_results
        .iter()
        .filter(|r| r.valid)
        .map(|r| r.package_path.clone())
        .collect();
    let failed = lint_results.len() - passed.len();
    if failed > 0 {
        warn!("not installing {failed} package(s) that failed linting");
    }

    let deploy_results = if passed.is_empty() {
        Vec::new()
    } else {
        match install::deploy(cfg, &passed, printer) {
            Ok(results) => results,
            Err(e) => {
                print!("{}", printer.validation_report(&lint_results)?);
                return Err(e);
            }
        }
    };

    print!("{}", printer.combined_report(&lint_results, &deploy_results)?);
    Ok(
        if has_errors(&lint_results) || has_deployment_errors(&deploy_results) {
            EXIT_FAILURE
        } else {
            EXIT_SUCCESS
        },
    )
}
