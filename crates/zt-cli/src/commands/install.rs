use super::lint::nothing_to_do;
use super::{select_packages, spin_fail, spin_ok, spinner, EXIT_FAILURE, EXIT_SUCCESS};
use crate::output::Printer;
use std::path::{Path, PathBuf};
use tracing::warn;
use zt_core::{Configuration, GitBackend};
use zt_deploy::{has_deployment_errors, shutdown_requested, DeployConfig, Deployer, DeploymentResult};

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

    let results = deploy(cfg, &selection.packages, printer)?;
    print!("{}", printer.deployment_report(&results)?);
    Ok(if has_deployment_errors(&results) {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    })
}

pub(crate) fn deploy(
    cfg: &Configuration,
    packages: &[PathBuf],
    printer: &Printer,
) -> Result<Vec<DeploymentResult>, String> {
    if cfg.upgrade {
        warn!("upgrade testing from the previous revision is not performed; deploying the current revision");
    }
    let deployer =
        Deployer::new(DeployConfig::from_configuration(cfg)).map_err(|e| e.to_string())?;

    let label = format!("Deploying {} package(s)", packages.len());
    let pb = printer.shows_progress().then(|| spinner(&label));
    let results = deployer.deploy_many(packages, shutdown_requested);
    if let Some(pb) = &pb {
        if has_deployment_errors(&results) {
            spin_fail(pb, &label);
        } else {
            spin_ok(pb, &label);
        }
    }
    if results.len() < packages.len() {
        warn!(
            "{} package(s) were not deployed",
            packages.len() - results.len()
        );
    }
    Ok(results)
}
