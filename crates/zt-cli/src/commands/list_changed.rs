use super::EXIT_SUCCESS;
use crate::output::Printer;
use std::path::Path;
use zt_core::{filter_excluded, ChangeMapper, Configuration, GitBackend};

/// Print every package changed since the merge base with the target branch.
pub fn run(
    cfg: &Configuration,
    git: &dyn GitBackend,
    workdir: &Path,
    printer: &Printer,
) -> Result<u8, String> {
    let changed = ChangeMapper::new(git, workdir)
        .find_changed(&cfg.remote, &cfg.target_branch, &cfg.zarf_dirs)
        .map_err(|e| e.to_string())?;
    let changed = filter_excluded(changed, &cfg.excluded_packages);
    print!("{}", printer.package_list(&changed)?);
    Ok(EXIT_SUCCESS)
}
