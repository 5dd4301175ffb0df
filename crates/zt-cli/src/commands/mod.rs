pub mod completions;
pub mod doctor;
pub mod install;
pub mod lint;
pub mod lint_and_install;
pub mod list_changed;
pub mod man_pages;

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use zt_core::{
    discover, ensure_packages, filter_deprecated, filter_excluded, ChangeMapper, Configuration,
    GitBackend,
};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_GIT_ERROR: u8 = 3;
pub const EXIT_CONFIG_ERROR: u8 = 4;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Packages a command operates on, and the revision to compare versions
/// against when they were found by change detection.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub packages: Vec<PathBuf>,
    pub baseline: Option<String>,
    pub changed_only: bool,
}

/// Explicit `packages`, every package under `zarf-dirs` with `all`, or the
/// packages changed since the merge base otherwise. Exclusions apply to
/// all three.
pub fn select_packages(
    cfg: &Configuration,
    git: &dyn GitBackend,
    workdir: &Path,
) -> Result<Selection, String> {
    let mut selection = if !cfg.packages.is_empty() {
        ensure_packages(&cfg.packages).map_err(|e| e.to_string())?;
        info!("using {} specified package(s)", cfg.packages.len());
        Selection {
            packages: cfg.packages.clone(),
            ..Selection::default()
        }
    } else if cfg.all {
        let packages = discover(&cfg.zarf_dirs).map_err(|e| e.to_string())?;
        info!("found {} package(s) under {:?}", packages.len(), cfg.zarf_dirs);
        Selection {
            packages,
            ..Selection::default()
        }
    } else {
        let changes = ChangeMapper::new(git, workdir)
            .detect(&cfg.remote, &cfg.target_branch, &cfg.zarf_dirs)
            .map_err(|e| e.to_string())?;
        Selection {
            packages: changes.packages(),
            baseline: Some(changes.merge_base),
            changed_only: true,
        }
    };

    selection.packages = filter_excluded(selection.packages, &cfg.excluded_packages);
    if cfg.exclude_deprecated {
        selection.packages = filter_deprecated(selection.packages);
    }
    Ok(selection)
}
