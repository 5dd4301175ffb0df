use crate::CoreError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zt_schema::{parse_manifest_file, MANIFEST_FILE_NAME};

pub use zt_schema::is_package_dir as is_package;

/// Every directory under each root that directly contains a manifest.
///
/// A root that does not exist contributes nothing. Results are concatenated
/// per root without cross-root deduplication; see [`discover`] for the union.
pub fn locate(roots: &[PathBuf]) -> Result<Vec<PathBuf>, CoreError> {
    let mut packages = Vec::new();
    for root in roots {
        packages.extend(locate_in(root)?);
    }
    Ok(packages)
}

fn locate_in(root: &Path) -> Result<Vec<PathBuf>, CoreError> {
    if !root.exists() {
        debug!("package root {} does not exist, skipping", root.display());
        return Ok(Vec::new());
    }

    let mut packages = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| CoreError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE_NAME {
            if let Some(parent) = entry.path().parent() {
                packages.push(parent.to_path_buf());
            }
        }
    }
    debug!("found {} package(s) under {}", packages.len(), root.display());
    Ok(packages)
}

/// Union of [`locate`] over all roots, deduplicated and sorted.
pub fn discover(roots: &[PathBuf]) -> Result<Vec<PathBuf>, CoreError> {
    let unique: BTreeSet<PathBuf> = locate(roots)?.into_iter().collect();
    Ok(unique.into_iter().collect())
}

/// Drop packages whose base name or full path is listed in `excluded`.
pub fn filter_excluded(packages: Vec<PathBuf>, excluded: &[String]) -> Vec<PathBuf> {
    if excluded.is_empty() {
        return packages;
    }
    packages
        .into_iter()
        .filter(|pkg| {
            let base = pkg
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let full = pkg.to_string_lossy();
            let skip = excluded.iter().any(|e| *e == base || *e == full);
            if skip {
                debug!("excluding package {}", pkg.display());
            }
            !skip
        })
        .collect()
}

/// Drop packages whose manifest sets `metadata.deprecated: true`.
/// Manifests that fail to parse are kept so validation can report them.
pub fn filter_deprecated(packages: Vec<PathBuf>) -> Vec<PathBuf> {
    packages
        .into_iter()
        .filter(|pkg| match parse_manifest_file(pkg.join(MANIFEST_FILE_NAME)) {
            Ok(m) if m.metadata.deprecated => {
                debug!("skipping deprecated package {}", pkg.display());
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!("cannot check deprecation of {}: {e}", pkg.display());
                true
            }
        })
        .collect()
}

/// Fail if any of `dirs` lacks a manifest, naming every offender.
pub fn ensure_packages(dirs: &[PathBuf]) -> Result<(), CoreError> {
    let missing: Vec<String> = dirs
        .iter()
        .filter(|d| !is_package(d))
        .map(|d| format!("directory {} does not contain a valid Zarf package", d.display()))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::MissingPackages(missing))
    }
}
