//! Version-increment enforcement against a baseline revision.
//!
//! A package whose manifest changed since the baseline must carry a new
//! `metadata.version`. The previous manifest is read straight from Git so
//! the comparison is byte-exact.

use super::ValidationResult;
use crate::git::GitBackend;
use std::cmp::Ordering;
use tracing::debug;
use zt_schema::{
    breaking_change_allowed, compare_versions, manifest_path, parse_manifest_str, ZarfPackage,
};

pub const NO_PREVIOUS: &str = "Could not retrieve previous package version for comparison";
pub const UNPARSABLE_PREVIOUS: &str = "Could not parse previous package version for comparison";

pub fn check(pkg: &ZarfPackage, git: &dyn GitBackend, baseline: &str, result: &mut ValidationResult) {
    let path = manifest_path(&pkg.path);
    let previous = match git.show(baseline, &path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("no manifest for {} at {baseline}: {e}", pkg.path.display());
            result.warn(NO_PREVIOUS);
            return;
        }
    };
    let previous_text = String::from_utf8_lossy(&previous);
    let Ok(previous_manifest) = parse_manifest_str(&previous_text) else {
        result.warn(UNPARSABLE_PREVIOUS);
        return;
    };

    // Nothing to enforce without a current version; the basic checks warn.
    let Some(current) = pkg.manifest.version() else {
        return;
    };
    let unchanged_content = previous == pkg.raw.as_bytes();

    let Some(prev) = previous_manifest.version() else {
        debug!("{} had no version at {baseline}", pkg.path.display());
        return;
    };

    if prev == current {
        if !unchanged_content {
            result.error(stuck(current));
        }
        return;
    }

    match compare_versions(prev, current) {
        Ok(Ordering::Less) => match breaking_change_allowed(prev, current) {
            Ok(true) => {}
            Ok(false) => result.warn(format!(
                "Package version change {prev} -> {current} is outside the compatible range (breaking change)"
            )),
            Err(e) => result.warn(format!("Could not check version compatibility: {e}")),
        },
        Ok(Ordering::Equal) => {
            if !unchanged_content {
                result.error(stuck(current));
            }
        }
        Ok(Ordering::Greater) => result.error(format!(
            "Package version decreased from {prev} to {current}"
        )),
        Err(e) => result.warn(format!(
            "Could not compare package versions {prev} and {current}: {e}"
        )),
    }
}

fn stuck(version: &str) -> String {
    format!("Package content changed but version not incremented (still {version})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitError;
    use std::fs;
    use std::path::{Path, PathBuf};

    struct History(Option<String>);

    impl GitBackend for History {
        fn merge_base(&self, _: &str, _: &str) -> Result<String, GitError> {
            Ok("base".to_owned())
        }
        fn changed_files(&self, _: &str, _: &[PathBuf]) -> Result<Vec<PathBuf>, GitError> {
            Ok(Vec::new())
        }
        fn show(&self, rev: &str, path: &Path) -> Result<Vec<u8>, GitError> {
            self.0.as_ref().map(|s| s.as_bytes().to_vec()).ok_or_else(|| GitError::Command {
                args: format!("show {rev}:{}", path.display()),
                stderr: "path does not exist".to_owned(),
            })
        }
    }

    fn manifest(version: &str, extra: &str) -> String {
        format!("kind: ZarfPackageConfig\nmetadata:\n  name: app\n  version: {version}\n{extra}")
    }

    fn run(current: &str, previous: Option<String>) -> ValidationResult {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zarf.yaml"), current).unwrap();
        let pkg = ZarfPackage::load(dir.path()).unwrap();
        let mut result = ValidationResult::new(dir.path());
        check(&pkg, &History(previous), "base", &mut result);
        result
    }

    #[test]
    fn no_history_is_a_warning() {
        let r = run(&manifest("1.0.0", ""), None);
        assert!(r.errors.is_empty());
        assert_eq!(r.warnings, vec![NO_PREVIOUS]);
    }

    #[test]
    fn unparsable_history_is_a_warning() {
        let r = run(&manifest("1.0.0", ""), Some("kind: [oops\n".to_owned()));
        assert_eq!(r.warnings, vec![UNPARSABLE_PREVIOUS]);
    }

    #[test]
    fn identical_content_passes() {
        let m = manifest("1.0.0", "");
        let r = run(&m, Some(m.clone()));
        assert!(r.errors.is_empty());
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn changed_content_same_version_is_error() {
        let prev = manifest("1.0.0", "");
        let r = run(&manifest("1.0.0", "components:\n  - name: web\n"), Some(prev));
        assert_eq!(
            r.errors,
            vec!["Package content changed but version not incremented (still 1.0.0)"]
        );
    }

    #[test]
    fn increase_with_other_changes_passes() {
        let prev = manifest("1.0.0", "");
        let r = run(&manifest("1.1.0", "components:\n  - name: web\n"), Some(prev));
        assert!(r.errors.is_empty());
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn major_bump_is_breaking_warning() {
        let prev = manifest("1.4.0", "");
        let r = run(&manifest("2.0.0", ""), Some(prev));
        assert!(r.errors.is_empty());
        assert_eq!(r.warnings.len(), 1);
        assert!(r.warnings[0].contains("1.4.0 -> 2.0.0"));
    }

    #[test]
    fn decrease_is_error() {
        let prev = manifest("1.2.0", "");
        let r = run(&manifest("1.1.9", ""), Some(prev));
        assert_eq!(r.errors, vec!["Package version decreased from 1.2.0 to 1.1.9"]);
    }

    #[test]
    fn equivalent_spellings_count_as_unchanged() {
        let prev = manifest("v1.2", "");
        let r = run(&manifest("1.2.0", ""), Some(prev));
        assert_eq!(r.errors.len(), 1);
    }

    #[test]
    fn non_semver_is_warning() {
        let prev = manifest("latest", "");
        let r = run(&manifest("1.0.0", ""), Some(prev));
        assert!(r.errors.is_empty());
        assert!(r.warnings[0].starts_with("Could not compare package versions"));
    }

    #[test]
    fn missing_current_version_is_skipped() {
        let prev = manifest("1.0.0", "");
        let r = run("kind: ZarfPackageConfig\nmetadata:\n  name: app\n", Some(prev));
        assert!(r.errors.is_empty());
        assert!(r.warnings.is_empty());
    }
}
