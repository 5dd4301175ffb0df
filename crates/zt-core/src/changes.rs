//! Mapping changed files back to the packages that own them.

use crate::git::{normalize, GitBackend};
use crate::locator::is_package;
use crate::CoreError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome of one change-detection run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub merge_base: String,
    pub changed_files: Vec<PathBuf>,
    pub changed_packages: BTreeSet<PathBuf>,
}

impl ChangeSet {
    pub fn packages(&self) -> Vec<PathBuf> {
        self.changed_packages.iter().cloned().collect()
    }
}

pub struct ChangeMapper<'a> {
    git: &'a dyn GitBackend,
    workdir: PathBuf,
}

impl<'a> ChangeMapper<'a> {
    /// `workdir` is the directory Git paths and `roots` are relative to.
    pub fn new(git: &'a dyn GitBackend, workdir: impl Into<PathBuf>) -> Self {
        Self {
            git,
            workdir: workdir.into(),
        }
    }

    /// Merge base of `remote/target_branch` and `HEAD`. This is also the
    /// baseline for version-increment checks.
    pub fn merge_base(&self, remote: &str, target_branch: &str) -> Result<String, CoreError> {
        let target = format!("{remote}/{target_branch}");
        Ok(self.git.merge_base(&target, "HEAD")?)
    }

    pub fn detect(
        &self,
        remote: &str,
        target_branch: &str,
        roots: &[PathBuf],
    ) -> Result<ChangeSet, CoreError> {
        let merge_base = self.merge_base(remote, target_branch)?;
        self.detect_since(&merge_base, roots)
    }

    /// Same as [`detect`](Self::detect) against an explicit revision.
    pub fn detect_since(&self, merge_base: &str, roots: &[PathBuf]) -> Result<ChangeSet, CoreError> {
        let changed_files = self.git.changed_files(merge_base, roots)?;
        debug!("{} file(s) changed since {merge_base}", changed_files.len());

        let changed_packages: BTreeSet<PathBuf> = changed_files
            .iter()
            .filter_map(|f| owning_package(f, roots, &self.workdir))
            .collect();
        info!("{} package(s) changed since {merge_base}", changed_packages.len());

        Ok(ChangeSet {
            merge_base: merge_base.to_owned(),
            changed_files,
            changed_packages,
        })
    }

    pub fn find_changed(
        &self,
        remote: &str,
        target_branch: &str,
        roots: &[PathBuf],
    ) -> Result<Vec<PathBuf>, CoreError> {
        Ok(self.detect(remote, target_branch, roots)?.packages())
    }
}

/// Nearest package directory containing `file`, provided it lies under one
/// of `roots`. `file` is relative to `workdir`. Relative roots are too;
/// absolute roots must lie inside it. The returned path is `workdir` joined
/// with the package directory.
pub fn owning_package(file: &Path, roots: &[PathBuf], workdir: &Path) -> Option<PathBuf> {
    let roots: Vec<PathBuf> = roots.iter().map(|r| relative_root(r, workdir)).collect();
    let mut dir = file.parent().map(normalize)?;

    while !dir.as_os_str().is_empty() {
        if is_package(&workdir.join(&dir)) {
            if roots.iter().any(|r| dir.starts_with(r)) {
                return Some(normalize(&workdir.join(&dir)));
            }
            debug!(
                "package {} owning {} is outside every root",
                dir.display(),
                file.display()
            );
            return None;
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

fn relative_root(root: &Path, workdir: &Path) -> PathBuf {
    if !root.is_absolute() {
        return normalize(root);
    }
    let base = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
    let resolved = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    match resolved.strip_prefix(&base) {
        Ok(rel) => normalize(rel),
        Err(_) => {
            debug!("root {} is outside {}", root.display(), workdir.display());
            normalize(root)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitError;
    use std::fs;

    fn package(root: &Path, rel: &str) {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("zarf.yaml"), "kind: ZarfPackageConfig\n").unwrap();
    }

    struct FixedGit {
        files: Vec<&'static str>,
        fail_merge_base: bool,
    }

    impl GitBackend for FixedGit {
        fn merge_base(&self, left: &str, right: &str) -> Result<String, GitError> {
            if self.fail_merge_base {
                return Err(GitError::MergeBase {
                    left: left.to_owned(),
                    right: right.to_owned(),
                    reason: "unknown revision".to_owned(),
                });
            }
            Ok("base123".to_owned())
        }
        fn changed_files(&self, _: &str, _: &[PathBuf]) -> Result<Vec<PathBuf>, GitError> {
            Ok(self.files.iter().map(PathBuf::from).collect())
        }
        fn show(&self, _: &str, _: &Path) -> Result<Vec<u8>, GitError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn file_directly_in_package_maps_to_it() {
        let dir = tempfile::tempdir().unwrap();
        package(dir.path(), "packages/a");
        let owner = owning_package(
            Path::new("packages/a/zarf.yaml"),
            &[PathBuf::from("packages")],
            dir.path(),
        );
        assert_eq!(owner, Some(dir.path().join("packages/a")));
    }

    #[test]
    fn nested_file_maps_to_nearest_package() {
        let dir = tempfile::tempdir().unwrap();
        package(dir.path(), "packages/a");
        package(dir.path(), "packages/a/inner");
        let roots = [PathBuf::from("./packages/")];
        assert_eq!(
            owning_package(Path::new("packages/a/inner/chart/values.yaml"), &roots, dir.path()),
            Some(dir.path().join("packages/a/inner"))
        );
        assert_eq!(
            owning_package(Path::new("packages/a/manifests/deploy.yaml"), &roots, dir.path()),
            Some(dir.path().join("packages/a"))
        );
    }

    #[test]
    fn file_without_package_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        package(dir.path(), "packages/a");
        let roots = [PathBuf::from("packages")];
        assert_eq!(owning_package(Path::new("README.md"), &roots, dir.path()), None);
        assert_eq!(
            owning_package(Path::new(".github/workflows/ci.yaml"), &roots, dir.path()),
            None
        );
    }

    #[test]
    fn package_outside_roots_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        package(dir.path(), "other/b");
        let roots = [PathBuf::from("packages")];
        assert_eq!(
            owning_package(Path::new("other/b/zarf.yaml"), &roots, dir.path()),
            None
        );
    }

    #[test]
    fn absolute_root_matches_relative_file() {
        let dir = tempfile::tempdir().unwrap();
        package(dir.path(), "packages/a");
        let roots = [dir.path().join("packages")];
        assert_eq!(
            owning_package(Path::new("packages/a/zarf.yaml"), &roots, dir.path()),
            Some(dir.path().join("packages/a"))
        );
        let outside = [dir.path().join("other")];
        assert_eq!(
            owning_package(Path::new("packages/a/zarf.yaml"), &outside, dir.path()),
            None
        );
    }

    #[test]
    fn root_prefix_is_component_wise() {
        let dir = tempfile::tempdir().unwrap();
        package(dir.path(), "packages-old/a");
        let roots = [PathBuf::from("packages")];
        assert_eq!(
            owning_package(Path::new("packages-old/a/zarf.yaml"), &roots, dir.path()),
            None
        );
    }

    #[test]
    fn detect_deduplicates_packages() {
        let dir = tempfile::tempdir().unwrap();
        package(dir.path(), "packages/a");
        package(dir.path(), "packages/b");
        let git = FixedGit {
            files: vec![
                "packages/a/zarf.yaml",
                "packages/a/values.yaml",
                "packages/b/manifests/x.yaml",
                "docs/index.md",
            ],
            fail_merge_base: false,
        };
        let mapper = ChangeMapper::new(&git, dir.path());
        let set = mapper
            .detect("origin", "main", &[PathBuf::from("packages")])
            .unwrap();
        assert_eq!(set.merge_base, "base123");
        assert_eq!(set.changed_files.len(), 4);
        assert_eq!(
            set.packages(),
            vec![dir.path().join("packages/a"), dir.path().join("packages/b")]
        );
    }

    #[test]
    fn merge_base_failure_is_fatal() {
        let git = FixedGit {
            files: vec![],
            fail_merge_base: true,
        };
        let mapper = ChangeMapper::new(&git, ".");
        let err = mapper
            .find_changed("origin", "main", &[PathBuf::from("packages")])
            .unwrap_err();
        assert!(matches!(err, CoreError::Git(GitError::MergeBase { .. })));
    }

    #[test]
    fn deleted_package_is_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("packages")).unwrap();
        let git = FixedGit {
            files: vec!["packages/gone/zarf.yaml"],
            fail_merge_base: false,
        };
        let mapper = ChangeMapper::new(&git, dir.path());
        let set = mapper
            .detect("origin", "main", &[PathBuf::from("packages")])
            .unwrap();
        assert!(set.changed_packages.is_empty());
    }
}
