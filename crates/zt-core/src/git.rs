use crate::process::{self, ProcessOutput};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("git {args} failed: {stderr}")]
    Command { args: String, stderr: String },
    #[error("could not compute merge base of {left} and {right}: {reason}")]
    MergeBase {
        left: String,
        right: String,
        reason: String,
    },
}

/// The three history queries zt needs from Git.
pub trait GitBackend {
    /// Most recent common ancestor of two revisions.
    fn merge_base(&self, left: &str, right: &str) -> Result<String, GitError>;

    /// Files changed between `rev` and the working tree, limited to `paths`.
    /// Returned paths are relative to the working directory.
    fn changed_files(&self, rev: &str, paths: &[PathBuf]) -> Result<Vec<PathBuf>, GitError>;

    /// Raw content of `path` as it was at `rev`.
    fn show(&self, rev: &str, path: &Path) -> Result<Vec<u8>, GitError>;
}

/// [`GitBackend`] backed by the `git` binary, run inside `workdir`.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    binary: String,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            binary: "git".to_owned(),
        }
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn git(&self, args: &[String]) -> Result<ProcessOutput, GitError> {
        let out = process::run(&self.binary, args, Some(&self.workdir)).map_err(GitError::Spawn)?;
        if out.success {
            Ok(out)
        } else {
            Err(GitError::Command {
                args: args.join(" "),
                stderr: out.stderr.trim().to_owned(),
            })
        }
    }

    /// Object name for `git show`: paths relative to the working directory use the
    /// `./` form so Git resolves them against the current directory rather
    /// than the repository root.
    fn object_spec(&self, rev: &str, path: &Path) -> String {
        let rel = path.strip_prefix(&self.workdir).unwrap_or(path);
        let rel = normalize(rel);
        if rel.is_absolute() {
            format!("{rev}:{}", rel.display())
        } else {
            format!("{rev}:./{}", rel.display())
        }
    }
}

impl GitBackend for GitCli {
    fn merge_base(&self, left: &str, right: &str) -> Result<String, GitError> {
        let args = vec!["merge-base".to_owned(), left.to_owned(), right.to_owned()];
        let out = self.git(&args).map_err(|e| GitError::MergeBase {
            left: left.to_owned(),
            right: right.to_owned(),
            reason: e.to_string(),
        })?;
        let base = out.stdout.trim().to_owned();
        if base.is_empty() {
            return Err(GitError::MergeBase {
                left: left.to_owned(),
                right: right.to_owned(),
                reason: "no common ancestor".to_owned(),
            });
        }
        debug!("merge base of {left} and {right} is {base}");
        Ok(base)
    }

    fn changed_files(&self, rev: &str, paths: &[PathBuf]) -> Result<Vec<PathBuf>, GitError> {
        let mut args = vec![
            "diff".to_owned(),
            "--find-renames".to_owned(),
            "--name-only".to_owned(),
            "--relative".to_owned(),
            rev.to_owned(),
            "--".to_owned(),
        ];
        args.extend(paths.iter().map(|p| p.display().to_string()));
        let out = self.git(&args)?;
        Ok(out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn show(&self, rev: &str, path: &Path) -> Result<Vec<u8>, GitError> {
        let args = vec!["show".to_owned(), self.object_spec(rev, path)];
        self.git(&args).map(|out| out.stdout.into_bytes())
    }
}

/// Changed files under `paths` whose base name equals `file_name`.
pub fn changed_manifests(
    git: &dyn GitBackend,
    rev: &str,
    paths: &[PathBuf],
    file_name: &str,
) -> Result<Vec<PathBuf>, GitError> {
    Ok(git
        .changed_files(rev, paths)?
        .into_iter()
        .filter(|p| p.file_name().is_some_and(|n| n == file_name))
        .collect())
}

/// Drop `.` components and trailing separators so `./packages/` and
/// `packages` compare equal component-wise.
pub fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
