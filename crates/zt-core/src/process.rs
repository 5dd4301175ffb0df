//! Thin wrapper over `std::process::Command` for the external tools zt drives
//! (`git`, `zarf`, `kubectl`). Every invocation is logged at debug level so
//! `--verbose` shows the exact command lines.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Stdout followed by stderr, the way a terminal would interleave them
    /// for tools that write progress to stderr.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => {
                let mut out = self.stdout.clone();
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&self.stderr);
                out
            }
        }
    }
}

fn render<I, S>(program: &str, args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut line = program.to_owned();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.as_ref().to_string_lossy());
    }
    line
}

/// Run `program` to completion and capture its output. Fails only if the
/// process could not be spawned.
pub fn run<I, S>(program: &str, args: I, dir: Option<&Path>) -> io::Result<ProcessOutput>
where
    I: IntoIterator<Item = S> + Clone,
    S: AsRef<OsStr>,
{
    match dir {
        Some(d) => debug!("exec [{}]: {}", d.display(), render(program, args.clone())),
        None => debug!("exec: {}", render(program, args.clone())),
    }

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(d) = dir {
        cmd.current_dir(d);
    }
    let output = cmd.output()?;

    Ok(ProcessOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// True if `name` resolves on `PATH`.
pub fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Split a user-supplied extra-arguments string (`--flag value --other`).
pub fn split_args(extra: &str) -> Vec<String> {
    extra.split_whitespace().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_joins_streams() {
        let out = ProcessOutput {
            success: true,
            code: Some(0),
            stdout: "a".to_owned(),
            stderr: "b\n".to_owned(),
        };
        assert_eq!(out.combined(), "a\nb\n");
    }

    #[test]
    fn combined_single_stream() {
        let out = ProcessOutput {
            stderr: "only err".to_owned(),
            ..ProcessOutput::default()
        };
        assert_eq!(out.combined(), "only err");
    }

    #[test]
    fn render_command_line() {
        assert_eq!(render("git", ["show", "HEAD:zarf.yaml"]), "git show HEAD:zarf.yaml");
    }

    #[test]
    fn split_args_ignores_extra_whitespace() {
        assert_eq!(split_args("  --a  b "), vec!["--a".to_owned(), "b".to_owned()]);
        assert!(split_args("").is_empty());
    }

    #[test]
    fn run_missing_binary_is_spawn_error() {
        let result = run("zt-definitely-not-a-real-binary", ["--version"], None);
        assert!(result.is_err());
    }
}
