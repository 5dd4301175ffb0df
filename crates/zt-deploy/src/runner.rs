use std::io;
use std::path::Path;
use zt_core::process::{self, ProcessOutput};

pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String], dir: Option<&Path>) -> io::Result<ProcessOutput>;

    /// Like [`run`](Self::run), but a non-zero exit becomes an error message
    /// carrying the last line the tool printed.
    fn run_checked(
        &self,
        program: &str,
        args: &[String],
        dir: Option<&Path>,
    ) -> Result<ProcessOutput, String> {
        let out = self
            .run(program, args, dir)
            .map_err(|e| format!("failed to run {program}: {e}"))?;
        if out.success {
            return Ok(out);
        }
        let combined = out.combined();
        let detail = combined
            .lines()
            .map(str::trim)
            .rfind(|l| !l.is_empty())
            .unwrap_or("no output");
        let code = out
            .code
            .map_or_else(|| "a signal".to_owned(), |c| c.to_string());
        Err(format!(
            "{program} {} exited with {code}: {detail}",
            args.join(" ")
        ))
    }
}

/// Runs real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], dir: Option<&Path>) -> io::Result<ProcessOutput> {
        process::run(program, args, dir)
    }
}
