use super::{json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use std::path::Path;
use zt_core::process::{self, command_exists};
use zt_core::Configuration;

/// Check the tools and configuration zt depends on.
pub fn run(config: Option<&Path>, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_git(&mut checks, &mut all_pass);
    check_tool(
        &mut checks,
        "zarf",
        &["version"],
        "zarf not found: lint falls back to basic validation and install is unavailable",
    );
    check_tool(
        &mut checks,
        "kubectl",
        &["version", "--client"],
        "kubectl not found: install is unavailable",
    );
    check_config(config, &mut checks, &mut all_pass);

    print_results(&checks, all_pass, json_output)
}

fn first_line(output: &str) -> &str {
    output.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

fn check_git(checks: &mut Vec<Check>, all_pass: &mut bool) {
    if !command_exists("git") {
        *all_pass = false;
        checks.push(Check::fail(
            "git",
            "git not found: change detection and version checks need it",
        ));
        return;
    }
    match process::run("git", ["--version"], None) {
        Ok(out) => checks.push(Check::pass("git", first_line(&out.stdout))),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("git", &format!("git failed to run: {e}")));
            return;
        }
    }

    match process::run("git", ["rev-parse", "--is-inside-work-tree"], None) {
        Ok(out) if out.success => {
            checks.push(Check::pass("git_repository", "Inside a git work tree"));
        }
        _ => checks.push(Check::warn(
            "git_repository",
            "Not inside a git work tree: only --all and --packages will work",
        )),
    }
}

fn check_tool(checks: &mut Vec<Check>, tool: &str, args: &[&str], missing: &str) {
    if !command_exists(tool) {
        checks.push(Check::warn(tool, missing));
        return;
    }
    match process::run(tool, args, None) {
        Ok(out) if out.success => {
            let line = first_line(&out.stdout);
            let message = if line.is_empty() {
                format!("{tool} available")
            } else {
                format!("{tool} {line}")
            };
            checks.push(Check::pass(tool, &message));
        }
        Ok(out) => checks.push(Check::warn(
            tool,
            &format!("{tool} exited with an error: {}", first_line(&out.combined())),
        )),
        Err(e) => checks.push(Check::warn(tool, &format!("{tool} failed to run: {e}"))),
    }
}

fn check_config(config: Option<&Path>, checks: &mut Vec<Check>, all_pass: &mut bool) {
    match Configuration::load(config) {
        Ok(cfg) => match &cfg.source {
            Some(path) => checks.push(Check::pass(
                "config",
                &format!("Configuration loaded from {}", path.display()),
            )),
            None => checks.push(Check::info(
                "config",
                "No configuration file found, using defaults",
            )),
        },
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("config", &format!("config error: {e}")));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&json)?);
    } else {
        println!("zt doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All required checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: String,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &str, status: &'static str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
