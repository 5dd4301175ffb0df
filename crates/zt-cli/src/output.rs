//! Rendering of validation and deployment results.
//!
//! Every renderer returns the full text so commands decide where it goes.

use crate::commands::json_pretty;
use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use console::Style;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use zt_core::{summarize, Summary, ValidationResult};
use zt_deploy::DeploymentResult;
use zt_schema::manifest_path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored when the terminal supports it.
    #[default]
    Text,
    /// A single JSON document.
    Json,
    /// GitHub Actions workflow commands.
    Github,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeploySummary {
    pub packages: usize,
    pub passed: usize,
    pub failed: usize,
}

pub fn summarize_deployments(results: &[DeploymentResult]) -> DeploySummary {
    let passed = results.iter().filter(|r| r.success).count();
    DeploySummary {
        packages: results.len(),
        passed,
        failed: results.len() - passed,
    }
}

#[derive(Serialize)]
struct LintSection<'a> {
    results: &'a [ValidationResult],
    summary: Summary,
}

#[derive(Serialize)]
struct InstallSection<'a> {
    results: &'a [DeploymentResult],
    summary: DeploySummary,
}

#[derive(Serialize)]
struct Document<'a> {
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lint: Option<LintSection<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    install: Option<InstallSection<'a>>,
}

impl<'a> Document<'a> {
    fn new(lint: Option<&'a [ValidationResult]>, install: Option<&'a [DeploymentResult]>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            lint: lint.map(|results| LintSection {
                results,
                summary: summarize(results),
            }),
            install: install.map(|results| InstallSection {
                results,
                summary: summarize_deployments(results),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Printer {
    format: OutputFormat,
    github_groups: bool,
}

impl Printer {
    pub fn new(format: OutputFormat, no_color: bool, github_groups: bool) -> Self {
        if no_color || format != OutputFormat::Text {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }
        Self {
            format,
            github_groups,
        }
    }

    /// Spinners and other progress only make sense for text output.
    pub fn shows_progress(&self) -> bool {
        self.format == OutputFormat::Text
    }

    pub fn validation_report(&self, results: &[ValidationResult]) -> Result<String, String> {
        match self.format {
            OutputFormat::Json => json_pretty(&Document::new(Some(results), None)),
            OutputFormat::Text => Ok(text_validation(results)),
            OutputFormat::Github => Ok(github_validation(results, self.github_groups)),
        }
    }

    pub fn deployment_report(&self, results: &[DeploymentResult]) -> Result<String, String> {
        match self.format {
            OutputFormat::Json => json_pretty(&Document::new(None, Some(results))),
            OutputFormat::Text => Ok(text_deployment(results)),
            OutputFormat::Github => Ok(github_deployment(results, self.github_groups)),
        }
    }

    /// Lint results followed by install results. JSON mode emits one
    /// document holding both.
    pub fn combined_report(
        &self,
        lint: &[ValidationResult],
        install: &[DeploymentResult],
    ) -> Result<String, String> {
        if self.format == OutputFormat::Json {
            return json_pretty(&Document::new(Some(lint), Some(install)));
        }
        let mut out = self.validation_report(lint)?;
        out.push_str(&self.deployment_report(install)?);
        Ok(out)
    }

    pub fn package_list(&self, packages: &[PathBuf]) -> Result<String, String> {
        if self.format == OutputFormat::Json {
            let listed: Vec<String> = packages.iter().map(|p| p.display().to_string()).collect();
            return json_pretty(&serde_json::json!({ "packages": listed }));
        }
        Ok(packages
            .iter()
            .fold(String::new(), |mut out, p| {
                let _ = writeln!(out, "{}", p.display());
                out
            }))
    }

    /// A one-line note, such as "No changed packages found". JSON output
    /// still gets a document so consumers can always parse stdout.
    pub fn notice(&self, message: &str) -> Result<String, String> {
        match self.format {
            OutputFormat::Json => json_pretty(&serde_json::json!({
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                "message": message,
            })),
            OutputFormat::Github => Ok(format!("::notice::{}\n", escape_data(message))),
            OutputFormat::Text => Ok(format!("{message}\n")),
        }
    }
}

fn text_messages(out: &mut String, header: &str, style: &Style, messages: &[String]) {
    if messages.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}", style.apply_to(header));
    for m in messages {
        let _ = writeln!(out, "  - {m}");
    }
}

fn text_validation(results: &[ValidationResult]) -> String {
    let bold = Style::new().bold();
    let red = Style::new().red().bold();
    let yellow = Style::new().yellow().bold();
    let green = Style::new().green();

    let mut out = String::new();
    for r in results {
        let _ = writeln!(out, "\n{}", bold.apply_to(format!("==> Linting {}", r.package_path.display())));
        text_messages(&mut out, "[ERROR] Validation failed:", &red, &r.errors);
        text_messages(&mut out, "[WARNING] Issues found:", &yellow, &r.warnings);
        let verdict = if !r.valid {
            red.apply_to("✗ Package validation failed".to_owned())
        } else if r.warnings.is_empty() {
            green.apply_to("✓ Package validation successful".to_owned())
        } else {
            green.apply_to("✓ Package validation successful (with warnings)".to_owned())
        };
        let _ = writeln!(out, "{verdict}");
    }

    let s = summarize(results);
    let _ = writeln!(
        out,
        "\nLinted {} package(s): {} passed, {} failed ({} error(s), {} warning(s))",
        s.packages, s.passed, s.failed, s.errors, s.warnings
    );
    out
}

fn text_deployment(results: &[DeploymentResult]) -> String {
    let bold = Style::new().bold();
    let red = Style::new().red().bold();
    let yellow = Style::new().yellow().bold();
    let green = Style::new().green();
    let cyan = Style::new().cyan();

    let mut out = String::new();
    for r in results {
        let _ = writeln!(out, "\n{}", bold.apply_to(format!("==> Deploying {}", r.package_path.display())));
        if let Some(ns) = &r.namespace {
            let _ = writeln!(out, "Namespace: {ns}");
        }
        text_messages(&mut out, "[ERROR] Deployment failed:", &red, &r.errors);
        text_messages(&mut out, "[WARNING] Issues found:", &yellow, &r.warnings);
        if !r.component_tests.is_empty() {
            let _ = writeln!(out, "{}", cyan.apply_to("Component test results:"));
            for t in &r.component_tests {
                let status = if t.success {
                    green.apply_to("PASS")
                } else {
                    red.apply_to("FAIL")
                };
                let _ = writeln!(out, "  - {}: {status} - {}", t.component_name, t.message);
            }
        }
        let secs = r.deploy_time.as_secs_f64();
        if r.success {
            let _ = writeln!(out, "{}", green.apply_to(format!("✓ Package deployed successfully in {secs:.1}s")));
        } else {
            let _ = writeln!(out, "{}", red.apply_to(format!("✗ Package deployment failed after {secs:.1}s")));
        }
    }

    let s = summarize_deployments(results);
    let _ = writeln!(
        out,
        "\nDeployed {} package(s): {} passed, {} failed",
        s.packages, s.passed, s.failed
    );
    out
}

fn github_section(out: &mut String, groups: bool, title: &str) {
    if groups {
        let _ = writeln!(out, "::group::{}", escape_data(title));
    } else {
        let _ = writeln!(out, "==> {title}");
    }
}

fn github_annotations(out: &mut String, file: &Path, errors: &[String], warnings: &[String]) {
    let file = escape_property(&file.display().to_string());
    for e in errors {
        let _ = writeln!(out, "::error file={file}::{}", escape_data(e));
    }
    for w in warnings {
        let _ = writeln!(out, "::warning file={file}::{}", escape_data(w));
    }
}

fn github_validation(results: &[ValidationResult], groups: bool) -> String {
    let mut out = String::new();
    for r in results {
        github_section(&mut out, groups, &format!("Linting {}", r.package_path.display()));
        github_annotations(&mut out, &manifest_path(&r.package_path), &r.errors, &r.warnings);
        let verdict = if r.valid { "passed" } else { "failed" };
        let _ = writeln!(out, "Package validation {verdict}");
        if groups {
            out.push_str("::endgroup::\n");
        }
    }
    let s = summarize(results);
    let _ = writeln!(
        out,
        "Linted {} package(s): {} passed, {} failed",
        s.packages, s.passed, s.failed
    );
    out
}

fn github_deployment(results: &[DeploymentResult], groups: bool) -> String {
    let mut out = String::new();
    for r in results {
        github_section(&mut out, groups, &format!("Deploying {}", r.package_path.display()));
        github_annotations(&mut out, &manifest_path(&r.package_path), &r.errors, &r.warnings);
        for t in &r.component_tests {
            let status = if t.success { "PASS" } else { "FAIL" };
            let _ = writeln!(out, "{}: {status} - {}", t.component_name, t.message);
        }
        let verdict = if r.success { "succeeded" } else { "failed" };
        let _ = writeln!(out, "Package deployment {verdict}");
        if groups {
            out.push_str("::endgroup::\n");
        }
    }
    let s = summarize_deployments(results);
    let _ = writeln!(
        out,
        "Deployed {} package(s): {} passed, {} failed",
        s.packages, s.passed, s.failed
    );
    out
}

/// Workflow command message escaping.
fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// Workflow command property escaping.
fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}
