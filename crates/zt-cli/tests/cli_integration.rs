//! CLI subprocess integration tests.
//!
//! These tests run the `zt` binary with an empty `PATH`, so `zarf` is never
//! found and validation always takes the basic fallback path.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

struct Workspace {
    dir: tempfile::TempDir,
    bin_dir: tempfile::TempDir,
    config_dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            bin_dir: tempfile::tempdir().unwrap(),
            config_dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn package(&self, name: &str, manifest: &str) -> PathBuf {
        let dir = self.path().join("packages").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("zarf.yaml"), manifest).unwrap();
        dir
    }

    fn zt(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_zt"));
        cmd.env_clear()
            .env("PATH", self.bin_dir.path())
            .env("HOME", self.path())
            .env("ZT_CONFIG_DIR", self.config_dir.path())
            .current_dir(self.path());
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.zt().args(args).output().unwrap()
    }
}

fn valid_manifest(name: &str) -> String {
    format!(
        r"kind: ZarfPackageConfig
metadata:
  name: {name}
  version: 1.0.0
  description: Test package
components:
  - name: {name}
    required: true
    images:
      - ghcr.io/example/{name}@sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef
"
    )
}

const DUPLICATE_COMPONENTS: &str = r"kind: ZarfPackageConfig
metadata:
  name: broken
  version: 1.0.0
  description: Duplicate components
components:
  - name: api
    images:
      - ghcr.io/example/api@sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef
  - name: api
    images:
      - ghcr.io/example/api@sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef
";

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn cli_version_exits_zero() {
    let ws = Workspace::new();
    let out = ws.run(&["--version"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("zt"), "{}", stdout(&out));
}

#[test]
fn cli_help_lists_commands() {
    let ws = Workspace::new();
    let out = ws.run(&["--help"]);
    assert!(out.status.success());
    let text = stdout(&out);
    for cmd in ["lint", "install", "lint-and-install", "list-changed", "doctor"] {
        assert!(text.contains(cmd), "help must list '{cmd}': {text}");
    }
}

#[test]
fn lint_all_valid_packages_passes() {
    let ws = Workspace::new();
    ws.package("web", &valid_manifest("web"));
    ws.package("db", &valid_manifest("db"));

    let out = ws.run(&["--no-color", "lint", "--all"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("==> Linting packages/db"), "{text}");
    assert!(text.contains("==> Linting packages/web"), "{text}");
    assert!(text.contains("falling back to basic validation"), "{text}");
    assert!(text.contains("2 passed, 0 failed"), "{text}");
}

#[test]
fn lint_json_reports_failures() {
    let ws = Workspace::new();
    ws.package("web", &valid_manifest("web"));
    ws.package("broken", DUPLICATE_COMPONENTS);

    let out = ws.run(&["--output", "json", "lint", "--all"]);
    assert_eq!(out.status.code(), Some(1), "stderr: {}", stderr(&out));
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["lint"]["summary"]["packages"], 2);
    assert_eq!(doc["lint"]["summary"]["failed"], 1);
    let broken = doc["lint"]["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["valid"] == false)
        .unwrap();
    assert!(broken["package_path"].as_str().unwrap().ends_with("broken"));
    assert!(broken["errors"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("Duplicate component name: api")));
}

#[test]
fn lint_github_output_annotates() {
    let ws = Workspace::new();
    ws.package("broken", DUPLICATE_COMPONENTS);

    let out = ws.run(&["--output", "github", "--github-groups", "lint", "--all"]);
    assert_eq!(out.status.code(), Some(1));
    let text = stdout(&out);
    assert!(text.contains("::group::Linting packages/broken"), "{text}");
    assert!(
        text.contains("::error file=packages/broken/zarf.yaml::Duplicate component name: api"),
        "{text}"
    );
    assert!(text.contains("::endgroup::"), "{text}");
}

#[test]
fn excluded_packages_are_skipped() {
    let ws = Workspace::new();
    ws.package("web", &valid_manifest("web"));
    ws.package("broken", DUPLICATE_COMPONENTS);

    let out = ws.run(&["--no-color", "lint", "--all", "--excluded-packages", "broken"]);
    assert_eq!(out.status.code(), Some(0), "stdout: {}", stdout(&out));
    assert!(!stdout(&out).contains("packages/broken"));
}

#[test]
fn environment_sets_package_dirs() {
    let ws = Workspace::new();
    let dir = ws.path().join("charts").join("svc");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("zarf.yaml"), valid_manifest("svc")).unwrap();

    let out = ws
        .zt()
        .env("ZT_ZARF_DIRS", "charts")
        .args(["--no-color", "lint", "--all"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("==> Linting charts/svc"));
}

#[test]
fn config_file_is_honored() {
    let ws = Workspace::new();
    ws.package("web", &valid_manifest("web"));
    ws.package("broken", DUPLICATE_COMPONENTS);
    let config = ws.path().join("custom.yaml");
    std::fs::write(&config, "excluded-packages:\n  - broken\nall: true\n").unwrap();

    let out = ws.run(&["--no-color", "--config", config.to_str().unwrap(), "lint"]);
    assert_eq!(out.status.code(), Some(0), "stdout: {}", stdout(&out));
    assert!(stdout(&out).contains("1 passed, 0 failed"));
}

#[test]
fn print_config_goes_to_stderr() {
    let ws = Workspace::new();
    ws.package("web", &valid_manifest("web"));

    let out = ws.run(&["--print-config", "--output", "json", "lint", "--all"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(stderr(&out).contains("target-branch: main"), "{}", stderr(&out));
    serde_json::from_str::<serde_json::Value>(&stdout(&out)).unwrap();
}

#[test]
fn all_with_packages_is_a_config_error() {
    let ws = Workspace::new();
    let web = ws.package("web", &valid_manifest("web"));

    let out = ws.run(&["lint", "--all", "--packages", web.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("config error:"), "{}", stderr(&out));
}

#[test]
fn bad_environment_value_is_a_config_error() {
    let ws = Workspace::new();
    let out = ws
        .zt()
        .env("ZT_ALL", "sometimes")
        .args(["lint"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4), "{}", stderr(&out));
}

#[test]
fn missing_explicit_package_fails() {
    let ws = Workspace::new();
    let out = ws.run(&["lint", "--packages", "packages/nope"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("does not contain a valid Zarf package"),
        "{}",
        stderr(&out)
    );
}

#[test]
fn unparsable_manifest_is_a_manifest_error() {
    let ws = Workspace::new();
    let dir = ws.package("bad", "kind: [unclosed\n");

    let out = ws.run(&["lint", "--packages", dir.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2), "{}", stderr(&out));
    assert!(stderr(&out).contains("manifest error:"));
}

#[test]
fn list_changed_without_git_is_a_git_error() {
    let ws = Workspace::new();
    ws.package("web", &valid_manifest("web"));

    let out = ws.run(&["lsc"]);
    assert_eq!(out.status.code(), Some(3), "{}", stderr(&out));
    assert!(stderr(&out).contains("git error:"));
}

#[test]
fn install_without_tools_fails() {
    let ws = Workspace::new();
    let web = ws.package("web", &valid_manifest("web"));

    let out = ws.run(&["install", "--packages", web.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("kubectl not available"), "{}", stderr(&out));
}

#[test]
fn upgrade_requires_remote() {
    let ws = Workspace::new();
    let out = ws.run(&["install", "--upgrade", "--remote", ""]);
    assert_eq!(out.status.code(), Some(4), "{}", stderr(&out));
}

#[test]
fn doctor_json_reports_checks() {
    let ws = Workspace::new();
    let out = ws.run(&["--output", "json", "doctor"]);
    let doc: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["healthy"], false);
    let names: Vec<&str> = doc["checks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"git"));
    assert!(names.contains(&"config"));
}

#[test]
fn completions_bash() {
    let ws = Workspace::new();
    let out = ws.run(&["completions", "bash"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("zt"));
}

#[test]
fn man_pages_written() {
    let ws = Workspace::new();
    let dir = ws.path().join("man");
    let out = ws.run(&["man-pages", dir.to_str().unwrap()]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(dir.join("zt.1").exists());
    assert!(dir.join("zt-lint.1").exists());
    assert!(dir.join("zt-list-changed.1").exists());
}
