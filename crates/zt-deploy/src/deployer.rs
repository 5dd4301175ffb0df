use crate::namespace::{test_namespace, unique_suffix, DEFAULT_PREFIX};
use crate::runner::{CommandRunner, SystemRunner};
use crate::DeployError;
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use zt_core::process::{split_args, ProcessOutput};
use zt_core::Configuration;
use zt_schema::{is_package_dir, ZarfPackage};

const PACKAGE_PREFIX: &str = "zarf-package-";
const PACKAGE_SUFFIX: &str = ".tar.zst";
const CONNECTIVITY_CHECK: &str = "basic-connectivity";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub namespace_prefix: String,
    pub timeout: Duration,
    /// Passed to cluster-facing `kubectl` calls as `--request-timeout`.
    pub kubectl_timeout: Duration,
    pub skip_cleanup: bool,
    pub build_extra_args: Vec<String>,
    pub deploy_extra_args: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: DEFAULT_PREFIX.to_owned(),
            timeout: Duration::from_secs(600),
            kubectl_timeout: Duration::from_secs(30),
            skip_cleanup: false,
            build_extra_args: Vec::new(),
            deploy_extra_args: Vec::new(),
        }
    }
}

impl DeployConfig {
    pub fn from_configuration(cfg: &Configuration) -> Self {
        Self {
            namespace_prefix: if cfg.namespace.is_empty() {
                DEFAULT_PREFIX.to_owned()
            } else {
                cfg.namespace.clone()
            },
            timeout: cfg.deployment_timeout,
            kubectl_timeout: cfg.kubectl_timeout,
            skip_cleanup: cfg.skip_clean_up,
            build_extra_args: split_args(&cfg.zarf_build_extra_args),
            deploy_extra_args: split_args(&cfg.zarf_deploy_extra_args),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentTestResult {
    pub component_name: String,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentResult {
    pub package_path: PathBuf,
    pub success: bool,
    #[serde(rename = "deploy_time_seconds", serialize_with = "as_secs_f64")]
    pub deploy_time: Duration,
    pub namespace: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub component_tests: Vec<ComponentTestResult>,
}

fn as_secs_f64<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl DeploymentResult {
    fn new(package_path: &Path) -> Self {
        Self {
            package_path: package_path.to_path_buf(),
            success: false,
            deploy_time: Duration::ZERO,
            namespace: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            component_tests: Vec::new(),
        }
    }
}

pub fn has_deployment_errors(results: &[DeploymentResult]) -> bool {
    results.iter().any(|r| !r.success)
}

pub struct Deployer<R: CommandRunner = SystemRunner> {
    runner: R,
    config: DeployConfig,
}

impl Deployer<SystemRunner> {
    pub fn new(config: DeployConfig) -> Result<Self, DeployError> {
        Self::with_runner(SystemRunner, config)
    }
}

impl<R: CommandRunner> Deployer<R> {
    /// Verifies that `kubectl` and `zarf` can be invoked.
    pub fn with_runner(runner: R, config: DeployConfig) -> Result<Self, DeployError> {
        runner
            .run_checked("kubectl", &args(&["version", "--client"]), None)
            .map_err(|reason| DeployError::ToolUnavailable {
                tool: "kubectl",
                reason,
            })?;
        runner
            .run_checked("zarf", &args(&["version"]), None)
            .map_err(|reason| DeployError::ToolUnavailable {
                tool: "zarf CLI",
                reason,
            })?;
        Ok(Self { runner, config })
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Build, deploy, smoke-test and (unless skipped) remove one package.
    /// Every failure is recorded in the result.
    pub fn test_package(&self, dir: &Path) -> DeploymentResult {
        let start = Instant::now();
        let mut result = DeploymentResult::new(dir);
        self.run_stages(dir, &mut result);
        result.deploy_time = start.elapsed();
        result.success = result.errors.is_empty();
        info!(
            "deployment of {} {} in {:.1}s",
            dir.display(),
            if result.success { "passed" } else { "failed" },
            result.deploy_time.as_secs_f64()
        );
        result
    }

    fn run_stages(&self, dir: &Path, result: &mut DeploymentResult) {
        if !is_package_dir(dir) {
            result
                .errors
                .push("Directory does not contain a zarf.yaml file".to_owned());
            return;
        }
        let pkg = match ZarfPackage::load(dir) {
            Ok(pkg) => pkg,
            Err(e) => {
                result.errors.push(format!("Failed to read zarf.yaml: {e}"));
                return;
            }
        };

        if self.runner.run_checked("zarf", &args(&["version"]), None).is_err() {
            result.errors.push(
                "Zarf CLI not found - please install Zarf CLI for deployment testing".to_owned(),
            );
            return;
        }
        if let Err(e) = self.kubectl(&["cluster-info"]) {
            result
                .errors
                .push(format!("Kubernetes connection failed: {e}"));
            return;
        }

        let namespace = test_namespace(
            &self.config.namespace_prefix,
            &chrono::Local::now(),
            &unique_suffix(&dir.display().to_string()),
        );
        debug!("test namespace for {} is {namespace}", pkg.name);
        result.namespace = Some(namespace);

        let tarball = match self.build(dir) {
            Ok(path) => path,
            Err(e) => {
                result.errors.push(format!("Failed to build package: {e}"));
                return;
            }
        };
        if let Err(e) = self.deploy(&tarball) {
            result.errors.push(format!("Failed to deploy package: {e}"));
            return;
        }

        result.component_tests = self.smoke_test(&pkg);
        for test in result.component_tests.iter().filter(|t| !t.success) {
            result.errors.push(format!(
                "Deployment testing failed: {}: {}",
                test.component_name, test.message
            ));
        }

        if self.config.skip_cleanup {
            info!("skipping cleanup of {}", pkg.name);
        } else if let Err(e) = self.remove(&pkg.name) {
            warn!("cleanup of {} failed: {e}", pkg.name);
            result.warnings.push(format!("Cleanup failed: {e}"));
        }
    }

    fn build(&self, dir: &Path) -> Result<PathBuf, String> {
        let mut argv = args(&["package", "create", ".", "--confirm"]);
        argv.extend(self.config.build_extra_args.iter().cloned());
        self.runner.run_checked("zarf", &argv, Some(dir))?;
        find_package_archive(dir)
    }

    fn deploy(&self, tarball: &Path) -> Result<(), String> {
        let mut argv = args(&["package", "deploy"]);
        argv.push(tarball.display().to_string());
        argv.push("--confirm".to_owned());
        argv.push("--timeout".to_owned());
        argv.push(format!("{}s", self.config.timeout.as_secs()));
        argv.extend(self.config.deploy_extra_args.iter().cloned());
        self.runner.run_checked("zarf", &argv, None).map(|_| ())
    }

    fn smoke_test(&self, pkg: &ZarfPackage) -> Vec<ComponentTestResult> {
        let connectivity = match self.kubectl(&["get", "pods", "--all-namespaces"]) {
            Ok(_) => ComponentTestResult {
                component_name: CONNECTIVITY_CHECK.to_owned(),
                success: true,
                message: "Successfully connected to cluster and retrieved pod information"
                    .to_owned(),
            },
            Err(e) => ComponentTestResult {
                component_name: CONNECTIVITY_CHECK.to_owned(),
                success: false,
                message: format!("Failed to get pods: {e}"),
            },
        };
        vec![
            connectivity,
            ComponentTestResult {
                component_name: format!("package-{}", pkg.name),
                success: true,
                message: "Package metadata loaded successfully".to_owned(),
            },
        ]
    }

    fn kubectl(&self, list: &[&str]) -> Result<ProcessOutput, String> {
        let mut argv = args(list);
        argv.push(format!("--request-timeout={}s", self.config.kubectl_timeout.as_secs()));
        self.runner.run_checked("kubectl", &argv, None)
    }

    fn remove(&self, name: &str) -> Result<(), String> {
        let argv = args(&["package", "remove", name, "--confirm"]);
        self.runner.run_checked("zarf", &argv, None).map(|_| ())
    }

    /// Test packages in order. Stops after the first failure unless cleanup
    /// is skipped, and before any package once `stop` returns true.
    pub fn deploy_many(&self, packages: &[PathBuf], stop: impl Fn() -> bool) -> Vec<DeploymentResult> {
        let mut results = Vec::with_capacity(packages.len());
        for dir in packages {
            if stop() {
                warn!("shutdown requested, not deploying remaining packages");
                break;
            }
            let result = self.test_package(dir);
            let failed = !result.success;
            results.push(result);
            if failed && !self.config.skip_cleanup {
                break;
            }
        }
        results
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

/// The archive `zarf package create` leaves in the package directory. When
/// several exist the most recently modified wins.
pub fn find_package_archive(dir: &Path) -> Result<PathBuf, String> {
    let entries =
        fs::read_dir(dir).map_err(|e| format!("failed to read package directory: {e}"))?;
    entries
        .filter_map(Result::ok)
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with(PACKAGE_PREFIX) && name.ends_with(PACKAGE_SUFFIX)
        })
        .max_by_key(|e| e.metadata().and_then(|m| m.modified()).ok())
        .map(|e| e.path())
        .ok_or_else(|| "no zarf package file found after build".to_owned())
}
