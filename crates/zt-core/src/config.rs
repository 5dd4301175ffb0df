//! Layered configuration: built-in defaults, then a config file, then `ZT_`
//! environment variables. Command-line flags are applied on top by the CLI,
//! after which [`Configuration::finalize`] enforces the cross-field rules.

use crate::validate::ValidationOptions;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_PREFIX: &str = "ZT_";
pub const CONFIG_DIR_ENV: &str = "ZT_CONFIG_DIR";
const CONFIG_NAMES: &[&str] = &["zt.yaml", "zt.yml", "zt.toml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed loading config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid TOML in config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unsupported config file format: {0} (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(PathBuf),
    #[error("invalid value '{value}' for {key}: {reason}")]
    Env {
        key: String,
        value: String,
        reason: String,
    },
    #[error("invalid duration '{0}' (expected seconds or a value like 30s, 10m, 1h)")]
    Duration(String),
    #[error("{0}")]
    Conflict(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    pub remote: String,
    pub target_branch: String,
    pub zarf_dirs: Vec<PathBuf>,
    pub excluded_packages: Vec<String>,
    pub packages: Vec<PathBuf>,
    pub all: bool,

    pub check_version_increment: bool,
    pub validate_image_pinning: bool,
    pub validate_components: bool,
    pub validate_security: bool,
    pub exclude_deprecated: bool,

    pub zarf_lint_extra_args: String,
    pub zarf_build_extra_args: String,
    pub zarf_deploy_extra_args: String,

    pub upgrade: bool,
    pub skip_clean_up: bool,
    pub namespace: String,
    #[serde(with = "duration_secs")]
    pub deployment_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub kubectl_timeout: Duration,

    pub github_groups: bool,
    pub debug: bool,

    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            remote: "origin".to_owned(),
            target_branch: "main".to_owned(),
            zarf_dirs: vec![PathBuf::from("packages")],
            excluded_packages: Vec::new(),
            packages: Vec::new(),
            all: false,
            check_version_increment: true,
            validate_image_pinning: true,
            validate_components: true,
            validate_security: true,
            exclude_deprecated: false,
            zarf_lint_extra_args: String::new(),
            zarf_build_extra_args: String::new(),
            zarf_deploy_extra_args: String::new(),
            upgrade: false,
            skip_clean_up: false,
            namespace: String::new(),
            deployment_timeout: Duration::from_secs(600),
            kubectl_timeout: Duration::from_secs(30),
            github_groups: false,
            debug: false,
            source: None,
        }
    }
}

impl Configuration {
    /// Defaults, overlaid with the first config file found and the process
    /// environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config_dir = std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from);
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(config_dir.as_deref(), home.as_deref()),
        };

        let mut cfg = match file {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("no config file found, using defaults");
                Self::default()
            }
        };
        cfg.apply_env(std::env::vars())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let mut cfg: Self = match ext {
            "yaml" | "yml" => {
                // An empty YAML file is a null document.
                if content.trim().is_empty() {
                    Self::default()
                } else {
                    serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                        path: path.to_path_buf(),
                        source,
                    })?
                }
            }
            "toml" => toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        debug!("loaded config file {}", path.display());
        cfg.source = Some(path.to_path_buf());
        Ok(cfg)
    }

    /// Apply `ZT_*` variables. Keys are the kebab-case field names
    /// upper-cased with `-` replaced by `_`; lists are comma separated.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let field = name.to_ascii_lowercase().replace('_', "-");
            let bad = |reason: &str| ConfigError::Env {
                key: key.clone(),
                value: value.clone(),
                reason: reason.to_owned(),
            };
            match field.as_str() {
                "remote" => self.remote.clone_from(&value),
                "target-branch" => self.target_branch.clone_from(&value),
                "zarf-dirs" => self.zarf_dirs = split_list(&value).map(PathBuf::from).collect(),
                "excluded-packages" => {
                    self.excluded_packages = split_list(&value).map(str::to_owned).collect();
                }
                "packages" => self.packages = split_list(&value).map(PathBuf::from).collect(),
                "all" => self.all = parse_bool(&value).ok_or_else(|| bad("expected a boolean"))?,
                "check-version-increment" => {
                    self.check_version_increment =
                        parse_bool(&value).ok_or_else(|| bad("expected a boolean"))?;
                }
                "validate-image-pinning" => {
                    self.validate_image_pinning =
                        parse_bool(&value).ok_or_else(|| bad("expected a boolean"))?;
                }
                "validate-components" => {
                    self.validate_components =
                        parse_bool(&value).ok_or_else(|| bad("expected a boolean"))?;
                }
                "validate-security" => {
                    self.validate_security =
                        parse_bool(&value).ok_or_else(|| bad("expected a boolean"))?;
                }
                "exclude-deprecated" => {
                    self.exclude_deprecated =
                        parse_bool(&value).ok_or_else(|| bad("expected a boolean"))?;
                }
                "zarf-lint-extra-args" => self.zarf_lint_extra_args.clone_from(&value),
                "zarf-build-extra-args" => self.zarf_build_extra_args.clone_from(&value),
                "zarf-deploy-extra-args" => self.zarf_deploy_extra_args.clone_from(&value),
                "upgrade" => {
                    self.upgrade = parse_bool(&value).ok_or_else(|| bad("expected a boolean"))?;
                }
                "skip-clean-up" => {
                    self.skip_clean_up =
                        parse_bool(&value).ok_or_else(|| bad("expected a boolean"))?;
                }
                "namespace" => self.namespace.clone_from(&value),
                "deployment-timeout" => {
                    self.deployment_timeout =
                        parse_duration(&value).map_err(|e| bad(&e.to_string()))?;
                }
                "kubectl-timeout" => {
                    self.kubectl_timeout =
                        parse_duration(&value).map_err(|e| bad(&e.to_string()))?;
                }
                "github-groups" => {
                    self.github_groups =
                        parse_bool(&value).ok_or_else(|| bad("expected a boolean"))?;
                }
                "debug" => self.debug = parse_bool(&value).ok_or_else(|| bad("expected a boolean"))?,
                _ => continue,
            }
            debug!("config {field} set from {key}");
        }
        Ok(())
    }

    /// Enforce cross-field rules once every layer has been applied.
    /// `installing` is true for the commands that deploy packages.
    pub fn finalize(&mut self, installing: bool) -> Result<(), ConfigError> {
        if self.all && !self.packages.is_empty() {
            return Err(ConfigError::Conflict(
                "specifying both, '--all' and '--packages', is not allowed".to_owned(),
            ));
        }

        self.upgrade = installing && self.upgrade;
        if self.upgrade && (self.remote.is_empty() || self.target_branch.is_empty()) {
            return Err(ConfigError::Conflict(
                "specifying '--upgrade=true' without '--target-branch' or '--remote', is not allowed"
                    .to_owned(),
            ));
        }

        if self.explicit_selection() && self.check_version_increment {
            info!("version increment checking disabled for specific packages");
            self.check_version_increment = false;
        }
        Ok(())
    }

    /// True when packages are chosen with `--all` or `--packages` rather
    /// than by change detection.
    pub fn explicit_selection(&self) -> bool {
        self.all || !self.packages.is_empty()
    }

    pub fn validation_options(&self, baseline: Option<String>) -> ValidationOptions {
        ValidationOptions {
            check_version_increment: self.check_version_increment,
            validate_image_pinning: self.validate_image_pinning,
            validate_components: self.validate_components,
            validate_security: self.validate_security,
            baseline,
        }
    }

    /// Effective configuration as YAML, for `--print-config`.
    pub fn render(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_else(|e| format!("<unprintable: {e}>\n"))
    }
}

/// Directories searched for a config file, in order.
pub fn search_locations(config_dir: Option<&Path>, home: Option<&Path>) -> Vec<PathBuf> {
    if let Some(dir) = config_dir {
        return vec![dir.to_path_buf()];
    }
    let mut dirs = vec![PathBuf::from("."), PathBuf::from(".zt")];
    if let Some(home) = home {
        dirs.push(home.join(".zt"));
    }
    dirs.push(PathBuf::from("/etc/zt"));
    dirs
}

pub fn find_config_file(config_dir: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    search_locations(config_dir, home)
        .into_iter()
        .flat_map(|dir| CONFIG_NAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.is_file())
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Seconds, or a number with an `s`, `m` or `h` suffix.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let v = value.trim();
    let err = || ConfigError::Duration(value.to_owned());
    let (digits, scale) = match v.char_indices().last() {
        Some((i, 's')) => (&v[..i], 1),
        Some((i, 'm')) => (&v[..i], 60),
        Some((i, 'h')) => (&v[..i], 3600),
        Some(_) => (v, 1),
        None => return Err(err()),
    };
    let n: u64 = digits.trim().parse().map_err(|_| err())?;
    n.checked_mul(scale).map(Duration::from_secs).ok_or_else(err)
}

mod duration_secs {
    use super::{parse_duration, Deserialize, Deserializer, Duration, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Secs(n) => Ok(Duration::from_secs(n)),
            Raw::Text(t) => parse_duration(&t).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn defaults() {
        let cfg = Configuration::default();
        assert_eq!(cfg.remote, "origin");
        assert_eq!(cfg.target_branch, "main");
        assert_eq!(cfg.zarf_dirs, vec![PathBuf::from("packages")]);
        assert!(cfg.check_version_increment);
        assert_eq!(cfg.deployment_timeout, Duration::from_secs(600));
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zt.yaml");
        fs::write(
            &path,
            "target-branch: develop\nzarf-dirs: [pkgs, more]\ndeployment-timeout: 5m\nvalidate-security: false\n",
        )
        .unwrap();
        let cfg = Configuration::from_file(&path).unwrap();
        assert_eq!(cfg.target_branch, "develop");
        assert_eq!(cfg.remote, "origin");
        assert_eq!(cfg.zarf_dirs, vec![PathBuf::from("pkgs"), PathBuf::from("more")]);
        assert_eq!(cfg.deployment_timeout, Duration::from_secs(300));
        assert!(!cfg.validate_security);
        assert_eq!(cfg.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn toml_file_is_supported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zt.toml");
        fs::write(&path, "remote = \"upstream\"\nkubectl-timeout = 45\n").unwrap();
        let cfg = Configuration::from_file(&path).unwrap();
        assert_eq!(cfg.remote, "upstream");
        assert_eq!(cfg.kubectl_timeout, Duration::from_secs(45));
    }

    #[test]
    fn empty_yaml_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zt.yml");
        fs::write(&path, "\n").unwrap();
        let cfg = Configuration::from_file(&path).unwrap();
        assert_eq!(cfg.remote, "origin");
    }

    #[test]
    fn unknown_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zt.json");
        fs::write(&path, "{}").unwrap();
        assert!(matches!(
            Configuration::from_file(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn env_overrides() {
        let mut cfg = Configuration::default();
        cfg.apply_env(env(&[
            ("ZT_TARGET_BRANCH", "release"),
            ("ZT_EXCLUDED_PACKAGES", "a, b,,c"),
            ("ZT_CHECK_VERSION_INCREMENT", "false"),
            ("ZT_DEPLOYMENT_TIMEOUT", "90"),
            ("ZT_LOG", "debug"),
            ("HOME", "/root"),
        ]))
        .unwrap();
        assert_eq!(cfg.target_branch, "release");
        assert_eq!(cfg.excluded_packages, vec!["a", "b", "c"]);
        assert!(!cfg.check_version_increment);
        assert_eq!(cfg.deployment_timeout, Duration::from_secs(90));
    }

    #[test]
    fn env_bad_bool_is_error() {
        let mut cfg = Configuration::default();
        let err = cfg.apply_env(env(&[("ZT_ALL", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("ZT_ALL"));
    }

    #[test]
    fn all_with_packages_conflicts() {
        let mut cfg = Configuration {
            all: true,
            packages: vec![PathBuf::from("packages/a")],
            ..Configuration::default()
        };
        assert!(matches!(cfg.finalize(false), Err(ConfigError::Conflict(_))));
    }

    #[test]
    fn explicit_selection_disables_increment_check() {
        let mut cfg = Configuration {
            packages: vec![PathBuf::from("packages/a")],
            ..Configuration::default()
        };
        cfg.finalize(false).unwrap();
        assert!(!cfg.check_version_increment);
        assert!(cfg.validate_components);
    }

    #[test]
    fn upgrade_only_for_install_and_needs_remote() {
        let mut cfg = Configuration {
            upgrade: true,
            ..Configuration::default()
        };
        cfg.finalize(false).unwrap();
        assert!(!cfg.upgrade);

        let mut cfg = Configuration {
            upgrade: true,
            remote: String::new(),
            ..Configuration::default()
        };
        assert!(cfg.finalize(true).is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("15").unwrap(), Duration::from_secs(15));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("ten").is_err());
    }

    #[test]
    fn config_dir_overrides_search_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zt.toml"), "remote = \"fork\"\n").unwrap();
        let found = find_config_file(Some(dir.path()), None).unwrap();
        assert_eq!(found, dir.path().join("zt.toml"));
        assert_eq!(search_locations(Some(dir.path()), None).len(), 1);
    }

    #[test]
    fn render_uses_kebab_case() {
        let text = Configuration::default().render();
        assert!(text.contains("target-branch: main"));
        assert!(text.contains("deployment-timeout: 600"));
    }
}
