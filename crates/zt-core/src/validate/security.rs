//! Security and resource heuristics.
//!
//! Raw Kubernetes manifests referenced by a component are free text to this
//! crate, so they are matched with patterns rather than parsed. A flag set
//! through a template or split over several lines is not caught.

use super::ValidationResult;
use regex::Regex;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;
use zt_schema::{Component, ZarfChart, ZarfPackage};

const LARGE_FILE_MB: u64 = 100;
const MANY_IMAGES: usize = 10;
const SECRET_PATTERNS: &[&str] = &[
    "password=",
    "token=",
    "secret=",
    "key=",
    "api_key",
    "aws_access",
];
const RESOURCE_KEYS: &[&str] = &["limits", "requests"];

static PRIVILEGED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bprivileged:\s*true\b").expect("valid regex"));
static HOST_NETWORK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhostNetwork:\s*true\b").expect("valid regex"));
static HOST_PID_IPC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhost(PID|IPC):\s*true\b").expect("valid regex"));

fn is_remote(source: &str) -> bool {
    source.contains("://")
}

pub fn check(pkg: &ZarfPackage, result: &mut ValidationResult) {
    for component in &pkg.manifest.components {
        for file in component.manifests.iter().flat_map(|m| m.files.iter()) {
            if is_remote(file) {
                debug!("skipping remote manifest {file}");
                continue;
            }
            match fs::read_to_string(pkg.path.join(file)) {
                Ok(content) => scan_manifest(&content, component, result),
                Err(e) => result.warn(format!(
                    "Failed to analyze manifest security for {file}: {e}"
                )),
            }
        }

        for script in component.scripts.all() {
            if contains_potential_secret(script) {
                result.warn(format!(
                    "Component '{}' script may contain hardcoded secrets or sensitive data",
                    component.name
                ));
            }
        }

        for image in &component.images {
            if !image.is_template_placeholder() && image.uses_default_registry() {
                result.warn(format!(
                    "Component '{}' uses image from potentially untrusted registry: {image}",
                    component.name
                ));
            }
        }
    }
}

fn scan_manifest(content: &str, component: &Component, result: &mut ValidationResult) {
    let name = &component.name;
    if PRIVILEGED.is_match(content) {
        result.warn(format!(
            "Component '{name}' manifest may use privileged containers"
        ));
    }
    if HOST_NETWORK.is_match(content) {
        result.warn(format!("Component '{name}' manifest uses host networking"));
    }
    if HOST_PID_IPC.is_match(content) {
        result.warn(format!("Component '{name}' manifest uses host PID or IPC"));
    }
}

pub fn contains_potential_secret(script: &str) -> bool {
    let lower = script.to_lowercase();
    SECRET_PATTERNS.iter().any(|p| lower.contains(p))
}

pub fn check_resources(pkg: &ZarfPackage, result: &mut ValidationResult) {
    for component in &pkg.manifest.components {
        let name = &component.name;
        for file in &component.files {
            if file.source.is_empty() || is_remote(&file.source) {
                continue;
            }
            if let Ok(meta) = fs::metadata(pkg.path.join(&file.source)) {
                let mb = meta.len() / (1024 * 1024);
                if mb > LARGE_FILE_MB {
                    result.warn(format!(
                        "Component '{name}' includes large file ({mb}MB): {}",
                        file.source
                    ));
                }
            }
        }

        if component.images.len() > MANY_IMAGES {
            result.warn(format!(
                "Component '{name}' includes many images ({}) which may impact package size",
                component.images.len()
            ));
        }

        for chart in &component.charts {
            if !chart_sets_resources(&pkg.path, chart) {
                result.warn(format!(
                    "Chart '{}' in component '{name}' may not specify resource limits",
                    chart.name
                ));
            }
        }
    }
}

fn chart_sets_resources(root: &Path, chart: &ZarfChart) -> bool {
    chart.values_files.iter().any(|file| {
        let Ok(content) = fs::read_to_string(root.join(file)) else {
            return false;
        };
        match serde_yaml::from_str::<Value>(&content) {
            Ok(value) => has_resource_key(&value),
            Err(_) => RESOURCE_KEYS
                .iter()
                .any(|k| content.contains(&format!("{k}:"))),
        }
    })
}

fn has_resource_key(value: &Value) -> bool {
    match value {
        Value::Mapping(map) => map.iter().any(|(k, v)| {
            k.as_str().is_some_and(|k| RESOURCE_KEYS.contains(&k)) || has_resource_key(v)
        }),
        Value::Sequence(items) => items.iter().any(has_resource_key),
        Value::Tagged(tagged) => has_resource_key(&tagged.value),
        _ => false,
    }
}
