//! Self-contained manifest checks used when `zarf dev lint` cannot run.

use super::ValidationResult;
use zt_schema::{ZarfManifest, MAX_PACKAGE_NAME_LEN, PACKAGE_KIND};

pub fn check(manifest: &ZarfManifest, result: &mut ValidationResult) {
    if manifest.kind.is_empty() {
        result.error("Missing 'kind' field in zarf.yaml");
    } else if manifest.kind != PACKAGE_KIND {
        result.error(format!(
            "Invalid kind '{}', expected '{PACKAGE_KIND}'",
            manifest.kind
        ));
    }

    match manifest.name() {
        None => result.error("Missing package name in metadata"),
        Some(name) if name.chars().count() > MAX_PACKAGE_NAME_LEN => result.error(format!(
            "Package name must be {MAX_PACKAGE_NAME_LEN} characters or less"
        )),
        Some(_) => {}
    }

    if manifest.version().is_none() {
        result.warn("No version specified in metadata");
    }
    if manifest
        .metadata
        .description
        .as_deref()
        .is_none_or(str::is_empty)
    {
        result.warn("No description provided in metadata");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zt_schema::parse_manifest_str;

    fn run(yaml: &str) -> ValidationResult {
        let manifest = parse_manifest_str(yaml).unwrap();
        let mut result = ValidationResult::new("pkg");
        check(&manifest, &mut result);
        result
    }

    #[test]
    fn complete_metadata_passes() {
        let r = run("kind: ZarfPackageConfig\nmetadata:\n  name: app\n  version: 1.0.0\n  description: d\n");
        assert!(r.errors.is_empty());
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn missing_kind() {
        let r = run("metadata:\n  name: app\n  version: 1.0.0\n  description: d\n");
        assert_eq!(r.errors, vec!["Missing 'kind' field in zarf.yaml"]);
    }

    #[test]
    fn wrong_kind_is_exactly_one_error() {
        for kind in ["ZarfInitConfig", "zarfpackageconfig", "Deployment"] {
            let r = run(&format!(
                "kind: {kind}\nmetadata:\n  name: app\n  version: 1.0.0\n  description: d\n"
            ));
            assert_eq!(r.errors.len(), 1, "{kind}");
        }
    }

    #[test]
    fn missing_name_and_optional_metadata() {
        let r = run("kind: ZarfPackageConfig\nmetadata: {}\n");
        assert_eq!(r.errors, vec!["Missing package name in metadata"]);
        assert_eq!(
            r.warnings,
            vec![
                "No version specified in metadata",
                "No description provided in metadata"
            ]
        );
    }

    #[test]
    fn long_name_rejected() {
        let name = "a".repeat(64);
        let r = run(&format!(
            "kind: ZarfPackageConfig\nmetadata:\n  name: {name}\n  version: 1.0.0\n  description: d\n"
        ));
        assert_eq!(r.errors, vec!["Package name must be 63 characters or less"]);

        let ok = "a".repeat(63);
        let r = run(&format!(
            "kind: ZarfPackageConfig\nmetadata:\n  name: {ok}\n  version: 1.0.0\n  description: d\n"
        ));
        assert!(r.errors.is_empty());
    }
}
