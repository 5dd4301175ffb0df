//! Digest pinning for image references.
//!
//! Images listed under a component's `images` are read from the parsed
//! model. Inline `image:` fields (for example inside chart variables or
//! embedded manifests) are not modeled, so the raw manifest text is scanned
//! for them line by line. That scan misses values split across lines or
//! built from templates.

use super::ValidationResult;
use std::collections::BTreeSet;
use zt_schema::{ImageRef, ZarfPackage};

const INLINE_KEY: &str = "image:";

/// Every image reference in the package, component images first, each at
/// most once.
pub fn collect(pkg: &ZarfPackage) -> Vec<ImageRef> {
    let mut seen = BTreeSet::new();
    let mut images = Vec::new();
    let typed = pkg
        .manifest
        .components
        .iter()
        .flat_map(|c| c.images.iter().cloned());
    for image in typed.chain(inline_images(&pkg.raw)) {
        if seen.insert(image.clone()) {
            images.push(image);
        }
    }
    images
}

/// Values of `image:` keys in raw YAML text.
pub fn inline_images(raw: &str) -> impl Iterator<Item = ImageRef> + '_ {
    raw.lines().filter_map(|line| {
        let line = line.trim_start();
        let line = line.strip_prefix("- ").unwrap_or(line).trim_start();
        let value = line.strip_prefix(INLINE_KEY)?;
        let value = value.split(" #").next().unwrap_or(value).trim();
        let value = value.trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| ImageRef::new(value))
    })
}

pub fn check(pkg: &ZarfPackage, result: &mut ValidationResult) {
    for image in collect(pkg) {
        if image.is_unpinned() {
            result.warn(format!("Image not pinned with digest - {image}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn load(yaml: &str) -> ZarfPackage {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zarf.yaml"), yaml).unwrap();
        ZarfPackage::load(dir.path()).unwrap()
    }

    fn warnings(yaml: &str) -> Vec<String> {
        let pkg = load(yaml);
        let mut result = ValidationResult::new(&pkg.path);
        check(&pkg, &mut result);
        result.warnings
    }

    #[test]
    fn tagged_image_warns() {
        let w = warnings("kind: ZarfPackageConfig\ncomponents:\n  - name: a\n    images:\n      - nginx:1.21\n");
        assert_eq!(w, vec!["Image not pinned with digest - nginx:1.21"]);
    }

    #[test]
    fn digest_and_placeholder_do_not_warn() {
        let w = warnings(
            "kind: ZarfPackageConfig\ncomponents:\n  - name: a\n    images:\n      - nginx@sha256:abcd\n      - \"{{ .Image }}\"\n      - plain\n",
        );
        assert!(w.is_empty(), "{w:?}");
    }

    #[test]
    fn inline_image_fields_are_scanned() {
        let raw = "\
components:
  - name: a
    charts:
      - name: c
        variables:
          - name: IMG
            default: x
    actions:
      - image: \"ghcr.io/org/tool:2.0\"  # pinned later
      - image: ''
";
        let found: Vec<ImageRef> = inline_images(raw).collect();
        assert_eq!(found, vec![ImageRef::new("ghcr.io/org/tool:2.0")]);
    }

    #[test]
    fn images_key_is_not_inline() {
        assert_eq!(inline_images("    images:\n      - a:1\n").count(), 0);
    }

    #[test]
    fn each_reference_reported_once() {
        let w = warnings(
            "kind: ZarfPackageConfig\ncomponents:\n  - name: a\n    images: [nginx:1.21]\n  - name: b\n    images: [nginx:1.21]\nvalues:\n  image: nginx:1.21\n",
        );
        assert_eq!(w.len(), 1);
    }
}
