//! Manifest model and version semantics for zt.
//!
//! This crate defines the schema layer: typed parsing of a package's
//! `zarf.yaml` (`ZarfManifest` and its `Component` tree), loading a package
//! directory into a `ZarfPackage`, and semantic-version parsing, precedence
//! comparison, and compatible-range checks used by version-increment
//! enforcement.

pub mod manifest;
pub mod types;
pub mod version;

pub use manifest::{
    is_package_dir, manifest_path, parse_manifest_file, parse_manifest_str, ChartVariable,
    Component, ComponentCluster, ComponentOnly, ComponentScripts, Constant, ContainerTarget,
    DataInjection, ManifestError, ManifestFile, Metadata, RawManifest, Variable, ZarfChart,
    ZarfManifest, ZarfPackage, MANIFEST_FILE_NAME, MAX_PACKAGE_NAME_LEN, PACKAGE_KIND,
};
pub use types::{ComponentName, ImageRef};
pub use version::{breaking_change_allowed, compare_versions, parse_version, VersionError};
