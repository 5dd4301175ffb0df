use crate::types::{ComponentName, ImageRef};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of a package manifest, expected directly inside the package directory.
pub const MANIFEST_FILE_NAME: &str = "zarf.yaml";

/// The only `kind` a package manifest may declare.
pub const PACKAGE_KIND: &str = "ZarfPackageConfig";

/// Package names become Kubernetes label values and must fit in 63 characters.
pub const MAX_PACKAGE_NAME_LEN: usize = 63;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse manifest {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("manifest error: directory {0} does not contain a {MANIFEST_FILE_NAME} file")]
    NotAPackage(PathBuf),
}

/// Treat an explicit YAML `null` the same as an absent key.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parsed `zarf.yaml`. Unknown keys are ignored: the upstream schema is
/// larger than what validation needs.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ZarfManifest {
    #[serde(default, deserialize_with = "null_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_default")]
    pub metadata: Metadata,
    #[serde(default, deserialize_with = "null_default")]
    pub variables: Vec<Variable>,
    #[serde(default, deserialize_with = "null_default")]
    pub constants: Vec<Constant>,
    #[serde(default, deserialize_with = "null_default")]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Metadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub deprecated: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Variable {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub prompt: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Constant {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(default, deserialize_with = "null_default")]
    pub name: ComponentName,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub default: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub required: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub only: ComponentOnly,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub deps_with: Vec<ComponentName>,
    #[serde(default, deserialize_with = "null_default")]
    pub files: Vec<ManifestFile>,
    #[serde(default, deserialize_with = "null_default")]
    pub charts: Vec<ZarfChart>,
    #[serde(default, deserialize_with = "null_default")]
    pub manifests: Vec<RawManifest>,
    #[serde(default, deserialize_with = "null_default")]
    pub images: Vec<ImageRef>,
    #[serde(default, deserialize_with = "null_default")]
    pub repos: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub data_injections: Vec<DataInjection>,
    #[serde(default, deserialize_with = "null_default")]
    pub scripts: ComponentScripts,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ComponentOnly {
    #[serde(default, rename = "localOS")]
    pub local_os: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub cluster: ComponentCluster,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ComponentCluster {
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub distros: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    #[serde(default, deserialize_with = "null_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_default")]
    pub target: String,
    #[serde(default)]
    pub shasum: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub executable: bool,
    #[serde(default)]
    pub extract_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ZarfChart {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub git_path: Option<String>,
    #[serde(default)]
    pub local_path: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub release_name: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub no_wait: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub values_files: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub variables: Vec<ChartVariable>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChartVariable {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub path: String,
}

/// Raw Kubernetes manifests or kustomizations shipped with a component.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawManifest {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub files: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub kustomize_allow_any_of: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub kustomizations: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DataInjection {
    #[serde(default, deserialize_with = "null_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_default")]
    pub target: ContainerTarget,
    #[serde(default, deserialize_with = "null_default")]
    pub compress: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ContainerTarget {
    #[serde(default, deserialize_with = "null_default")]
    pub namespace: String,
    #[serde(default, deserialize_with = "null_default")]
    pub selector: String,
    #[serde(default, deserialize_with = "null_default")]
    pub container: String,
    #[serde(default, deserialize_with = "null_default")]
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScripts {
    #[serde(default, deserialize_with = "null_default")]
    pub show_output: bool,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default, deserialize_with = "null_default")]
    pub retry: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub prepare: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub before: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub after: Vec<String>,
}

impl ComponentScripts {
    /// All lifecycle commands in execution order.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.prepare
            .iter()
            .chain(&self.before)
            .chain(&self.after)
            .map(String::as_str)
    }
}

impl Component {
    /// A component with nothing to deploy.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
            && self.charts.is_empty()
            && self.manifests.is_empty()
            && self.images.is_empty()
            && self.repos.is_empty()
            && self.data_injections.is_empty()
    }
}

impl ZarfManifest {
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn version(&self) -> Option<&str> {
        self.metadata.version.as_deref().filter(|v| !v.is_empty())
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }
}

pub fn parse_manifest_str(input: &str) -> Result<ZarfManifest, ManifestError> {
    Ok(serde_yaml::from_str(input)?)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<ZarfManifest, ManifestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ManifestError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE_NAME)
}

/// True iff the manifest file exists directly inside `dir`.
pub fn is_package_dir(dir: &Path) -> bool {
    manifest_path(dir).is_file()
}

/// A package directory together with its parsed manifest and raw text.
#[derive(Debug, Clone)]
pub struct ZarfPackage {
    pub path: PathBuf,
    pub name: String,
    pub manifest: ZarfManifest,
    /// Manifest text exactly as read, used for content comparison against
    /// historical revisions.
    pub raw: String,
}

impl ZarfPackage {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let dir = dir.as_ref();
        if !is_package_dir(dir) {
            return Err(ManifestError::NotAPackage(dir.to_path_buf()));
        }
        let path = manifest_path(dir);
        let raw = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
            path: path.clone(),
            source,
        })?;
        let manifest: ZarfManifest =
            serde_yaml::from_str(&raw).map_err(|source| ManifestError::ParseFile {
                path: path.clone(),
                source,
            })?;

        let name = match manifest.name() {
            Some(n) => n.to_owned(),
            None => dir
                .file_name()
                .map_or_else(|| dir.display().to_string(), |n| n.to_string_lossy().into_owned()),
        };

        Ok(Self {
            path: dir.to_path_buf(),
            name,
            manifest,
            raw,
        })
    }
}
