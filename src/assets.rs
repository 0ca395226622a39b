//! Read-only access to versioned manifest bundles.

use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::PathBuf,
};

use thiserror::Error;

use crate::version::KubeVersion;

/// Files of a bundle in apply order: CRDs and RBAC before the workloads, cleanup last.
pub const BUNDLE_FILES: [&str; 4] = ["crds.yaml", "permissions.yaml", "olm.yaml", "cleanup.yaml"];

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset {0} not found")]
    NotFound(String),
    #[error("failed to read asset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Path of a bundle file, `manifests/v{major}.{minor}/{file}`.
pub fn bundle_path(version: KubeVersion, file: &str) -> String {
    format!("manifests/{version}/{file}")
}

/// A path addressed store of manifest templates.
/// Implementations must not change while a render is in progress.
pub trait AssetStore {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError>;
}

/// Assets laid out on disk below a root directory.
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetStore for DirAssetStore {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|source| match source.kind() {
            ErrorKind::NotFound => AssetError::NotFound(path.to_string()),
            _ => AssetError::Io {
                path: full.to_string_lossy().into_owned(),
                source,
            },
        })
    }
}

/// Assets held in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn with(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }
}

impl<P: Into<String>, C: Into<Vec<u8>>> FromIterator<(P, C)> for MemoryAssetStore {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        Self {
            files: iter
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
        }
    }
}

impl AssetStore for MemoryAssetStore {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}
