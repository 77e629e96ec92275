use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

use crate::foundation::{
    core::{ArtifactFormat, Namespace},
    error::{PixcacheError, PixcacheResult},
};

/// A named root that source assets are read from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum StorageLocation {
    /// Local directory; sources must exist on disk.
    Local(PathBuf),
    /// Remote base URI; sources are fetched on cache miss.
    Remote(String),
}

impl From<String> for StorageLocation {
    fn from(value: String) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Remote(value)
        } else {
            Self::Local(PathBuf::from(value))
        }
    }
}

impl StorageLocation {
    /// Join a relative source path onto this root, producing the canonical source identifier.
    ///
    /// Local roots join with the platform separator rules but always render `/`; remote roots join
    /// with exactly one `/` between base and path.
    pub fn join(&self, relative: &str) -> String {
        match self {
            Self::Local(dir) => {
                let base = dir.to_string_lossy().replace('\\', "/");
                join_slash(&base, relative)
            }
            Self::Remote(base) => join_slash(base, relative),
        }
    }
}

fn join_slash(base: &str, relative: &str) -> String {
    let base = base.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    if base.is_empty() {
        format!("/{relative}")
    } else {
        format!("{base}/{relative}")
    }
}

/// Process-wide, read-only configuration.
///
/// Built once at startup and shared (usually behind an `Arc`) with the resolver, the pipeline and
/// the invalidation manager. Nothing reads configuration from ambient state.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PixcacheConfig {
    /// Secret mixed into image and external checksums.
    pub secret: String,
    /// Directory standing for the web root; artifact paths mirror URL paths below it.
    pub public_root: PathBuf,
    /// Optional URL prefix inserted before the namespace segment.
    pub path_prefix: Option<String>,
    /// Output extension to mime type. Keys double as the known artifact extensions.
    pub mime_types: BTreeMap<String, String>,
    /// Storage key to source root.
    pub storage_locations: BTreeMap<String, StorageLocation>,
    /// Storage used for index sample images.
    pub default_storage: String,
    /// Relative source used for index samples, and the reference returned for unknown storages.
    pub default_image: String,
    /// Font directories, searched last to first.
    pub font_paths: Vec<PathBuf>,
    /// Font file used when a label does not name one.
    pub default_font: String,
}

impl Default for PixcacheConfig {
    fn default() -> Self {
        let mime_types = [
            ("gif", "image/gif"),
            ("jpg", "image/jpeg"),
            ("png", "image/png"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut storage_locations = BTreeMap::new();
        storage_locations.insert(
            "default".to_string(),
            StorageLocation::Local(PathBuf::from("images")),
        );
        storage_locations.insert(
            "graphics-slice".to_string(),
            StorageLocation::Local(PathBuf::from("public/slices/graphics-slice/images")),
        );
        storage_locations.insert(
            "flickr".to_string(),
            StorageLocation::Remote("http://static.flickr.com".to_string()),
        );

        Self {
            secret: "graphicsecret".to_string(),
            public_root: PathBuf::from("public"),
            path_prefix: None,
            mime_types,
            storage_locations,
            default_storage: "graphics-slice".to_string(),
            default_image: "fallback.jpg".to_string(),
            font_paths: vec![PathBuf::from("fonts")],
            default_font: "union.ttf".to_string(),
        }
    }
}

impl PixcacheConfig {
    /// Load a JSON configuration file; missing fields take their defaults.
    pub fn from_path(path: &Path) -> PixcacheResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the cache cannot operate with.
    pub fn validate(&self) -> PixcacheResult<()> {
        if self.secret.is_empty() {
            return Err(PixcacheError::config("secret must be non-empty"));
        }
        if self.mime_types.is_empty() {
            return Err(PixcacheError::config("mime_types must list at least one format"));
        }
        for (ext, mime) in &self.mime_types {
            if ArtifactFormat::new(ext.as_str(), mime.as_str()).is_none() {
                return Err(PixcacheError::config(format!(
                    "mime type '{ext}' has no image encoder"
                )));
            }
        }
        if let Some(prefix) = &self.path_prefix
            && prefix.contains("..")
        {
            return Err(PixcacheError::config("path_prefix must not contain '..'"));
        }
        Ok(())
    }

    /// Look up a storage location by key.
    pub fn storage(&self, key: &str) -> Option<&StorageLocation> {
        self.storage_locations.get(key)
    }

    /// Resolve a configured output format.
    pub fn format(&self, ext: &str) -> Option<ArtifactFormat> {
        let mime = self.mime_types.get(ext)?;
        ArtifactFormat::new(ext, mime.as_str())
    }

    /// Extensions of every configured output format.
    pub fn known_extensions(&self) -> Vec<&str> {
        self.mime_types.keys().map(String::as_str).collect()
    }

    /// URL base of a namespace, e.g. `/images` or `/<prefix>/images`.
    pub fn namespace_base(&self, ns: Namespace) -> String {
        match self
            .path_prefix
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
        {
            Some(prefix) => format!("/{prefix}/{ns}"),
            None => format!("/{ns}"),
        }
    }

    /// Disk location of a URL path below the public root. Query strings are ignored.
    pub fn disk_path_for_url(&self, url_path: &str) -> PathBuf {
        let path = url_path.split('?').next().unwrap_or_default();
        let mut out = self.public_root.clone();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            out.push(part);
        }
        out
    }

    /// Disk root of every artifact in a namespace.
    pub fn namespace_root(&self, ns: Namespace) -> PathBuf {
        self.disk_path_for_url(&self.namespace_base(ns))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
