//! Deletion of generated artifacts: one file, one preset subtree, or a whole namespace.
//!
//! Deletes are idempotent: absent files count as deleted. Empty directories left behind are pruned
//! best-effort and pruning failures never fail the request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::config::PixcacheConfig;
use crate::foundation::core::Namespace;
use crate::foundation::error::{PixcacheError, PixcacheResult};
use crate::presets::registry::{PresetRegistry, normalize_preset_name};
use crate::resolve::{QueryParams, Resolver};
use crate::store::{ArtifactStore, normalize_lexically};

/// A successful delete (`204 No Content`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deleted {
    /// Files actually removed; zero when nothing was there.
    pub removed: usize,
}

impl Deleted {
    /// HTTP status the router should answer with.
    pub fn status_code(&self) -> u16 {
        204
    }
}

/// Deletes artifacts in the same path space the pipeline generates into.
#[derive(Clone, Debug)]
pub struct Invalidator {
    config: Arc<PixcacheConfig>,
    presets: Arc<PresetRegistry>,
    resolver: Resolver,
    store: ArtifactStore,
}

impl Invalidator {
    /// Invalidator over `config` and the registered `presets`.
    pub fn new(config: Arc<PixcacheConfig>, presets: Arc<PresetRegistry>) -> Self {
        Self {
            resolver: Resolver::new(Arc::clone(&config)),
            store: ArtifactStore::new(config.public_root.clone()),
            config,
            presets,
        }
    }

    /// Delete the artifact at `url` (path and query).
    ///
    /// The URL must name a registered preset and carry a valid checksum; label URLs are only
    /// checked when they carry a payload. The file must lie inside the preset's subtree. Directories
    /// emptied by the delete are pruned up to, not including, the preset root.
    #[tracing::instrument(skip(self))]
    pub fn delete_one(&self, url: &str) -> PixcacheResult<Deleted> {
        let (_, query) = QueryParams::split_url(url);
        let parsed = self.resolver.parse_request_path(url)?;
        let preset_root = self.preset_root(parsed.namespace, &parsed.preset)?;
        self.resolver.authorize(&parsed, &query)?;

        let disk_path = normalize_lexically(&self.config.disk_path_for_url(&parsed.url_path));
        if !disk_path.starts_with(&preset_root) || disk_path == preset_root {
            return Err(PixcacheError::not_found(format!(
                "'{}' is outside preset '{}'",
                parsed.url_path, parsed.preset
            )));
        }

        let removed = self.store.remove_file(&disk_path)?;
        if removed {
            tracing::debug!(path = %disk_path.display(), "artifact deleted");
        }
        if let Some(parent) = disk_path.parent() {
            self.store.prune_chain(parent, &preset_root);
        }
        Ok(Deleted {
            removed: usize::from(removed),
        })
    }

    /// Delete every artifact generated for one preset of a namespace.
    ///
    /// URLs keep the preset as spelled by whoever built them, so one registered preset may own
    /// several folders (`default-strong`, `default_strong`, ...). Every folder whose name normalizes
    /// to the preset's key is cleared.
    #[tracing::instrument(skip(self))]
    pub fn delete_preset(&self, ns: Namespace, preset: &str) -> PixcacheResult<Deleted> {
        let key = normalize_preset_name(preset);
        if !self.presets.contains(ns.preset_kind(), &key) {
            return Err(PixcacheError::not_found(format!(
                "unknown {ns} preset '{preset}'"
            )));
        }

        let mut removed = 0;
        for root in self.preset_folders(ns, &key)? {
            removed += self.delete_tree(&root)?.removed;
        }
        Ok(Deleted { removed })
    }

    /// Delete every artifact of a namespace, across all presets.
    #[tracing::instrument(skip(self))]
    pub fn delete_all(&self, ns: Namespace) -> PixcacheResult<Deleted> {
        let root = normalize_lexically(&self.config.namespace_root(ns));
        self.delete_tree(&root)
    }

    /// Folders directly below the namespace root that belong to the preset `key`.
    fn preset_folders(&self, ns: Namespace, key: &str) -> PixcacheResult<Vec<PathBuf>> {
        let ns_root = normalize_lexically(&self.config.namespace_root(ns));
        let rd = match std::fs::read_dir(&ns_root) {
            Ok(rd) => rd,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("list '{}'", ns_root.display()))
                    .into());
            }
        };

        let mut out: Vec<PathBuf> = rd
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && !path.is_symlink())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| normalize_preset_name(name) == key)
            })
            .collect();
        out.sort();
        Ok(out)
    }

    /// `preset` is a parsed URL segment, used verbatim as the directory name.
    fn preset_root(&self, ns: Namespace, preset: &str) -> PixcacheResult<PathBuf> {
        if !self.presets.contains(ns.preset_kind(), preset) {
            return Err(PixcacheError::not_found(format!(
                "unknown {ns} preset '{preset}'"
            )));
        }
        Ok(normalize_lexically(
            &self.config.namespace_root(ns).join(preset),
        ))
    }

    /// Delete each known-extension file under `root` independently; succeed only if every delete
    /// did, and prune only then.
    fn delete_tree(&self, root: &Path) -> PixcacheResult<Deleted> {
        let extensions = self.config.known_extensions();
        let files = self.store.list_files(root, &extensions)?;

        let mut removed = 0;
        let mut failed = 0;
        for file in &files {
            match self.store.remove_file(file) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => {
                    failed += 1;
                    tracing::warn!(path = %file.display(), error = %err, "delete failed");
                }
            }
        }

        if failed > 0 {
            return Err(PixcacheError::internal(format!(
                "{failed} of {} artifacts under '{}' could not be deleted",
                files.len(),
                root.display()
            )));
        }
        self.store.prune_empty_dirs(root);
        tracing::debug!(root = %root.display(), removed, "artifacts deleted");
        Ok(Deleted { removed })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/invalidate/mod.rs"]
mod tests;
