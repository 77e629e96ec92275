//! Filesystem primitives for the artifact tree.
//!
//! Every mutating call is confined to the managed root: paths are compared after lexical
//! normalization, so `..` segments cannot escape it.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{PixcacheError, PixcacheResult};

/// File store rooted at the public artifact directory.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Store managing everything under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize_lexically(&root.into()),
        }
    }

    /// Managed root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` lies strictly below the managed root.
    pub fn manages(&self, path: &Path) -> bool {
        is_within(&self.root, path)
    }

    /// Read a whole artifact; `None` when there is no file at `path`.
    pub fn read(&self, path: &Path) -> PixcacheResult<Option<Vec<u8>>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("read artifact '{}'", path.display()))
                .into()),
        }
    }

    /// Persist `bytes` at `path`, creating parent directories.
    ///
    /// The bytes go to a temporary file next to `path` which is then renamed over it, so readers
    /// see either the previous file or the complete new one.
    pub fn write_atomic(&self, path: &Path, bytes: &[u8]) -> PixcacheResult<()> {
        if !self.manages(path) {
            return Err(PixcacheError::internal(format!(
                "refusing to write '{}' outside '{}'",
                path.display(),
                self.root.display()
            )));
        }
        let parent = path
            .parent()
            .ok_or_else(|| PixcacheError::internal("artifact path has no parent directory"))?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create artifact directory '{}'", parent.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("create temp file in '{}'", parent.display()))?;
        tmp.write_all(bytes)
            .with_context(|| format!("write temp file for '{}'", path.display()))?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("persist artifact '{}'", path.display()))?;
        Ok(())
    }

    /// Remove one managed file. Returns whether a file was actually removed; absence is not an
    /// error.
    pub fn remove_file(&self, path: &Path) -> PixcacheResult<bool> {
        if !self.manages(path) {
            return Ok(false);
        }
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("remove artifact '{}'", path.display()))
                .into()),
        }
    }

    /// Every file below `dir` whose extension is one of `extensions`, sorted.
    ///
    /// A missing `dir` yields an empty list.
    pub fn list_files(&self, dir: &Path, extensions: &[&str]) -> PixcacheResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        if dir.is_dir() {
            collect_files(dir, extensions, &mut out)?;
        }
        out.sort();
        Ok(out)
    }

    /// Remove empty directories below `dir` (never `dir` itself), deepest first.
    ///
    /// Best-effort: failures are logged and skipped. Nothing outside the managed root is touched.
    pub fn prune_empty_dirs(&self, dir: &Path) {
        let dir = normalize_lexically(dir);
        if dir != self.root && !self.manages(&dir) {
            tracing::warn!(dir = %dir.display(), "skip pruning outside managed root");
            return;
        }
        let Ok(rd) = std::fs::read_dir(&dir) else {
            return;
        };
        for entry in rd.flatten() {
            let path = entry.path();
            if path.is_dir() && !path.is_symlink() {
                self.prune_empty_dirs(&path);
                self.remove_dir_if_empty(&path);
            }
        }
    }

    /// Remove `from` and its ancestors while they are empty, stopping below `stop_at`.
    pub fn prune_chain(&self, from: &Path, stop_at: &Path) {
        let stop_at = normalize_lexically(stop_at);
        let mut cur = normalize_lexically(from);
        while cur != stop_at && is_within(&stop_at, &cur) && self.manages(&cur) {
            if !self.remove_dir_if_empty(&cur) {
                break;
            }
            let Some(parent) = cur.parent() else {
                break;
            };
            cur = parent.to_path_buf();
        }
    }

    fn remove_dir_if_empty(&self, dir: &Path) -> bool {
        let empty = match std::fs::read_dir(dir) {
            Ok(mut rd) => rd.next().is_none(),
            Err(_) => false,
        };
        if !empty {
            return false;
        }
        match std::fs::remove_dir(dir) {
            Ok(()) => {
                tracing::debug!(dir = %dir.display(), "pruned empty directory");
                true
            }
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "prune failed");
                false
            }
        }
    }
}

fn collect_files(dir: &Path, extensions: &[&str], out: &mut Vec<PathBuf>) -> PixcacheResult<()> {
    let rd =
        std::fs::read_dir(dir).with_context(|| format!("list directory '{}'", dir.display()))?;
    for entry in rd.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if !path.is_symlink() {
                collect_files(&path, extensions, out)?;
            }
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        if extensions.contains(&ext) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_within(root: &Path, path: &Path) -> bool {
    let path = normalize_lexically(path);
    path != *root && path.starts_with(root)
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` never climbs above the first component of a relative path or above `/`.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Normalize and validate a storage-relative source path.
///
/// The result uses `/` separators, drops `.` and empty segments, and rejects absolute paths and
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> PixcacheResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(PixcacheError::not_found("source paths must be relative"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(PixcacheError::not_found("source paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(PixcacheError::not_found("source path must contain a file name"));
    }
    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/store/mod.rs"]
mod tests;
