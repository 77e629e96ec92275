use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{PixcacheError, PixcacheResult};

/// Finds label fonts across the configured font directories.
///
/// Directories are searched last to first, so application fonts listed after the bundled ones
/// override them.
#[derive(Clone, Debug)]
pub struct FontLocator {
    paths: Vec<PathBuf>,
    default_font: String,
}

impl FontLocator {
    /// Build a locator over `paths` with `default_font` as the fallback file name.
    pub fn new(paths: Vec<PathBuf>, default_font: impl Into<String>) -> Self {
        Self {
            paths,
            default_font: default_font.into(),
        }
    }

    /// Resolve a font file name (or the default font when `None`).
    ///
    /// Absolute paths are taken as-is. A name found in no directory falls back to the default font.
    pub fn locate(&self, name: Option<&str>) -> PixcacheResult<PathBuf> {
        let name = name.unwrap_or(&self.default_font);
        let candidate = Path::new(name);
        if candidate.is_absolute() {
            if candidate.is_file() {
                return Ok(candidate.to_path_buf());
            }
            return Err(PixcacheError::internal(format!(
                "font '{}' does not exist",
                candidate.display()
            )));
        }

        self.search(name)
            .or_else(|| self.search(&self.default_font))
            .ok_or_else(|| {
                PixcacheError::internal(format!(
                    "font '{name}' not found in {} font path(s)",
                    self.paths.len()
                ))
            })
    }

    /// Read the bytes of a located font.
    pub fn load(&self, name: Option<&str>) -> PixcacheResult<Vec<u8>> {
        let path = self.locate(name)?;
        let bytes =
            std::fs::read(&path).with_context(|| format!("read font '{}'", path.display()))?;
        Ok(bytes)
    }

    fn search(&self, name: &str) -> Option<PathBuf> {
        self.paths
            .iter()
            .rev()
            .map(|dir| dir.join(name))
            .find(|p| p.is_file())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/fonts.rs"]
mod tests;
