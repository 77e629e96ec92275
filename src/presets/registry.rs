use std::{collections::BTreeMap, fmt, sync::Arc};

use image::DynamicImage;

use crate::foundation::core::{ArtifactFormat, PresetKind};
use crate::foundation::error::{PixcacheError, PixcacheResult};
use crate::render::codec::Artifact;
use crate::render::crop::Gravity;
use crate::render::fonts::FontLocator;

/// Per-request inputs a preset may consult besides its source.
#[derive(Clone, Copy, Debug)]
pub struct PresetContext<'a> {
    /// Output container the artifact will be encoded into.
    pub format: &'a ArtifactFormat,
    /// Anchoring requested through the `gravity` query parameter.
    pub gravity: Gravity,
    /// Font lookup for text presets.
    pub fonts: &'a FontLocator,
}

/// A named transform from a decoded source image to an artifact.
pub trait ImagePreset: Send + Sync {
    /// Produce the artifact for `source`.
    fn apply(&self, source: &DynamicImage, ctx: &PresetContext<'_>) -> PixcacheResult<Artifact>;
}

/// A named renderer from a text payload to an artifact.
pub trait TextPreset: Send + Sync {
    /// Produce the artifact for `text`.
    fn render(&self, text: &str, ctx: &PresetContext<'_>) -> PixcacheResult<Artifact>;
}

struct FnImagePreset<F>(F);

impl<F> ImagePreset for FnImagePreset<F>
where
    F: Fn(&DynamicImage, &PresetContext<'_>) -> PixcacheResult<Artifact> + Send + Sync,
{
    fn apply(&self, source: &DynamicImage, ctx: &PresetContext<'_>) -> PixcacheResult<Artifact> {
        (self.0)(source, ctx)
    }
}

struct FnTextPreset<F>(F);

impl<F> TextPreset for FnTextPreset<F>
where
    F: Fn(&str, &PresetContext<'_>) -> PixcacheResult<Artifact> + Send + Sync,
{
    fn render(&self, text: &str, ctx: &PresetContext<'_>) -> PixcacheResult<Artifact> {
        (self.0)(text, ctx)
    }
}

/// A resolved preset, tagged by the kind of source it accepts.
#[derive(Clone)]
pub enum PresetHandler {
    /// Transforms a source image.
    Image(Arc<dyn ImagePreset>),
    /// Renders a text payload.
    Text(Arc<dyn TextPreset>),
}

impl PresetHandler {
    /// Table this handler belongs to.
    pub fn kind(&self) -> PresetKind {
        match self {
            Self::Image(_) => PresetKind::Image,
            Self::Text(_) => PresetKind::Text,
        }
    }
}

impl fmt::Debug for PresetHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(_) => f.write_str("PresetHandler::Image(..)"),
            Self::Text(_) => f.write_str("PresetHandler::Text(..)"),
        }
    }
}

/// Canonical form of a preset name: ASCII-lowercased, with every run of characters other than
/// letters, digits and `_` collapsed into a single `_` and no leading or trailing separator.
///
/// `"Sample Preset"`, `"sample-preset"` and `"  SAMPLE.preset "` all normalize to
/// `"sample_preset"`.
pub fn normalize_preset_name(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Immutable name → handler tables for image and text presets.
///
/// Built once through [`PresetRegistryBuilder`]; lookups need no synchronization.
#[derive(Clone, Default)]
pub struct PresetRegistry {
    image: BTreeMap<String, Arc<dyn ImagePreset>>,
    text: BTreeMap<String, Arc<dyn TextPreset>>,
}

impl PresetRegistry {
    /// Start an empty registry.
    pub fn builder() -> PresetRegistryBuilder {
        PresetRegistryBuilder::default()
    }

    /// Look up a preset by (unnormalized) name.
    pub fn resolve(&self, kind: PresetKind, name: &str) -> PixcacheResult<PresetHandler> {
        match kind {
            PresetKind::Image => self.image(name).map(PresetHandler::Image),
            PresetKind::Text => self.text(name).map(PresetHandler::Text),
        }
    }

    /// Look up an image preset.
    pub fn image(&self, name: &str) -> PixcacheResult<Arc<dyn ImagePreset>> {
        self.image
            .get(&normalize_preset_name(name))
            .cloned()
            .ok_or_else(|| PixcacheError::not_found(format!("image preset '{name}'")))
    }

    /// Look up a text preset.
    pub fn text(&self, name: &str) -> PixcacheResult<Arc<dyn TextPreset>> {
        self.text
            .get(&normalize_preset_name(name))
            .cloned()
            .ok_or_else(|| PixcacheError::not_found(format!("text preset '{name}'")))
    }

    /// Whether `name` is registered in the `kind` table.
    pub fn contains(&self, kind: PresetKind, name: &str) -> bool {
        let key = normalize_preset_name(name);
        match kind {
            PresetKind::Image => self.image.contains_key(&key),
            PresetKind::Text => self.text.contains_key(&key),
        }
    }

    /// Sorted normalized names of the `kind` table.
    pub fn names(&self, kind: PresetKind) -> Vec<String> {
        match kind {
            PresetKind::Image => self.image.keys().cloned().collect(),
            PresetKind::Text => self.text.keys().cloned().collect(),
        }
    }
}

impl fmt::Debug for PresetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresetRegistry")
            .field("image", &self.image.keys().collect::<Vec<_>>())
            .field("text", &self.text.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Registration phase of a [`PresetRegistry`].
#[derive(Default)]
pub struct PresetRegistryBuilder {
    registry: PresetRegistry,
}

impl PresetRegistryBuilder {
    /// Register `handler` under the normalized `name` in the table matching its kind.
    ///
    /// Empty names and names already taken in that table are rejected.
    pub fn register(mut self, name: &str, handler: PresetHandler) -> PixcacheResult<Self> {
        let key = normalize_preset_name(name);
        if key.is_empty() {
            return Err(PixcacheError::config(format!(
                "preset name '{name}' normalizes to nothing"
            )));
        }
        let taken = match handler {
            PresetHandler::Image(h) => self.registry.image.insert(key.clone(), h).is_some(),
            PresetHandler::Text(h) => self.registry.text.insert(key.clone(), h).is_some(),
        };
        if taken {
            return Err(PixcacheError::config(format!(
                "preset '{key}' registered twice"
            )));
        }
        Ok(self)
    }

    /// Register an image preset.
    pub fn register_image(
        self,
        name: &str,
        preset: impl ImagePreset + 'static,
    ) -> PixcacheResult<Self> {
        self.register(name, PresetHandler::Image(Arc::new(preset)))
    }

    /// Register a text preset.
    pub fn register_text(
        self,
        name: &str,
        preset: impl TextPreset + 'static,
    ) -> PixcacheResult<Self> {
        self.register(name, PresetHandler::Text(Arc::new(preset)))
    }

    /// Register a closure as an image preset.
    pub fn image_fn<F>(self, name: &str, f: F) -> PixcacheResult<Self>
    where
        F: Fn(&DynamicImage, &PresetContext<'_>) -> PixcacheResult<Artifact>
            + Send
            + Sync
            + 'static,
    {
        self.register_image(name, FnImagePreset(f))
    }

    /// Register a closure as a text preset.
    pub fn text_fn<F>(self, name: &str, f: F) -> PixcacheResult<Self>
    where
        F: Fn(&str, &PresetContext<'_>) -> PixcacheResult<Artifact> + Send + Sync + 'static,
    {
        self.register_text(name, FnTextPreset(f))
    }

    /// Freeze the tables.
    pub fn build(self) -> PresetRegistry {
        self.registry
    }
}

#[cfg(test)]
#[path = "../../tests/unit/presets/registry.rs"]
mod tests;
