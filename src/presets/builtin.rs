use image::DynamicImage;

use crate::foundation::error::PixcacheResult;
use crate::presets::registry::{
    ImagePreset, PresetContext, PresetRegistry, PresetRegistryBuilder, TextPreset,
};
use crate::render::codec::{Artifact, DEFAULT_JPEG_QUALITY};
use crate::render::crop::crop_fill;
use crate::render::label::{LabelStyle, Rgba8, render_inverse_label, render_label};

/// Scale-and-crop to an exact size, anchored by the request's gravity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropFillPreset {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// JPEG quality used when the artifact is encoded as JPEG.
    pub quality: u8,
}

impl CropFillPreset {
    /// Square crop of `size` pixels at the default quality.
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImagePreset for CropFillPreset {
    fn apply(&self, source: &DynamicImage, ctx: &PresetContext<'_>) -> PixcacheResult<Artifact> {
        let cropped = crop_fill(source, self.width, self.height, ctx.gravity)?;
        Ok(Artifact::new(cropped).with_quality(self.quality))
    }
}

/// Auto-sized text label.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelPreset {
    /// Drawing options.
    pub style: LabelStyle,
    /// Cut the text out of the background instead of painting it.
    pub inverse: bool,
}

impl LabelPreset {
    /// Painted-glyph label.
    pub fn new(style: LabelStyle) -> Self {
        Self {
            style,
            inverse: false,
        }
    }

    /// Cut-out label.
    pub fn inverse(style: LabelStyle) -> Self {
        Self {
            style,
            inverse: true,
        }
    }
}

impl TextPreset for LabelPreset {
    fn render(&self, text: &str, ctx: &PresetContext<'_>) -> PixcacheResult<Artifact> {
        let img = if self.inverse {
            render_inverse_label(text, &self.style, ctx.format, ctx.fonts)?
        } else {
            render_label(text, &self.style, ctx.format, ctx.fonts)?
        };
        Ok(Artifact::new(DynamicImage::ImageRgba8(img)))
    }
}

/// Registration phase pre-filled with the stock presets, for callers that add their own.
///
/// Image: `default` (128×128) and `sample` (200×200). Text: `default`, `inverse` and `sample`.
pub fn builtin_presets() -> PixcacheResult<PresetRegistryBuilder> {
    let label = LabelStyle {
        point_size: 18.0,
        alpha: true,
        ..LabelStyle::default()
    };

    PresetRegistry::builder()
        .register_image("default", CropFillPreset::square(128))?
        .register_image("sample", CropFillPreset::square(200))?
        .register_text("default", LabelPreset::new(label.clone()))?
        .register_text(
            "inverse",
            LabelPreset::inverse(LabelStyle {
                background: Rgba8::BLACK,
                ..label.clone()
            }),
        )?
        .register_text(
            "sample",
            LabelPreset::new(LabelStyle {
                background: Rgba8::BLACK,
                fill: Rgba8::RED,
                ..label
            }),
        )
}

/// The stock presets alone.
pub fn builtin_registry() -> PixcacheResult<PresetRegistry> {
    Ok(builtin_presets()?.build())
}

#[cfg(test)]
#[path = "../../tests/unit/presets/builtin.rs"]
mod tests;
