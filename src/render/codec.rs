use std::{io::Cursor, path::Path};

use anyhow::Context;
use image::{DynamicImage, ImageReader, codecs::jpeg::JpegEncoder};

use crate::foundation::{
    core::ArtifactFormat,
    error::{PixcacheError, PixcacheResult},
};

/// JPEG quality used when a preset does not pick one.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Finished output of a preset, not yet encoded.
#[derive(Clone, Debug)]
pub struct Artifact {
    /// Final pixels.
    pub image: DynamicImage,
    /// Compression quality for lossy formats.
    pub quality: Option<u8>,
}

impl Artifact {
    /// Wrap transformed pixels.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            quality: None,
        }
    }

    /// Set the lossy compression quality (1-100).
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality.clamp(1, 100));
        self
    }
}

/// Decode encoded image bytes.
pub fn decode_image(bytes: &[u8]) -> PixcacheResult<DynamicImage> {
    let img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(img)
}

/// Decode an image file, sniffing the format from its contents rather than its name.
pub fn decode_image_file(path: &Path) -> PixcacheResult<DynamicImage> {
    let img = ImageReader::open(path)
        .with_context(|| format!("open image '{}'", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("sniff image format of '{}'", path.display()))?
        .decode()
        .with_context(|| format!("decode image '{}'", path.display()))?;
    Ok(img)
}

/// Encode an artifact fully in memory.
pub fn encode_artifact(artifact: &Artifact, format: &ArtifactFormat) -> PixcacheResult<Vec<u8>> {
    let mut buf = Vec::new();
    match format.image_format() {
        image::ImageFormat::Jpeg => {
            let quality = artifact.quality.unwrap_or(DEFAULT_JPEG_QUALITY);
            let rgb = DynamicImage::ImageRgb8(artifact.image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
                .context("encode jpeg artifact")?;
        }
        image::ImageFormat::Gif | image::ImageFormat::Png => {
            let rgba = DynamicImage::ImageRgba8(artifact.image.to_rgba8());
            rgba.write_to(&mut Cursor::new(&mut buf), format.image_format())
                .with_context(|| format!("encode {format} artifact"))?;
        }
        other => {
            artifact
                .image
                .write_to(&mut Cursor::new(&mut buf), other)
                .with_context(|| format!("encode {format} artifact"))?;
        }
    }
    if buf.is_empty() {
        return Err(PixcacheError::internal(format!(
            "encoder produced no bytes for {format}"
        )));
    }
    Ok(buf)
}

/// Convert premultiplied RGBA8 (as rendered) back to straight alpha.
pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/codec.rs"]
mod tests;
