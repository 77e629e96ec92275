//! Pixel work: decoding and encoding artifacts, fill-cropping sources, and drawing text labels.

/// Artifact decoding and encoding.
pub mod codec;
/// Crop-to-fill with gravity.
pub mod crop;
/// Font file lookup.
pub mod fonts;
/// Text label drawing.
pub mod label;
