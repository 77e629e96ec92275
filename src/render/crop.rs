use std::fmt;

use image::{DynamicImage, imageops::FilterType};

use crate::foundation::error::{PixcacheError, PixcacheResult};

/// Edge or corner a crop (or a label's text) is anchored to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Gravity {
    /// Top-left.
    NorthWest,
    /// Top edge.
    North,
    /// Top-right.
    NorthEast,
    /// Left edge.
    West,
    /// Middle.
    #[default]
    Center,
    /// Right edge.
    East,
    /// Bottom-left.
    SouthWest,
    /// Bottom edge.
    South,
    /// Bottom-right.
    SouthEast,
}

impl Gravity {
    /// Parse a request's `gravity` parameter. Missing or unknown values mean [`Gravity::Center`].
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("northwest") => Self::NorthWest,
            Some("north") => Self::North,
            Some("northeast") => Self::NorthEast,
            Some("west") => Self::West,
            Some("east") => Self::East,
            Some("southwest") => Self::SouthWest,
            Some("south") => Self::South,
            Some("southeast") => Self::SouthEast,
            _ => Self::Center,
        }
    }

    /// Parameter spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NorthWest => "northwest",
            Self::North => "north",
            Self::NorthEast => "northeast",
            Self::West => "west",
            Self::Center => "center",
            Self::East => "east",
            Self::SouthWest => "southwest",
            Self::South => "south",
            Self::SouthEast => "southeast",
        }
    }

    /// Horizontal and vertical anchor as fractions of the slack (0 = left/top, 1 = right/bottom).
    pub fn anchor(self) -> (f64, f64) {
        let x = match self {
            Self::NorthWest | Self::West | Self::SouthWest => 0.0,
            Self::North | Self::Center | Self::South => 0.5,
            Self::NorthEast | Self::East | Self::SouthEast => 1.0,
        };
        let y = match self {
            Self::NorthWest | Self::North | Self::NorthEast => 0.0,
            Self::West | Self::Center | Self::East => 0.5,
            Self::SouthWest | Self::South | Self::SouthEast => 1.0,
        };
        (x, y)
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cut the largest `width`:`height` window out of `src`, anchored at `gravity`, and scale only
/// that window to `width`×`height`.
pub fn crop_fill(
    src: &DynamicImage,
    width: u32,
    height: u32,
    gravity: Gravity,
) -> PixcacheResult<DynamicImage> {
    if width == 0 || height == 0 {
        return Err(PixcacheError::internal("crop target must be non-empty"));
    }
    let (sw, sh) = (src.width(), src.height());
    if sw == 0 || sh == 0 {
        return Err(PixcacheError::internal("source image has no pixels"));
    }

    // source relatively wider than the target keeps full height, otherwise full width
    let (cw, ch) = if u64::from(sw) * u64::from(height) >= u64::from(sh) * u64::from(width) {
        let cw = (f64::from(sh) * f64::from(width) / f64::from(height)).round() as u32;
        (cw.clamp(1, sw), sh)
    } else {
        let ch = (f64::from(sw) * f64::from(height) / f64::from(width)).round() as u32;
        (sw, ch.clamp(1, sh))
    };

    let (ax, ay) = gravity.anchor();
    let x = (f64::from(sw - cw) * ax).round() as u32;
    let y = (f64::from(sh - ch) * ay).round() as u32;
    let window = src.crop_imm(x, y, cw, ch);
    if (cw, ch) == (width, height) {
        return Ok(window);
    }
    Ok(window.resize_exact(width, height, FilterType::Lanczos3))
}

#[cfg(test)]
#[path = "../../tests/unit/render/crop.rs"]
mod tests;
