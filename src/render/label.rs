use image::RgbaImage;

use crate::foundation::core::ArtifactFormat;
use crate::foundation::error::{PixcacheError, PixcacheResult};
use crate::render::codec::unpremultiply_rgba8_in_place;
use crate::render::crop::Gravity;
use crate::render::fonts::FontLocator;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Straight-alpha RGBA8 color, also used as the Parley text brush.
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque red.
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// Opaque color from channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    fn to_paint(self) -> vello_cpu::peniko::Color {
        vello_cpu::peniko::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

/// How a text label is drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelStyle {
    /// Canvas color behind the text.
    pub background: Rgba8,
    /// Text color.
    pub fill: Rgba8,
    /// Where the text sits when the canvas is larger than the text.
    pub gravity: Gravity,
    /// Font size in pixels.
    pub point_size: f32,
    /// Transparent frame added around the canvas.
    pub border_size: u32,
    /// Horizontal and vertical padding around the measured text.
    pub padding: (u32, u32),
    /// Render a transparent background for formats that carry alpha.
    pub alpha: bool,
    /// Fixed canvas height; the measured text height (plus padding) when `None`.
    pub height: Option<u32>,
    /// Font file name; the locator's default font when `None`.
    pub font: Option<String>,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            background: Rgba8::WHITE,
            fill: Rgba8::BLACK,
            gravity: Gravity::Center,
            point_size: 12.0,
            border_size: 0,
            padding: (0, 0),
            alpha: false,
            height: None,
            font: None,
        }
    }
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<Rgba8>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct a new layout engine with fresh Parley contexts.
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Shape and lay out a single unwrapped run of text.
    pub(crate) fn layout_plain(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        brush: Rgba8,
    ) -> PixcacheResult<parley::Layout<Rgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(PixcacheError::internal(
                "label point size must be finite and > 0",
            ));
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| PixcacheError::internal("font bytes contain no font family"))?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| PixcacheError::internal("registered font family has no name"))?
            .to_string();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<Rgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// Pixel extent of a label's text, before padding and borders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextExtent {
    /// Advance width, rounded up.
    pub width: u32,
    /// Line height, rounded up.
    pub height: u32,
}

/// Lay the text out without drawing it.
pub fn measure_text(
    text: &str,
    style: &LabelStyle,
    fonts: &FontLocator,
) -> PixcacheResult<TextExtent> {
    let font_bytes = fonts.load(style.font.as_deref())?;
    let layout =
        TextLayoutEngine::new().layout_plain(text, &font_bytes, style.point_size, style.fill)?;
    Ok(extent_of(&layout))
}

/// Draw `text` as a label.
///
/// The canvas is as wide as the text plus horizontal padding and as tall as `style.height` (or the
/// text plus vertical padding). Formats with alpha get a transparent background when
/// `style.alpha` is set.
pub fn render_label(
    text: &str,
    style: &LabelStyle,
    format: &ArtifactFormat,
    fonts: &FontLocator,
) -> PixcacheResult<RgbaImage> {
    let prepared = PreparedLabel::new(text, style, fonts, style.fill)?;
    let background = if style.alpha && format.supports_alpha() {
        Rgba8::TRANSPARENT
    } else {
        style.background
    };
    prepared.draw(Some(background))
}

/// Draw `text` cut out of a solid background.
///
/// Glyph coverage becomes transparency in formats with alpha; elsewhere the cut-out shows white.
pub fn render_inverse_label(
    text: &str,
    style: &LabelStyle,
    format: &ArtifactFormat,
    fonts: &FontLocator,
) -> PixcacheResult<RgbaImage> {
    let prepared = PreparedLabel::new(text, style, fonts, Rgba8::WHITE)?;
    let mut mask = prepared.draw(None)?;

    let bg = style.background;
    let keeps_alpha = format.supports_alpha();
    let inner = prepared.inner_rect();
    for (x, y, px) in mask.enumerate_pixels_mut() {
        if !inner.contains(x, y) {
            continue;
        }
        let coverage = u16::from(px.0[3]);
        let keep = 255 - coverage;
        px.0 = if keeps_alpha {
            [bg.r, bg.g, bg.b, mul_div255(u16::from(bg.a), keep)]
        } else {
            [
                mul_div255(u16::from(bg.r), keep) + mul_div255(255, coverage),
                mul_div255(u16::from(bg.g), keep) + mul_div255(255, coverage),
                mul_div255(u16::from(bg.b), keep) + mul_div255(255, coverage),
                255,
            ]
        };
    }
    Ok(mask)
}

fn mul_div255(a: u16, b: u16) -> u8 {
    (((u32::from(a) * u32::from(b)) + 127) / 255) as u8
}

fn extent_of(layout: &parley::Layout<Rgba8>) -> TextExtent {
    TextExtent {
        width: layout.width().ceil().max(0.0) as u32,
        height: layout.height().ceil().max(0.0) as u32,
    }
}

#[derive(Clone, Copy, Debug)]
struct InnerRect {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl InnerRect {
    fn contains(self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

struct PreparedLabel {
    layout: parley::Layout<Rgba8>,
    font: vello_cpu::peniko::FontData,
    border: u32,
    inner_w: u32,
    inner_h: u32,
    origin: (f64, f64),
}

impl PreparedLabel {
    fn new(
        text: &str,
        style: &LabelStyle,
        fonts: &FontLocator,
        brush: Rgba8,
    ) -> PixcacheResult<Self> {
        let font_bytes = fonts.load(style.font.as_deref())?;
        let layout =
            TextLayoutEngine::new().layout_plain(text, &font_bytes, style.point_size, brush)?;
        let extent = extent_of(&layout);

        let (pad_x, pad_y) = style.padding;
        let inner_w = (extent.width + 2 * pad_x).max(1);
        let inner_h = style
            .height
            .unwrap_or(extent.height + 2 * pad_y)
            .max(1);

        let (ax, ay) = style.gravity.anchor();
        let slack_x = inner_w.saturating_sub(extent.width + 2 * pad_x);
        let slack_y = inner_h.saturating_sub(extent.height + 2 * pad_y);
        let origin = (
            f64::from(style.border_size + pad_x) + f64::from(slack_x) * ax,
            f64::from(style.border_size + pad_y) + f64::from(slack_y) * ay,
        );

        let font = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);
        Ok(Self {
            layout,
            font,
            border: style.border_size,
            inner_w,
            inner_h,
            origin,
        })
    }

    fn inner_rect(&self) -> InnerRect {
        InnerRect {
            x0: self.border,
            y0: self.border,
            x1: self.border + self.inner_w,
            y1: self.border + self.inner_h,
        }
    }

    fn canvas_size(&self) -> PixcacheResult<(u16, u16)> {
        let w = self.inner_w + 2 * self.border;
        let h = self.inner_h + 2 * self.border;
        let w = u16::try_from(w)
            .map_err(|_| PixcacheError::internal(format!("label width {w} exceeds u16")))?;
        let h = u16::try_from(h)
            .map_err(|_| PixcacheError::internal(format!("label height {h} exceeds u16")))?;
        Ok((w, h))
    }

    fn draw(&self, background: Option<Rgba8>) -> PixcacheResult<RgbaImage> {
        let (w, h) = self.canvas_size()?;
        let mut ctx = vello_cpu::RenderContext::new(w, h);

        if let Some(bg) = background {
            let inner = self.inner_rect();
            ctx.set_paint(bg.to_paint());
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                f64::from(inner.x0),
                f64::from(inner.y0),
                f64::from(inner.x1),
                f64::from(inner.y1),
            ));
        }

        ctx.set_transform(vello_cpu::kurbo::Affine::translate(self.origin));
        for line in self.layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                ctx.set_paint(run.style().brush.to_paint());
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&self.font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }

        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        let mut data = pixmap.data_as_u8_slice().to_vec();
        unpremultiply_rgba8_in_place(&mut data);
        RgbaImage::from_raw(u32::from(w), u32::from(h), data)
            .ok_or_else(|| PixcacheError::internal("label pixmap has unexpected size"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/label.rs"]
mod tests;
