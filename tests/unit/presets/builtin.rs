use std::path::PathBuf;

use super::*;
use crate::foundation::core::{ArtifactFormat, PresetKind};
use crate::render::crop::Gravity;
use crate::render::fonts::FontLocator;

fn fonts() -> FontLocator {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts");
    FontLocator::new(vec![dir], "DejaVuSans.ttf")
}

#[test]
fn stock_names_are_registered() {
    let reg = builtin_registry().unwrap();
    assert_eq!(reg.names(PresetKind::Image), vec!["default", "sample"]);
    assert_eq!(
        reg.names(PresetKind::Text),
        vec!["default", "inverse", "sample"]
    );
}

#[test]
fn default_image_preset_crops_to_128_square() {
    let reg = builtin_registry().unwrap();
    let format = ArtifactFormat::new("jpg", "image/jpeg").unwrap();
    let fonts = fonts();
    let ctx = PresetContext {
        format: &format,
        gravity: Gravity::North,
        fonts: &fonts,
    };
    let src = DynamicImage::new_rgb8(300, 500);
    let out = reg.image("default").unwrap().apply(&src, &ctx).unwrap();
    assert_eq!((out.image.width(), out.image.height()), (128, 128));
    assert_eq!(out.quality, Some(75));

    let out = reg.image("sample").unwrap().apply(&src, &ctx).unwrap();
    assert_eq!((out.image.width(), out.image.height()), (200, 200));
}

#[test]
fn text_presets_render_labels() {
    let reg = builtin_registry().unwrap();
    let format = ArtifactFormat::new("png", "image/png").unwrap();
    let fonts = fonts();
    let ctx = PresetContext {
        format: &format,
        gravity: Gravity::Center,
        fonts: &fonts,
    };
    for name in ["default", "inverse", "sample"] {
        let out = reg.text(name).unwrap().render("OK", &ctx).unwrap();
        assert!(out.image.width() > 0 && out.image.height() > 0, "{name}");
        assert_eq!(out.quality, None);
    }

    let inverse = reg.text("inverse").unwrap().render("OK", &ctx).unwrap();
    assert_eq!(inverse.image.to_rgba8().get_pixel(0, 0).0, [0, 0, 0, 255]);
}

#[test]
fn stock_builder_accepts_more_presets() {
    let reg = builtin_presets()
        .unwrap()
        .register_image("huge", CropFillPreset::square(1024))
        .unwrap()
        .build();
    assert!(reg.contains(PresetKind::Image, "huge"));
    assert!(reg.contains(PresetKind::Image, "default"));
}
