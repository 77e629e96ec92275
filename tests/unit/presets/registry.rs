use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn passthrough(src: &DynamicImage, _: &PresetContext<'_>) -> PixcacheResult<Artifact> {
    Ok(Artifact::new(src.clone()))
}

#[test]
fn names_are_normalized() {
    assert_eq!(normalize_preset_name("Sample Preset"), "sample_preset");
    assert_eq!(normalize_preset_name("sample-preset"), "sample_preset");
    assert_eq!(normalize_preset_name("  SAMPLE.preset "), "sample_preset");
    assert_eq!(normalize_preset_name("a--b__c"), "a_b__c");
    assert_eq!(normalize_preset_name("default"), "default");
    assert_eq!(normalize_preset_name("!!"), "");
}

#[test]
fn resolve_is_normalization_insensitive() {
    let reg = PresetRegistry::builder()
        .image_fn("Thumb Small", passthrough)
        .unwrap()
        .build();
    assert!(reg.image("thumb_small").is_ok());
    assert!(reg.image("THUMB-small").is_ok());
    assert!(matches!(
        reg.resolve(PresetKind::Image, "thumb small"),
        Ok(PresetHandler::Image(_))
    ));
}

#[test]
fn image_and_text_tables_are_separate() {
    let reg = PresetRegistry::builder()
        .image_fn("default", passthrough)
        .unwrap()
        .text_fn("default", |_, _| {
            Ok(Artifact::new(DynamicImage::new_rgba8(1, 1)))
        })
        .unwrap()
        .text_fn("banner", |_, _| Ok(Artifact::new(DynamicImage::new_rgba8(1, 1))))
        .unwrap()
        .build();

    assert_eq!(reg.names(PresetKind::Image), vec!["default"]);
    assert_eq!(reg.names(PresetKind::Text), vec!["banner", "default"]);
    assert!(!reg.contains(PresetKind::Image, "banner"));
    assert_eq!(
        reg.resolve(PresetKind::Text, "banner").unwrap().kind(),
        PresetKind::Text
    );
}

#[test]
fn unknown_preset_is_not_found() {
    let reg = PresetRegistry::builder().build();
    let err = reg.resolve(PresetKind::Image, "nope").unwrap_err();
    assert!(matches!(err, PixcacheError::NotFound(_)));
}

#[test]
fn duplicate_and_empty_names_are_rejected() {
    let dup = PresetRegistry::builder()
        .image_fn("thumb", passthrough)
        .unwrap()
        .image_fn("THUMB", passthrough);
    assert!(matches!(dup, Err(PixcacheError::Config(_))));

    let empty = PresetRegistry::builder().image_fn("--", passthrough);
    assert!(matches!(empty, Err(PixcacheError::Config(_))));
}

#[test]
fn closures_are_invoked_through_the_registry() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let reg = PresetRegistry::builder()
        .image_fn("count", |src, _| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(Artifact::new(src.clone()))
        })
        .unwrap()
        .build();

    let format = ArtifactFormat::new("png", "image/png").unwrap();
    let fonts = FontLocator::new(vec![], "union.ttf");
    let ctx = PresetContext {
        format: &format,
        gravity: Gravity::Center,
        fonts: &fonts,
    };
    let src = DynamicImage::new_rgb8(2, 2);
    reg.image("count").unwrap().apply(&src, &ctx).unwrap();
    reg.image("Count").unwrap().apply(&src, &ctx).unwrap();
    assert_eq!(CALLS.load(Ordering::SeqCst), 2);
}
