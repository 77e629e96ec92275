use super::*;

#[test]
fn later_paths_override_earlier_ones() {
    let bundled = tempfile::tempdir().unwrap();
    let app = tempfile::tempdir().unwrap();
    std::fs::write(bundled.path().join("union.ttf"), b"bundled").unwrap();
    std::fs::write(app.path().join("union.ttf"), b"app").unwrap();

    let fonts = FontLocator::new(
        vec![bundled.path().to_path_buf(), app.path().to_path_buf()],
        "union.ttf",
    );
    assert_eq!(fonts.locate(None).unwrap(), app.path().join("union.ttf"));
    assert_eq!(fonts.load(None).unwrap(), b"app");
}

#[test]
fn unknown_font_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("union.ttf"), b"u").unwrap();
    let fonts = FontLocator::new(vec![dir.path().to_path_buf()], "union.ttf");
    assert_eq!(
        fonts.locate(Some("missing.ttf")).unwrap(),
        dir.path().join("union.ttf")
    );
}

#[test]
fn absolute_font_paths_bypass_search() {
    let dir = tempfile::tempdir().unwrap();
    let font = dir.path().join("custom.otf");
    std::fs::write(&font, b"c").unwrap();
    let fonts = FontLocator::new(vec![], "union.ttf");
    assert_eq!(fonts.locate(font.to_str()).unwrap(), font);
    assert!(fonts.locate(Some("/definitely/not/here.ttf")).is_err());
}

#[test]
fn missing_fonts_are_internal_errors() {
    let fonts = FontLocator::new(vec![PathBuf::from("/nonexistent-fonts")], "union.ttf");
    let err = fonts.locate(None).unwrap_err();
    assert!(matches!(err, PixcacheError::Internal(_)));
}
