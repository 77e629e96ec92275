use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use super::*;

struct Fixed(Option<Vec<u8>>);

impl SourceFetcher for Fixed {
    fn fetch(&self, uri: &str) -> anyhow::Result<Vec<u8>> {
        self.0
            .clone()
            .ok_or_else(|| anyhow::anyhow!("connection refused: {uri}"))
    }
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test]
fn decoded_source_leaves_no_temp_file() {
    let scratch = tempfile::tempdir().unwrap();
    let img = fetch_and_decode(&Fixed(Some(png_bytes())), "http://x/a.png", scratch.path()).unwrap();
    assert_eq!((img.width(), img.height()), (3, 2));
    assert_eq!(entries(scratch.path()), 0);
}

#[test]
fn undecodable_body_leaves_no_temp_file() {
    let scratch = tempfile::tempdir().unwrap();
    let body = b"<html>not an image</html>".to_vec();
    assert!(fetch_and_decode(&Fixed(Some(body)), "http://x/a.png", scratch.path()).is_err());
    assert_eq!(entries(scratch.path()), 0);
}

#[test]
fn failed_fetch_creates_nothing() {
    let scratch = tempfile::tempdir().unwrap();
    let err = fetch_and_decode(&Fixed(None), "http://x/a.png", scratch.path()).unwrap_err();
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(entries(scratch.path()), 0);
}

#[test]
fn missing_scratch_dir_is_an_error() {
    let scratch = tempfile::tempdir().unwrap();
    let gone = scratch.path().join("gone");
    assert!(fetch_and_decode(&Fixed(Some(png_bytes())), "http://x/a.png", &gone).is_err());
}
