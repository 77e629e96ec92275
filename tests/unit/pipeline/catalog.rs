use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbaImage};

use super::*;
use crate::foundation::config::{PixcacheConfig, StorageLocation};
use crate::foundation::error::ErrorKind;
use crate::presets::builtin::builtin_registry;

struct Fixture {
    _dir: tempfile::TempDir,
    config: Arc<PixcacheConfig>,
    catalog: Catalog,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    std::fs::create_dir_all(images.join("photos")).unwrap();
    std::fs::write(images.join("photos/cat.jpg"), b"source").unwrap();

    let mut storage_locations = BTreeMap::new();
    storage_locations.insert("default".to_string(), StorageLocation::Local(images));
    storage_locations.insert(
        "external".to_string(),
        StorageLocation::Remote("http://cdn.example.com".to_string()),
    );
    let config = Arc::new(PixcacheConfig {
        public_root: dir.path().join("public"),
        storage_locations,
        default_storage: "default".to_string(),
        default_image: "fallback.jpg".to_string(),
        ..PixcacheConfig::default()
    });
    let catalog = Catalog::new(
        Resolver::new(Arc::clone(&config)),
        Arc::new(builtin_registry().unwrap()),
    );
    Fixture {
        _dir: dir,
        config,
        catalog,
    }
}

fn write_png(path: &Path, w: u32, h: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::new(w, h))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    std::fs::write(path, out.into_inner()).unwrap();
}

fn resolver(fx: &Fixture) -> Resolver {
    Resolver::new(Arc::clone(&fx.config))
}

#[test]
fn info_reports_missing_artifact_without_metadata() {
    let fx = fixture();
    let url = resolver(&fx)
        .url_for_image("photos/cat.jpg", &UrlOptions::default())
        .unwrap();
    let info = fx
        .catalog
        .info(&url, &InfoOptions { metadata: true, ..InfoOptions::default() })
        .unwrap();
    assert_eq!(info.format, "jpg");
    assert_eq!(info.preset, "default");
    assert!(!info.exists);
    assert_eq!(info.metadata, None);
    assert_eq!(info.source, None);
}

#[test]
fn info_reads_metadata_of_existing_artifact() {
    let fx = fixture();
    let url = resolver(&fx)
        .url_for_image("photos/cat.jpg", &UrlOptions::default().format("png"))
        .unwrap();
    write_png(&fx.config.disk_path_for_url(&url), 6, 3);

    let info = fx
        .catalog
        .info(&url, &InfoOptions { metadata: true, ..InfoOptions::default() })
        .unwrap();
    assert!(info.exists);
    let meta = info.metadata.unwrap();
    assert_eq!((meta.width, meta.height), (6, 3));
    assert!(meta.size > 0);
    assert_eq!(meta.content_type.as_deref(), Some("image/png"));
}

#[test]
fn info_lists_every_preset_with_base_url() {
    let fx = fixture();
    let url = resolver(&fx)
        .url_for_image("photos/cat.jpg", &UrlOptions::default())
        .unwrap();
    let opts = InfoOptions {
        presets: true,
        base_url: "https://img.example.com".to_string(),
        ..InfoOptions::default()
    };
    let presets = fx.catalog.info(&url, &opts).unwrap().presets.unwrap();

    assert_eq!(
        presets.keys().map(String::as_str).collect::<Vec<_>>(),
        ["default", "sample"]
    );
    assert_eq!(presets["default"], format!("https://img.example.com{url}"));
    let sample = resolver(&fx)
        .url_for_image("photos/cat.jpg", &UrlOptions::default().preset("sample"))
        .unwrap();
    assert_eq!(presets["sample"], format!("https://img.example.com{sample}"));
}

#[test]
fn info_relative_preset_urls_skip_base_url() {
    let fx = fixture();
    let url = resolver(&fx)
        .url_for_image("photos/cat.jpg", &UrlOptions::default())
        .unwrap();
    let query = QueryParams::parse("presets&relative");
    let opts = InfoOptions::from_query(&query, "https://img.example.com");
    let presets = fx.catalog.info(&url, &opts).unwrap().presets.unwrap();
    assert_eq!(presets["default"], url);
}

#[test]
fn info_names_the_remote_source() {
    let fx = fixture();
    let url = resolver(&fx)
        .url_for_external_image("http://cdn.example.com/a/b.png", &UrlOptions::default().absolute(true))
        .unwrap();
    let info = fx.catalog.info(&url, &InfoOptions::default()).unwrap();
    assert_eq!(info.source.as_deref(), Some("http://cdn.example.com/a/b.png"));

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["source"], "http://cdn.example.com/a/b.png");
    assert_eq!(json["exists"], false);
    assert!(json.get("metadata").is_none());
    assert!(json.get("presets").is_none());
}

#[test]
fn info_label_presets_are_built_from_the_payload() {
    let fx = fixture();
    let text_url = resolver(&fx)
        .url_for_textim("OK", &UrlOptions::default())
        .unwrap();
    let opts = InfoOptions {
        presets: true,
        relative: true,
        ..InfoOptions::default()
    };
    let presets = fx
        .catalog
        .info(&text_url.to_url(), &opts)
        .unwrap()
        .presets
        .unwrap();
    assert_eq!(presets.len(), 3);
    assert_eq!(presets["default"], text_url.to_url());
    assert!(presets["inverse"].starts_with("/textim/inverse/"));
}

#[test]
fn info_rejects_tampered_urls() {
    let fx = fixture();
    let url = resolver(&fx)
        .url_for_image("photos/cat.jpg", &UrlOptions::default())
        .unwrap();
    let tampered = url.replacen("/default/", "/sample/", 1);
    let err = fx.catalog.info(&tampered, &InfoOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn locate_defaults_match_the_builder() {
    let fx = fixture();
    let located = fx
        .catalog
        .locate(Namespace::Images, "photos/cat.jpg\n", &QueryParams::default(), "http://h")
        .unwrap();
    let expected = resolver(&fx)
        .url_for_image("photos/cat.jpg", &UrlOptions::default())
        .unwrap();
    assert_eq!(located.url, format!("http://h{expected}"));
    assert_eq!(located.status_code(), 200);
    assert_eq!(located.location(), None);
}

#[test]
fn locate_honours_query_options_and_redirect() {
    let fx = fixture();
    let query = QueryParams::parse("preset=sample&format=png&relative&redirect");
    let located = fx
        .catalog
        .locate(Namespace::Images, "photos/cat.jpg", &query, "http://h")
        .unwrap();
    let expected = resolver(&fx)
        .url_for_image(
            "photos/cat.jpg",
            &UrlOptions::default().preset("sample").format("png"),
        )
        .unwrap();
    assert_eq!(located.url, expected);
    assert_eq!(located.status_code(), 301);
    assert_eq!(located.location(), Some(expected.as_str()));
}

#[test]
fn locate_label_returns_payload_url() {
    let fx = fixture();
    let located = fx
        .catalog
        .locate(Namespace::Textim, "OK", &QueryParams::parse("relative"), "")
        .unwrap();
    assert_eq!(
        located.url,
        "/textim/default/7de9b4e7/1e951441/20fc509f/ee2b3ce0.png?t=4f4b"
    );
}

#[test]
fn locate_blank_body_is_bad_request() {
    let fx = fixture();
    let err = fx
        .catalog
        .locate(Namespace::Images, "  \n", &QueryParams::default(), "")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[test]
fn image_index_samples_default_image_per_preset() {
    let fx = fixture();
    let entries = fx.catalog.index(Namespace::Images).unwrap();
    assert_eq!(
        entries.iter().map(|e| e.preset.as_str()).collect::<Vec<_>>(),
        ["default", "sample"]
    );
    let expected = resolver(&fx)
        .url_for_image(
            "fallback.jpg",
            &UrlOptions::default().preset("sample").format("png").storage("default"),
        )
        .unwrap();
    assert_eq!(entries[1].url, expected);
}

#[test]
fn text_index_renders_preset_names() {
    let fx = fixture();
    let entries = fx.catalog.index(Namespace::Textim).unwrap();
    assert_eq!(entries.len(), 3);
    let inverse = entries.iter().find(|e| e.preset == "inverse").unwrap();
    let expected = resolver(&fx)
        .url_for_textim("inverse", &UrlOptions::default().preset("inverse"))
        .unwrap()
        .to_url();
    assert_eq!(inverse.url, expected);

    let html = fx.catalog.index_html(Namespace::Textim).unwrap();
    assert_eq!(html.matches("<img src=").count(), 3);
}
