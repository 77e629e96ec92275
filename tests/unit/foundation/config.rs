use super::*;

#[test]
fn defaults_match_the_stock_deployment() {
    let cfg = PixcacheConfig::default();
    assert_eq!(cfg.secret, "graphicsecret");
    assert_eq!(cfg.known_extensions(), vec!["gif", "jpg", "png"]);
    assert_eq!(cfg.default_image, "fallback.jpg");
    assert!(matches!(
        cfg.storage("flickr"),
        Some(StorageLocation::Remote(_))
    ));
    cfg.validate().unwrap();
}

#[test]
fn storage_locations_deserialize_by_scheme() {
    let json = r#"{
        "storage_locations": {
            "default": "/srv/images",
            "external": "https://cdn.example.com/"
        }
    }"#;
    let cfg: PixcacheConfig = serde_json::from_str(json).unwrap();
    assert_eq!(
        cfg.storage("default"),
        Some(&StorageLocation::Local(PathBuf::from("/srv/images")))
    );
    assert_eq!(
        cfg.storage("external"),
        Some(&StorageLocation::Remote("https://cdn.example.com/".to_string()))
    );
    assert!(cfg.storage("flickr").is_none());
}

#[test]
fn storage_join_uses_single_slash() {
    let local = StorageLocation::Local(PathBuf::from("/srv/images/"));
    assert_eq!(local.join("a/b.jpg"), "/srv/images/a/b.jpg");
    let remote = StorageLocation::Remote("http://static.flickr.com".to_string());
    assert_eq!(remote.join("/1/2.jpg"), "http://static.flickr.com/1/2.jpg");
}

#[test]
fn namespace_base_honours_prefix() {
    let mut cfg = PixcacheConfig::default();
    assert_eq!(cfg.namespace_base(Namespace::Images), "/images");
    cfg.path_prefix = Some("/graphics/".to_string());
    assert_eq!(cfg.namespace_base(Namespace::Textim), "/graphics/textim");
    assert_eq!(
        cfg.namespace_root(Namespace::External),
        PathBuf::from("public").join("graphics").join("external")
    );
}

#[test]
fn disk_path_drops_query_string() {
    let cfg = PixcacheConfig::default();
    assert_eq!(
        cfg.disk_path_for_url("/textim/default/a/b/c/d.png?t=4f4b"),
        PathBuf::from("public/textim/default/a/b/c/d.png")
    );
}

#[test]
fn validate_rejects_unusable_config() {
    let mut cfg = PixcacheConfig::default();
    cfg.secret.clear();
    assert!(matches!(cfg.validate(), Err(PixcacheError::Config(_))));

    let mut cfg = PixcacheConfig::default();
    cfg.mime_types
        .insert("xyz".to_string(), "application/x-nope".to_string());
    assert!(cfg.validate().is_err());

    let mut cfg = PixcacheConfig::default();
    cfg.mime_types.clear();
    assert!(cfg.validate().is_err());
}

#[test]
fn unknown_fields_are_rejected() {
    let json = r#"{ "secrett": "typo" }"#;
    assert!(serde_json::from_str::<PixcacheConfig>(json).is_err());
}

#[test]
fn formats_resolve_from_mime_table() {
    let cfg = PixcacheConfig::default();
    let png = cfg.format("png").unwrap();
    assert_eq!(png.mime(), "image/png");
    assert!(png.supports_alpha());
    let jpg = cfg.format("jpg").unwrap();
    assert!(!jpg.supports_alpha());
    assert!(cfg.format("bmp").is_none());
}
