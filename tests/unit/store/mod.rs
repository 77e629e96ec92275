use super::*;

#[test]
fn write_atomic_creates_parents_and_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let path = dir.path().join("images/default/a/b/c.jpg");

    store.write_atomic(&path, b"one").unwrap();
    assert_eq!(store.read(&path).unwrap().as_deref(), Some(&b"one"[..]));
    store.write_atomic(&path, b"two").unwrap();
    assert_eq!(store.read(&path).unwrap().as_deref(), Some(&b"two"[..]));

    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .flatten()
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn writes_outside_the_root_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path().join("public"));
    let escape = dir.path().join("public/../elsewhere.jpg");
    assert!(store.write_atomic(&escape, b"x").is_err());
    assert!(!dir.path().join("elsewhere.jpg").exists());
}

#[test]
fn read_missing_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    assert!(store.read(&dir.path().join("nope.png")).unwrap().is_none());
}

#[test]
fn remove_file_is_idempotent_and_scoped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("public");
    let store = ArtifactStore::new(&root);
    let inside = root.join("x.png");
    store.write_atomic(&inside, b"x").unwrap();

    assert!(store.remove_file(&inside).unwrap());
    assert!(!store.remove_file(&inside).unwrap());

    let outside = dir.path().join("keep.png");
    std::fs::write(&outside, b"k").unwrap();
    assert!(!store.remove_file(&outside).unwrap());
    assert!(outside.exists());
}

#[test]
fn list_files_filters_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    for rel in ["a/1.jpg", "a/b/2.png", "c/3.gif", "c/notes.txt", "4.JPG"] {
        let p = dir.path().join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(&p, b"").unwrap();
    }
    let found = store
        .list_files(dir.path(), &["jpg", "png", "gif"])
        .unwrap();
    let rel: Vec<_> = found
        .iter()
        .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(rel, vec!["a/1.jpg", "a/b/2.png", "c/3.gif"]);

    assert!(store
        .list_files(&dir.path().join("missing"), &["jpg"])
        .unwrap()
        .is_empty());
}

#[test]
fn prune_empty_dirs_keeps_the_start_dir_and_non_empty_branches() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let preset = dir.path().join("images/default");
    std::fs::create_dir_all(preset.join("a/b/c")).unwrap();
    std::fs::create_dir_all(preset.join("d")).unwrap();
    std::fs::write(preset.join("d/keep.txt"), b"").unwrap();

    store.prune_empty_dirs(&preset);
    assert!(preset.is_dir());
    assert!(!preset.join("a").exists());
    assert!(preset.join("d/keep.txt").exists());
}

#[test]
fn prune_chain_stops_at_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let preset = dir.path().join("images/default");
    let leaf = preset.join("s1/s2/s3");
    std::fs::create_dir_all(&leaf).unwrap();
    std::fs::write(preset.join("s1/other.jpg"), b"").unwrap();

    store.prune_chain(&leaf, &preset);
    assert!(!preset.join("s1/s2").exists());
    assert!(preset.join("s1").is_dir());

    std::fs::remove_file(preset.join("s1/other.jpg")).unwrap();
    store.prune_chain(&preset.join("s1"), &preset);
    assert!(!preset.join("s1").exists());
    assert!(preset.is_dir());
}

#[test]
fn normalize_lexically_resolves_dots() {
    assert_eq!(
        normalize_lexically(Path::new("/a/b/../c/./d")),
        PathBuf::from("/a/c/d")
    );
    assert_eq!(normalize_lexically(Path::new("/../x")), PathBuf::from("/x"));
    assert_eq!(normalize_lexically(Path::new("a/../../b")), PathBuf::from("b"));
}

#[test]
fn normalize_rel_path_rejects_escapes() {
    assert_eq!(normalize_rel_path("a//./b.jpg").unwrap(), "a/b.jpg");
    assert_eq!(normalize_rel_path("a\\b.jpg").unwrap(), "a/b.jpg");
    assert!(matches!(
        normalize_rel_path("../etc/passwd"),
        Err(PixcacheError::NotFound(_))
    ));
    assert!(normalize_rel_path("/abs.jpg").is_err());
    assert!(normalize_rel_path("").is_err());
}
