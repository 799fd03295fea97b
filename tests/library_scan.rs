use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use photo_slide::config::Configuration;
use photo_slide::error::LibraryError;
use photo_slide::library::{PhotoLibrary, check_access, query};

fn touch(path: &Path, secs: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = File::create(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

fn config_for(root: &Path, seed: Option<u64>) -> Configuration {
    let yaml = format!("photo-library-path: {}\n", root.display());
    let mut cfg: Configuration = serde_yaml::from_str(&yaml).unwrap();
    cfg.startup_shuffle_seed = seed;
    cfg
}

#[test]
fn query_finds_images_recursively_newest_first() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("old.jpg"), 1_000);
    touch(&root.join("nested/deeper/new.PNG"), 3_000);
    touch(&root.join("nested/middle.webp"), 2_000);
    touch(&root.join("notes.txt"), 4_000);
    touch(&root.join("nested/raw.cr2"), 5_000);

    let images = query(root).unwrap();
    let names: Vec<PathBuf> = images
        .iter()
        .map(|img| img.path.strip_prefix(root).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        names,
        vec![
            PathBuf::from("nested/deeper/new.PNG"),
            PathBuf::from("nested/middle.webp"),
            PathBuf::from("old.jpg"),
        ]
    );
    assert!(images[0].added_at > images[1].added_at);
}

#[test]
fn seeded_load_is_a_reproducible_permutation() {
    let tmp = tempfile::tempdir().unwrap();
    for i in 0..12 {
        touch(&tmp.path().join(format!("{i:02}.jpg")), 100 + i);
    }
    let cfg = config_for(tmp.path(), Some(42));
    let a = PhotoLibrary::load(&cfg).unwrap();
    let b = PhotoLibrary::load(&cfg).unwrap();
    assert_eq!(a.len(), 12);
    let order_a: Vec<_> = a.iter().map(|img| img.path.clone()).collect();
    let order_b: Vec<_> = b.iter().map(|img| img.path.clone()).collect();
    assert_eq!(order_a, order_b);

    let mut sorted = order_a.clone();
    sorted.sort();
    let mut expected: Vec<_> = query(tmp.path())
        .unwrap()
        .into_iter()
        .map(|img| img.path)
        .collect();
    expected.sort();
    assert_eq!(sorted, expected);
}

#[test]
fn empty_library_loads_without_error() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = PhotoLibrary::load(&config_for(tmp.path(), None)).unwrap();
    assert!(lib.is_empty());
}

#[test]
fn missing_library_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("nope");
    assert!(matches!(
        check_access(&missing),
        Err(LibraryError::Missing(path)) if path == missing
    ));
    assert!(matches!(
        PhotoLibrary::load(&config_for(&missing, None)),
        Err(LibraryError::Missing(_))
    ));
}

#[test]
fn file_instead_of_directory_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("photo.jpg");
    touch(&file, 1);
    assert!(matches!(
        check_access(&file),
        Err(LibraryError::NotADirectory(_))
    ));
}

#[cfg(unix)]
#[test]
fn unreadable_library_asks_for_access() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let locked = tmp.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; nothing to assert there.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let err = check_access(&locked).unwrap_err();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    assert!(matches!(err, LibraryError::AccessDenied(_)));
    assert!(err.to_string().contains("storage access is required"));
}
