use std::cmp::Reverse;
use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::config::Configuration;
use crate::error::LibraryError;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// A picture in the library together with the time it was added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub path: PathBuf,
    pub added_at: SystemTime,
}

/// Immutable, cheaply clonable list of pictures shared by both views.
#[derive(Debug, Clone, Default)]
pub struct PhotoLibrary {
    images: Arc<[ImageRef]>,
}

impl PhotoLibrary {
    pub fn from_images(images: Vec<ImageRef>) -> Self {
        Self {
            images: images.into(),
        }
    }

    /// Checks access, queries the library once and shuffles the result.
    #[instrument(skip(cfg), fields(root = %cfg.photo_library_path.display()))]
    pub fn load(cfg: &Configuration) -> Result<Self, LibraryError> {
        check_access(&cfg.photo_library_path)?;
        let mut images = query(&cfg.photo_library_path)?;
        shuffle(&mut images, cfg.startup_shuffle_seed);
        info!(
            discovered = images.len(),
            seeded = cfg.startup_shuffle_seed.is_some(),
            "photo library loaded (shuffled)"
        );
        Ok(Self::from_images(images))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&ImageRef> {
        self.images.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageRef> {
        self.images.iter()
    }
}

/// Fails unless `root` is a directory this process may list.
pub fn check_access(root: &Path) -> Result<(), LibraryError> {
    let meta = fs::metadata(root).map_err(|err| classify(root, err))?;
    if !meta.is_dir() {
        return Err(LibraryError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|err| classify(root, err))?;
    Ok(())
}

fn classify(root: &Path, err: std::io::Error) -> LibraryError {
    match err.kind() {
        ErrorKind::NotFound => LibraryError::Missing(root.to_path_buf()),
        ErrorKind::PermissionDenied => LibraryError::AccessDenied(root.to_path_buf()),
        _ => LibraryError::Io(err),
    }
}

/// Recursively lists the pictures under `root`, newest first.
pub fn query(root: &Path) -> Result<Vec<ImageRef>, LibraryError> {
    let mut images = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if err.depth() == 0 {
                    if let Some(io) = err.into_io_error() {
                        return Err(classify(root, io));
                    }
                    return Err(LibraryError::Missing(root.to_path_buf()));
                }
                warn!("skipping unreadable library entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }
        let added_at = entry
            .metadata()
            .ok()
            .and_then(|meta| meta.modified().or_else(|_| meta.created()).ok())
            .unwrap_or(UNIX_EPOCH);
        debug!(path = %entry.path().display(), "library: add");
        images.push(ImageRef {
            path: entry.into_path(),
            added_at,
        });
    }
    images.sort_by(|a, b| {
        Reverse(a.added_at)
            .cmp(&Reverse(b.added_at))
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(images)
}

pub fn shuffle(images: &mut [ImageRef], seed: Option<u64>) {
    match seed {
        Some(seed) => images.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => images.shuffle(&mut rand::rng()),
    }
}

#[inline]
pub fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if IMAGE_EXTENSIONS.contains(&e.as_str())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn image_at(name: &str, secs: u64) -> ImageRef {
        ImageRef {
            path: PathBuf::from(name),
            added_at: UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    #[test]
    fn recognises_image_extensions_case_insensitively() {
        assert!(is_image(Path::new("/a/b.JPG")));
        assert!(is_image(Path::new("c.webp")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("no_extension")));
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let base: Vec<ImageRef> = (0..16).map(|i| image_at(&format!("{i}.jpg"), i)).collect();
        let mut a = base.clone();
        let mut b = base.clone();
        shuffle(&mut a, Some(7));
        shuffle(&mut b, Some(7));
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_by(|x, y| x.path.cmp(&y.path));
        let mut expected = base;
        expected.sort_by(|x, y| x.path.cmp(&y.path));
        assert_eq!(sorted, expected, "shuffle must be a permutation");
    }

    #[test]
    fn library_clones_share_storage() {
        let lib = PhotoLibrary::from_images(vec![image_at("a.jpg", 1), image_at("b.jpg", 2)]);
        let other = lib.clone();
        assert_eq!(other.len(), 2);
        assert!(std::ptr::eq(
            lib.get(0).unwrap() as *const ImageRef,
            other.get(0).unwrap() as *const ImageRef
        ));
        assert!(lib.get(2).is_none());
    }
}
