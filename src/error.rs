use std::path::PathBuf;

use thiserror::Error;

/// Failures while opening or scanning the photo library.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The process may not read the library; the user has to grant access first.
    #[error("storage access is required to read photos in {0}")]
    AccessDenied(PathBuf),

    #[error("photo library {0} does not exist")]
    Missing(PathBuf),

    #[error("photo library {0} is not a directory")]
    NotADirectory(PathBuf),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
