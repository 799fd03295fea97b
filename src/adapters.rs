//! List adapters that turn a position in the shared library into a load request.

use std::path::PathBuf;

use crate::events::{LoadPhoto, Slot};
use crate::library::PhotoLibrary;

/// How a decoded picture is sized for its target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fit {
    /// Fill the box exactly, cropping the overflow around the centre.
    CenterCrop { width: u32, height: u32 },
    /// Fit inside the box preserving aspect ratio; never upscales.
    Contain { width: u32, height: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    pub position: usize,
    pub path: PathBuf,
    pub fit: Fit,
}

impl BindRequest {
    pub fn slot(&self) -> Slot {
        match self.fit {
            Fit::CenterCrop { .. } => Slot::Thumbnail(self.position),
            Fit::Contain { .. } => Slot::Page(self.position),
        }
    }

    pub fn into_load(self) -> LoadPhoto {
        LoadPhoto {
            slot: self.slot(),
            path: self.path,
            fit: self.fit,
        }
    }
}

pub trait PhotoAdapter {
    fn item_count(&self) -> usize;
    fn bind(&self, position: usize) -> Option<BindRequest>;
}

/// Square center-cropped thumbnails for the browsing grid.
#[derive(Debug, Clone)]
pub struct GridAdapter {
    library: PhotoLibrary,
    thumbnail_size: u32,
}

impl GridAdapter {
    pub fn new(library: PhotoLibrary, thumbnail_size: u32) -> Self {
        Self {
            library,
            thumbnail_size: thumbnail_size.max(1),
        }
    }
}

impl PhotoAdapter for GridAdapter {
    fn item_count(&self) -> usize {
        self.library.len()
    }

    fn bind(&self, position: usize) -> Option<BindRequest> {
        let image = self.library.get(position)?;
        Some(BindRequest {
            position,
            path: image.path.clone(),
            fit: Fit::CenterCrop {
                width: self.thumbnail_size,
                height: self.thumbnail_size,
            },
        })
    }
}

/// Full-screen pages for the slideshow.
#[derive(Debug, Clone)]
pub struct PagerAdapter {
    library: PhotoLibrary,
    page_width: u32,
    page_height: u32,
}

impl PagerAdapter {
    pub fn new(library: PhotoLibrary, page_width: u32, page_height: u32) -> Self {
        Self {
            library,
            page_width: page_width.max(1),
            page_height: page_height.max(1),
        }
    }

    pub fn resize(&mut self, page_width: u32, page_height: u32) {
        self.page_width = page_width.max(1);
        self.page_height = page_height.max(1);
    }
}

impl PhotoAdapter for PagerAdapter {
    fn item_count(&self) -> usize {
        self.library.len()
    }

    fn bind(&self, position: usize) -> Option<BindRequest> {
        let image = self.library.get(position)?;
        Some(BindRequest {
            position,
            path: image.path.clone(),
            fit: Fit::Contain {
                width: self.page_width,
                height: self.page_height,
            },
        })
    }
}
