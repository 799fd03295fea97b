use std::path::PathBuf;

use crate::adapters::Fit;

/// Emitted by the power task whenever the charging signal changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    Connected,
    Disconnected,
}

impl PowerEvent {
    pub fn from_charging(charging: bool) -> Self {
        if charging {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }

    pub fn is_charging(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Which cache slot a decoded picture belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Thumbnail(usize),
    Page(usize),
}

impl Slot {
    pub fn position(self) -> usize {
        match self {
            Self::Thumbnail(pos) | Self::Page(pos) => pos,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadPhoto {
    pub slot: Slot,
    pub path: PathBuf,
    pub fit: Fit,
}

#[derive(Debug, Clone)]
pub struct PreparedImageCpu {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PhotoLoaded {
    pub slot: Slot,
    /// The box the pixels were sized for.
    pub fit: Fit,
    pub prepared: PreparedImageCpu,
}

/// The loader could not decode the file; views leave its cell empty.
#[derive(Debug, Clone)]
pub struct PhotoFailed {
    pub slot: Slot,
    pub path: PathBuf,
}

#[derive(Debug)]
pub enum LoaderOutput {
    Loaded(PhotoLoaded),
    Failed(PhotoFailed),
}
