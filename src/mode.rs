//! Orientation/charging driven choice between the grid and the slideshow.

use tracing::info;

use crate::config::OrientationSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Strictly wider than tall is landscape; a square surface counts as portrait.
    pub fn from_size(width: u32, height: u32) -> Self {
        if width > height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }

    pub fn resolve(source: OrientationSource, width: u32, height: u32) -> Self {
        match source {
            OrientationSource::Auto => Self::from_size(width, height),
            OrientationSource::Landscape => Self::Landscape,
            OrientationSource::Portrait => Self::Portrait,
        }
    }

    pub fn is_landscape(self) -> bool {
        matches!(self, Self::Landscape)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSignals {
    pub orientation: Orientation,
    pub charging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Grid,
    Slideshow,
}

impl ViewMode {
    pub fn select(signals: DeviceSignals) -> Self {
        if signals.orientation.is_landscape() && signals.charging {
            Self::Slideshow
        } else {
            Self::Grid
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub from: ViewMode,
    pub to: ViewMode,
}

/// Tracks both signals and reports when the selected view changes.
#[derive(Debug, Clone)]
pub struct ModeSwitch {
    signals: DeviceSignals,
    mode: ViewMode,
}

impl ModeSwitch {
    pub fn new(signals: DeviceSignals) -> Self {
        let mode = ViewMode::select(signals);
        info!(
            landscape = signals.orientation.is_landscape(),
            charging = signals.charging,
            mode = ?mode,
            "initial layout"
        );
        Self { signals, mode }
    }

    pub fn current(&self) -> ViewMode {
        self.mode
    }

    pub fn signals(&self) -> DeviceSignals {
        self.signals
    }

    pub fn set_orientation(&mut self, orientation: Orientation) -> Option<ModeChange> {
        self.update(DeviceSignals {
            orientation,
            ..self.signals
        })
    }

    pub fn set_charging(&mut self, charging: bool) -> Option<ModeChange> {
        self.update(DeviceSignals {
            charging,
            ..self.signals
        })
    }

    /// Every update is logged with both flags, even when nothing changed.
    fn update(&mut self, signals: DeviceSignals) -> Option<ModeChange> {
        info!(
            landscape = signals.orientation.is_landscape(),
            charging = signals.charging,
            "layout update"
        );
        self.signals = signals;
        let to = ViewMode::select(signals);
        if to == self.mode {
            return None;
        }
        let change = ModeChange {
            from: self.mode,
            to,
        };
        self.mode = to;
        info!(from = ?change.from, to = ?change.to, "view mode changed");
        Some(change)
    }
}
