use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::adapters::{BindRequest, Fit};
use crate::events::{LoadPhoto, Slot};

use super::renderer::{Frame, TextureLookup};

pub mod grid;
pub mod slideshow;

pub struct SceneContext<'a> {
    pub textures: &'a dyn TextureLookup,
    pub surface: PhysicalSize<u32>,
    pub now: Instant,
}

pub trait Scene {
    fn on_enter(&mut self, _now: Instant) {}
    fn on_exit(&mut self) {}
    fn handle_resize(&mut self, _new_size: PhysicalSize<u32>) {}
    /// Lays out the next frame and asks the loader for anything missing.
    fn compose(&mut self, ctx: &SceneContext<'_>, loads: &mut LoadQueue) -> Frame;
}

/// Load requests on their way to the loader task.
///
/// A slot is requested at most once until its result comes back. Failed
/// slots are never retried so broken files stay empty instead of looping.
/// Results sized for a request that has since been replaced are refused.
pub struct LoadQueue {
    to_loader: mpsc::Sender<LoadPhoto>,
    requested: HashMap<Slot, Fit>,
    failed: HashSet<Slot>,
}

impl LoadQueue {
    pub fn new(to_loader: mpsc::Sender<LoadPhoto>) -> Self {
        Self {
            to_loader,
            requested: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    pub fn request(&mut self, bind: BindRequest) {
        let slot = bind.slot();
        if self.requested.contains_key(&slot) || self.failed.contains(&slot) {
            return;
        }
        let fit = bind.fit;
        match self.to_loader.try_send(bind.into_load()) {
            Ok(()) => {
                self.requested.insert(slot, fit);
            }
            // Retried on the next frame.
            Err(TrySendError::Full(_)) => debug!(?slot, "loader queue full"),
            Err(TrySendError::Closed(_)) => warn!(?slot, "loader channel closed"),
        }
    }

    pub fn is_failed(&self, slot: Slot) -> bool {
        self.failed.contains(&slot)
    }

    /// Settles the outstanding request for `slot` if the result was sized
    /// for it. Returns false for a stale result, which must be discarded.
    pub fn accept(&mut self, slot: Slot, fit: Fit) -> bool {
        if self.requested.get(&slot) != Some(&fit) {
            return false;
        }
        self.requested.remove(&slot);
        true
    }

    pub fn mark_failed(&mut self, slot: Slot) {
        self.requested.remove(&slot);
        self.failed.insert(slot);
    }

    /// Pages are sized for the surface; a resize makes every page stale.
    pub fn forget_pages(&mut self) {
        self.requested.retain(|slot, _| matches!(slot, Slot::Thumbnail(_)));
    }
}
