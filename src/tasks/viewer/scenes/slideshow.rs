use std::time::Instant;

use winit::dpi::PhysicalSize;

use crate::adapters::{PagerAdapter, PhotoAdapter};
use crate::config::SlideshowOptions;
use crate::events::Slot;
use crate::slideshow::{Advance, SlideshowState, fit_rect};

use super::{LoadQueue, Scene, SceneContext};
use crate::tasks::viewer::renderer::{Frame, Quad, QuadTexture, TextureLookup, to_wgpu_color};

pub struct SlideshowScene {
    adapter: PagerAdapter,
    state: SlideshowState,
    clear: wgpu::Color,
}

impl SlideshowScene {
    pub fn new(adapter: PagerAdapter, opts: &SlideshowOptions) -> Self {
        let state = SlideshowState::new(adapter.item_count(), opts.interval, opts.transition);
        Self {
            adapter,
            state,
            clear: to_wgpu_color(opts.background_color()),
        }
    }

    pub fn tick(&mut self, now: Instant) -> Option<Advance> {
        self.state.tick(now)
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn is_fading(&self, now: Instant) -> bool {
        self.state.fade_frame(now).is_some()
    }

    pub fn next_wakeup(&self, now: Instant) -> Option<Instant> {
        self.state.next_wakeup(now)
    }

    fn page(&self, ctx: &SceneContext<'_>, position: usize, alpha: f32) -> Option<Quad> {
        let slot = Slot::Page(position);
        let (w, h) = ctx.textures.dimensions(slot)?;
        Some(Quad {
            texture: QuadTexture::Photo(slot),
            rect: fit_rect(w, h, ctx.surface.width, ctx.surface.height),
            alpha,
        })
    }

    fn request(&self, ctx: &SceneContext<'_>, loads: &mut LoadQueue, position: usize) {
        if ctx.textures.contains(Slot::Page(position)) {
            return;
        }
        if let Some(bind) = self.adapter.bind(position) {
            loads.request(bind);
        }
    }
}

impl Scene for SlideshowScene {
    fn on_enter(&mut self, now: Instant) {
        self.state.start(now);
    }

    fn on_exit(&mut self) {
        self.state.stop();
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        self.adapter.resize(new_size.width, new_size.height);
    }

    fn compose(&mut self, ctx: &SceneContext<'_>, loads: &mut LoadQueue) -> Frame {
        let mut quads = Vec::new();
        if !self.state.is_empty() {
            let current = self.state.current();
            self.request(ctx, loads, current);
            if let Some(next) = self.state.next() {
                self.request(ctx, loads, next);
            }

            match self.state.fade_frame(ctx.now) {
                Some(fade) => {
                    let (out_alpha, in_alpha) = fade.alphas();
                    quads.extend(self.page(ctx, fade.from, out_alpha));
                    quads.extend(self.page(ctx, fade.to, in_alpha));
                }
                None => quads.extend(self.page(ctx, current, 1.0)),
            }
        }
        Frame {
            clear: self.clear,
            quads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{ImageRef, PhotoLibrary};
    use crate::tasks::viewer::scenes::tests::LoadedTextures;
    use std::path::PathBuf;
    use std::time::UNIX_EPOCH;
    use tokio::sync::mpsc;

    const SURFACE: PhysicalSize<u32> = PhysicalSize::new(1920, 1080);

    fn scene(items: usize) -> SlideshowScene {
        let lib = PhotoLibrary::from_images(
            (0..items)
                .map(|i| ImageRef {
                    path: PathBuf::from(format!("{i}.jpg")),
                    added_at: UNIX_EPOCH,
                })
                .collect(),
        );
        let adapter = PagerAdapter::new(lib, SURFACE.width, SURFACE.height);
        SlideshowScene::new(adapter, &SlideshowOptions::default())
    }

    #[test]
    fn requests_current_and_next_page() {
        let mut show = scene(3);
        let now = Instant::now();
        show.on_enter(now);
        let (tx, mut rx) = mpsc::channel(8);
        let mut loads = LoadQueue::new(tx);
        let textures = LoadedTextures::default();
        let ctx = SceneContext {
            textures: &textures,
            surface: SURFACE,
            now,
        };

        let frame = show.compose(&ctx, &mut loads);
        assert!(frame.quads.is_empty());
        assert_eq!(rx.try_recv().unwrap().slot, Slot::Page(0));
        assert_eq!(rx.try_recv().unwrap().slot, Slot::Page(1));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn crossfade_draws_both_pages() {
        let opts = SlideshowOptions::default();
        let mut show = scene(3);
        let t0 = Instant::now();
        show.on_enter(t0);
        assert!(show.tick(t0 + opts.interval).is_some());

        let (tx, _rx) = mpsc::channel(8);
        let mut loads = LoadQueue::new(tx);
        let mut textures = LoadedTextures::default();
        textures.0.insert(Slot::Page(0), (1920, 1080));
        textures.0.insert(Slot::Page(1), (1080, 1920));
        let ctx = SceneContext {
            textures: &textures,
            surface: SURFACE,
            now: t0 + opts.interval + opts.transition / 2,
        };

        let frame = show.compose(&ctx, &mut loads);
        assert_eq!(frame.quads.len(), 2);
        let (outgoing, incoming) = (frame.quads[0], frame.quads[1]);
        assert_eq!(outgoing.texture, QuadTexture::Photo(Slot::Page(0)));
        assert_eq!(incoming.texture, QuadTexture::Photo(Slot::Page(1)));
        assert!((outgoing.alpha - 0.5).abs() < 1e-3);
        assert!((incoming.alpha - 0.5).abs() < 1e-3);
        assert!((incoming.rect.w - 607.5).abs() < 1e-3);
    }

    #[test]
    fn leaving_stops_the_timer() {
        let mut show = scene(2);
        show.on_enter(Instant::now());
        assert!(show.is_running());
        show.on_exit();
        assert!(!show.is_running());
    }
}
