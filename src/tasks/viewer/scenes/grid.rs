use tracing::debug;
use winit::dpi::PhysicalSize;

use crate::adapters::{GridAdapter, PhotoAdapter};
use crate::config::GridOptions;
use crate::events::Slot;
use crate::grid::{GridLayout, LINE_SCROLL_PX};

use super::{LoadQueue, Scene, SceneContext};
use crate::tasks::viewer::renderer::{Frame, Quad, QuadTexture, TextureLookup, to_wgpu_color};

/// Rows bound beyond the visible ones in each direction.
const LOOKAHEAD_ROWS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollCommand {
    Lines(f32),
    Pixels(f32),
    Pages(f32),
    Top,
    Bottom,
}

pub struct GridScene {
    adapter: GridAdapter,
    columns: u32,
    spacing: u32,
    layout: GridLayout,
    scroll: f32,
    clear: wgpu::Color,
}

impl GridScene {
    pub fn new(adapter: GridAdapter, opts: &GridOptions, size: PhysicalSize<u32>) -> Self {
        let layout = GridLayout::new(
            opts.columns,
            opts.spacing,
            size.width,
            size.height,
            adapter.item_count(),
        );
        Self {
            adapter,
            columns: opts.columns,
            spacing: opts.spacing,
            layout,
            scroll: 0.0,
            clear: to_wgpu_color(opts.background_color()),
        }
    }

    /// Returns true when the offset actually moved.
    pub fn scroll(&mut self, command: ScrollCommand) -> bool {
        let target = match command {
            ScrollCommand::Lines(lines) => self.scroll + lines * LINE_SCROLL_PX,
            ScrollCommand::Pixels(px) => self.scroll + px,
            ScrollCommand::Pages(pages) => self.scroll + pages * self.layout.page_height(),
            ScrollCommand::Top => 0.0,
            ScrollCommand::Bottom => self.layout.max_scroll(),
        };
        let clamped = self.layout.clamp_scroll(target);
        if clamped == self.scroll {
            return false;
        }
        self.scroll = clamped;
        true
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll
    }

    /// Most thumbnails a single frame can bind at the current size.
    pub fn working_set(&self) -> usize {
        self.layout.max_bound_items(LOOKAHEAD_ROWS)
    }
}

impl Scene for GridScene {
    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        self.layout = GridLayout::new(
            self.columns,
            self.spacing,
            new_size.width,
            new_size.height,
            self.adapter.item_count(),
        );
        self.scroll = self.layout.clamp_scroll(self.scroll);
        debug!(
            cell = self.layout.cell_size(),
            rows = self.layout.rows(),
            "grid relaid out"
        );
    }

    fn compose(&mut self, ctx: &SceneContext<'_>, loads: &mut LoadQueue) -> Frame {
        let mut quads = Vec::new();
        let viewport_h = ctx.surface.height as f32;
        for position in self.layout.visible_range(self.scroll, LOOKAHEAD_ROWS) {
            let slot = Slot::Thumbnail(position);
            if loads.is_failed(slot) {
                continue;
            }
            let loaded = ctx.textures.contains(slot);
            if !loaded {
                if let Some(bind) = self.adapter.bind(position) {
                    loads.request(bind);
                }
            }
            let rect = self.layout.cell_rect(position, self.scroll);
            if !rect.intersects_rows(0.0, viewport_h) {
                continue;
            }
            quads.push(Quad {
                texture: if loaded {
                    QuadTexture::Photo(slot)
                } else {
                    QuadTexture::Placeholder
                },
                rect,
                alpha: 1.0,
            });
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
    use std::time::{Instant, UNIX_EPOCH};
    use tokio::sync::mpsc;

    fn scene(items: usize, size: PhysicalSize<u32>) -> GridScene {
        let lib = PhotoLibrary::from_images(
            (0..items)
                .map(|i| ImageRef {
                    path: PathBuf::from(format!("{i}.jpg")),
                    added_at: UNIX_EPOCH,
                })
                .collect(),
        );
        GridScene::new(GridAdapter::new(lib, 200), &GridOptions::default(), size)
    }

    #[test]
    fn keys_scroll_within_content() {
        let mut grid = scene(40, PhysicalSize::new(810, 300));
        assert!(!grid.scroll(ScrollCommand::Lines(-1.0)));
        assert!(grid.scroll(ScrollCommand::Lines(2.0)));
        assert_eq!(grid.scroll_offset(), 2.0 * LINE_SCROLL_PX);
        assert!(grid.scroll(ScrollCommand::Bottom));
        let bottom = grid.scroll_offset();
        assert!(!grid.scroll(ScrollCommand::Pages(1.0)));
        assert!(grid.scroll(ScrollCommand::Top));
        assert_eq!(grid.scroll_offset(), 0.0);
        assert!(bottom > 0.0);
    }

    #[test]
    fn shrinking_content_reclamps_scroll() {
        let mut grid = scene(40, PhysicalSize::new(810, 300));
        grid.scroll(ScrollCommand::Bottom);
        grid.handle_resize(PhysicalSize::new(810, 20_000));
        assert_eq!(grid.scroll_offset(), 0.0);
    }

    #[test]
    fn compose_skips_failed_and_requests_missing_thumbnails() {
        let size = PhysicalSize::new(810, 600);
        let mut grid = scene(3, size);
        let (tx, mut rx) = mpsc::channel(8);
        let mut loads = LoadQueue::new(tx);
        loads.mark_failed(Slot::Thumbnail(2));
        let mut textures = LoadedTextures::default();
        textures.0.insert(Slot::Thumbnail(1), (200, 200));
        let ctx = SceneContext {
            textures: &textures,
            surface: size,
            now: Instant::now(),
        };

        let frame = grid.compose(&ctx, &mut loads);
        let drawn: Vec<_> = frame.quads.iter().map(|q| q.texture).collect();
        assert_eq!(
            drawn,
            vec![
                QuadTexture::Placeholder,
                QuadTexture::Photo(Slot::Thumbnail(1))
            ]
        );
        assert_eq!(rx.try_recv().unwrap().slot, Slot::Thumbnail(0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn working_set_follows_the_window() {
        let mut grid = scene(5000, PhysicalSize::new(810, 600));
        let small = grid.working_set();
        grid.handle_resize(PhysicalSize::new(810, 6000));
        assert!(grid.working_set() > small);
    }
}
