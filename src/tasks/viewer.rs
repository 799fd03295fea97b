mod renderer;
mod scenes;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use scenes::grid::{GridScene, ScrollCommand};
use scenes::slideshow::SlideshowScene;
use scenes::{LoadQueue, Scene, SceneContext};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, Window, WindowAttributes},
};

use crate::{
    adapters::{GridAdapter, PagerAdapter},
    config::Configuration,
    events::{LoadPhoto, LoaderOutput, PowerEvent},
    library::PhotoLibrary,
    mode::{DeviceSignals, ModeSwitch, Orientation, ViewMode},
    platform::screen_wake::ScreenWakeController,
};

use renderer::Renderer;

#[derive(Debug)]
enum ViewerEvent {
    Cancelled,
    Power(PowerEvent),
    Loader(LoaderOutput),
}

struct ViewerApp {
    cfg: Configuration,
    cancel: CancellationToken,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    mode: Option<ModeSwitch>,
    charging: bool,
    grid: GridScene,
    slideshow: SlideshowScene,
    loads: LoadQueue,
    wake: ScreenWakeController,
    pending_redraw: bool,
}

impl ViewerApp {
    fn new(
        library: PhotoLibrary,
        cfg: Configuration,
        cancel: CancellationToken,
        to_loader: mpsc::Sender<LoadPhoto>,
    ) -> Self {
        let initial_size = PhysicalSize::new(1, 1);
        let grid = GridScene::new(
            GridAdapter::new(library.clone(), cfg.grid.thumbnail_size),
            &cfg.grid,
            initial_size,
        );
        let slideshow = SlideshowScene::new(
            PagerAdapter::new(library, initial_size.width, initial_size.height),
            &cfg.slideshow,
        );
        let wake = ScreenWakeController::new(&cfg.screen_wake);
        Self {
            cfg,
            cancel,
            window: None,
            renderer: None,
            mode: None,
            charging: false,
            grid,
            slideshow,
            loads: LoadQueue::new(to_loader),
            wake,
            pending_redraw: false,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let attrs = WindowAttributes::default().with_title("Photo Slide");
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    fn current_mode(&self) -> ViewMode {
        self.mode
            .as_ref()
            .map(ModeSwitch::current)
            .unwrap_or(ViewMode::Grid)
    }

    /// Orientation of the display the window lives on. The window's own
    /// size would flip as soon as the slideshow goes full screen.
    fn orientation(&self, window: &Window) -> Orientation {
        let size = window
            .current_monitor()
            .map(|monitor| monitor.size())
            .unwrap_or_else(|| window.inner_size());
        Orientation::resolve(self.cfg.orientation, size.width, size.height)
    }

    fn enter_mode(&mut self, mode: ViewMode) {
        let Some(window) = self.window.clone() else {
            return;
        };
        match mode {
            ViewMode::Slideshow => {
                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                window.set_cursor_visible(false);
            }
            ViewMode::Grid => {
                window.set_fullscreen(None);
                window.set_cursor_visible(true);
            }
        }
        set_up_scenes(
            mode,
            &mut self.grid,
            &mut self.slideshow,
            &self.wake,
            Instant::now(),
        );
        self.request_redraw();
    }

    fn update_orientation(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let orientation = self.orientation(&window);
        let change = self
            .mode
            .as_mut()
            .and_then(|mode| mode.set_orientation(orientation));
        if let Some(change) = change {
            self.enter_mode(change.to);
        }
    }

    fn handle_power(&mut self, event: PowerEvent) {
        self.charging = event.is_charging();
        debug!(?event, "power event");
        let change = self
            .mode
            .as_mut()
            .and_then(|mode| mode.set_charging(event.is_charging()));
        if let Some(change) = change {
            self.enter_mode(change.to);
        }
    }

    fn handle_loader(&mut self, output: LoaderOutput) {
        match output {
            LoaderOutput::Loaded(done) => {
                if !self.loads.accept(done.slot, done.fit) {
                    debug!(slot = ?done.slot, fit = ?done.fit, "dropping picture sized for a replaced request");
                    return;
                }
                let uploaded = match self.renderer.as_mut() {
                    Some(renderer) => renderer.upload(done.slot, &done.prepared),
                    None => false,
                };
                if !uploaded {
                    self.loads.mark_failed(done.slot);
                }
            }
            LoaderOutput::Failed(failed) => {
                debug!(slot = ?failed.slot, path = %failed.path.display(), "leaving slot empty");
                self.loads.mark_failed(failed.slot);
            }
        }
        self.request_redraw();
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if new_size != renderer.surface_size() {
            renderer.resize(new_size);
            renderer.textures_mut().clear_pages();
            self.loads.forget_pages();
        }
        let size = renderer.surface_size();
        self.grid.handle_resize(size);
        renderer
            .textures_mut()
            .reserve_thumbnails(self.grid.working_set());
        self.slideshow.handle_resize(size);
        self.update_orientation();
        self.request_redraw();
    }

    fn handle_scroll(&mut self, command: ScrollCommand) {
        if self.current_mode() != ViewMode::Grid {
            return;
        }
        if self.grid.scroll(command) {
            self.request_redraw();
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let command = match event.logical_key.as_ref() {
            Key::Named(NamedKey::Escape) => {
                info!("escape pressed; exiting");
                event_loop.exit();
                return;
            }
            Key::Character(c) if c.eq_ignore_ascii_case("q") => {
                info!("quit key pressed; exiting");
                event_loop.exit();
                return;
            }
            Key::Named(NamedKey::ArrowDown) => ScrollCommand::Lines(1.0),
            Key::Named(NamedKey::ArrowUp) => ScrollCommand::Lines(-1.0),
            Key::Named(NamedKey::PageDown) => ScrollCommand::Pages(1.0),
            Key::Named(NamedKey::PageUp) => ScrollCommand::Pages(-1.0),
            Key::Named(NamedKey::Home) => ScrollCommand::Top,
            Key::Named(NamedKey::End) => ScrollCommand::Bottom,
            _ => return,
        };
        self.handle_scroll(command);
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let mode = self.current_mode();
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        self.pending_redraw = false;

        let frame = {
            let ctx = SceneContext {
                textures: renderer.textures(),
                surface: renderer.surface_size(),
                now: Instant::now(),
            };
            match mode {
                ViewMode::Grid => self.grid.compose(&ctx, &mut self.loads),
                ViewMode::Slideshow => self.slideshow.compose(&ctx, &mut self.loads),
            }
        };

        match renderer.render(&frame) {
            Ok(()) => {}
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                let size = renderer.surface_size();
                renderer.resize(size);
                self.request_redraw();
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
            }
            Err(SurfaceError::Other) => {
                warn!("viewer surface reported an unknown error; retrying");
                let size = renderer.surface_size();
                renderer.resize(size);
                self.request_redraw();
            }
        }
    }

    fn request_redraw(&mut self) {
        self.pending_redraw = true;
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.renderer.is_none() {
            match Renderer::new(window.clone()) {
                Ok(renderer) => self.renderer = Some(renderer),
                Err(err) => {
                    error!(error = ?err, "failed to initialize GPU state");
                    event_loop.exit();
                    return;
                }
            }
            self.handle_resize(window.inner_size());
        }

        if self.mode.is_none() {
            let switch = ModeSwitch::new(DeviceSignals {
                orientation: self.orientation(&window),
                charging: self.charging,
            });
            let mode = switch.current();
            self.mode = Some(switch);
            self.enter_mode(mode);
        }

        self.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, event);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let command = match delta {
                    MouseScrollDelta::LineDelta(_, y) => ScrollCommand::Lines(-y),
                    MouseScrollDelta::PixelDelta(pos) => ScrollCommand::Pixels(-pos.y as f32),
                };
                self.handle_scroll(command);
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let mut control = ControlFlow::Wait;
        if self.current_mode() == ViewMode::Slideshow {
            let now = Instant::now();
            // Checked before ticking so the frame that ends a fade is still drawn.
            let fading = self.slideshow.is_fading(now);
            if let Some(advance) = self.slideshow.tick(now) {
                debug!(from = advance.from, to = advance.to, "slideshow advanced");
                self.pending_redraw = true;
            }
            if fading {
                self.pending_redraw = true;
            }
            if let Some(at) = self.slideshow.next_wakeup(now) {
                control = ControlFlow::WaitUntil(at);
            }
        }
        event_loop.set_control_flow(control);

        if self.pending_redraw {
            if let Some(window) = self.window.as_ref() {
                window.request_redraw();
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                event_loop.exit();
            }
            ViewerEvent::Power(power) => self.handle_power(power),
            ViewerEvent::Loader(output) => self.handle_loader(output),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if self.current_mode() == ViewMode::Slideshow {
            self.slideshow.on_exit();
            self.wake.release();
        }
    }
}

/// Starts the scene for `mode` and tears the other one down. Leaving the
/// slideshow stops its timer and releases the screen.
fn set_up_scenes(
    mode: ViewMode,
    grid: &mut GridScene,
    slideshow: &mut SlideshowScene,
    wake: &ScreenWakeController,
    now: Instant,
) {
    match mode {
        ViewMode::Slideshow => {
            wake.inhibit();
            slideshow.on_enter(now);
        }
        ViewMode::Grid => {
            slideshow.on_exit();
            wake.release();
            grid.on_enter(now);
        }
    }
    info!(?mode, "view set up");
}

/// Runs the window on the calling thread until it is closed or `cancel` fires.
pub fn run_windowed(
    library: PhotoLibrary,
    cfg: Configuration,
    to_loader: mpsc::Sender<LoadPhoto>,
    mut from_loader: mpsc::Receiver<LoaderOutput>,
    mut from_power: mpsc::Receiver<PowerEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;

    let cancel_task = {
        let cancel = cancel.clone();
        let proxy = event_loop.create_proxy();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };
    let loader_task = {
        let proxy = event_loop.create_proxy();
        tokio::spawn(async move {
            while let Some(output) = from_loader.recv().await {
                if proxy.send_event(ViewerEvent::Loader(output)).is_err() {
                    break;
                }
            }
        })
    };
    let power_task = {
        let proxy = event_loop.create_proxy();
        tokio::spawn(async move {
            while let Some(event) = from_power.recv().await {
                if proxy.send_event(ViewerEvent::Power(event)).is_err() {
                    break;
                }
            }
        })
    };

    let mut app = ViewerApp::new(library, cfg, cancel, to_loader);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();
    loader_task.abort();
    power_task.abort();

    run_result.context("viewer event loop failed")
}
