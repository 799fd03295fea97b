//! Auto-advancing slideshow timer and cross-fade progress.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::processing::layout::Rect;

/// Repaint cadence while a cross-fade is in flight.
const FADE_FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fade {
    from: usize,
    started_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeFrame {
    pub from: usize,
    pub to: usize,
    /// Linear progress in `0.0..=1.0`; the incoming page is drawn at this alpha.
    pub progress: f32,
}

impl FadeFrame {
    /// Alpha of the outgoing and incoming page.
    pub fn alphas(&self) -> (f32, f32) {
        (1.0 - self.progress, self.progress)
    }
}

#[derive(Debug, Clone)]
pub struct SlideshowState {
    len: usize,
    current: usize,
    interval: Duration,
    transition: Duration,
    next_advance: Option<Instant>,
    fade: Option<Fade>,
}

impl SlideshowState {
    pub fn new(len: usize, interval: Duration, transition: Duration) -> Self {
        Self {
            len,
            current: 0,
            interval,
            transition,
            next_advance: None,
            fade: None,
        }
    }

    /// Starts from the first page; the timer only runs when there is something to show.
    pub fn start(&mut self, now: Instant) {
        self.current = 0;
        self.fade = None;
        self.next_advance = (self.len > 0).then(|| now + self.interval);
        debug!(len = self.len, interval = ?self.interval, "slideshow timer started");
    }

    pub fn stop(&mut self) {
        if self.next_advance.take().is_some() {
            debug!(at = self.current, "slideshow timer stopped");
        }
        self.fade = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_advance.is_some()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn next(&self) -> Option<usize> {
        (self.len > 0).then(|| (self.current + 1) % self.len)
    }

    /// Advances `current` modulo the list length once the interval has elapsed.
    pub fn tick(&mut self, now: Instant) -> Option<Advance> {
        if let Some(fade) = self.fade {
            if now.duration_since(fade.started_at) >= self.transition {
                self.fade = None;
            }
        }

        let deadline = self.next_advance?;
        if now < deadline || self.len == 0 {
            return None;
        }

        let from = self.current;
        let to = (from + 1) % self.len;
        self.current = to;
        self.fade = (from != to && !self.transition.is_zero()).then_some(Fade {
            from,
            started_at: now,
        });

        // Keep a steady cadence but never schedule a burst after a stall.
        let mut next = deadline + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next_advance = Some(next);
        Some(Advance { from, to })
    }

    pub fn fade_frame(&self, now: Instant) -> Option<FadeFrame> {
        let fade = self.fade?;
        let elapsed = now.saturating_duration_since(fade.started_at);
        let progress = if self.transition.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f32() / self.transition.as_secs_f32()).clamp(0.0, 1.0)
        };
        Some(FadeFrame {
            from: fade.from,
            to: self.current,
            progress,
        })
    }

    /// When the event loop should wake up next, if the slideshow needs it.
    pub fn next_wakeup(&self, now: Instant) -> Option<Instant> {
        let advance = self.next_advance?;
        let fading = self
            .fade
            .is_some_and(|fade| now.saturating_duration_since(fade.started_at) < self.transition);
        if fading {
            Some(advance.min(now + FADE_FRAME))
        } else {
            Some(advance)
        }
    }
}

/// Destination of a page letterboxed onto the surface.
///
/// Scales up as well as down, so a page decoded smaller than the surface
/// still fills one axis.
pub fn fit_rect(page_w: u32, page_h: u32, surface_w: u32, surface_h: u32) -> Rect {
    let pw = page_w.max(1) as f32;
    let ph = page_h.max(1) as f32;
    let sw = surface_w.max(1) as f32;
    let sh = surface_h.max(1) as f32;
    let scale = (sw / pw).min(sh / ph);
    let w = pw * scale;
    let h = ph * scale;
    Rect {
        x: (sw - w) * 0.5,
        y: (sh - h) * 0.5,
        w,
        h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(3);
    const FADE: Duration = Duration::from_millis(500);

    #[test]
    fn advances_modulo_length_on_interval() {
        let t0 = Instant::now();
        let mut show = SlideshowState::new(3, INTERVAL, FADE);
        show.start(t0);
        assert!(show.tick(t0 + Duration::from_secs(1)).is_none());
        assert_eq!(
            show.tick(t0 + INTERVAL),
            Some(Advance { from: 0, to: 1 })
        );
        assert_eq!(
            show.tick(t0 + INTERVAL * 2),
            Some(Advance { from: 1, to: 2 })
        );
        assert_eq!(
            show.tick(t0 + INTERVAL * 3),
            Some(Advance { from: 2, to: 0 })
        );
        assert_eq!(show.current(), 0);
    }

    #[test]
    fn empty_library_never_starts_the_timer() {
        let t0 = Instant::now();
        let mut show = SlideshowState::new(0, INTERVAL, FADE);
        show.start(t0);
        assert!(!show.is_running());
        assert!(show.tick(t0 + INTERVAL * 10).is_none());
        assert!(show.next().is_none());
        assert!(show.next_wakeup(t0).is_none());
    }

    #[test]
    fn stop_cancels_pending_advance() {
        let t0 = Instant::now();
        let mut show = SlideshowState::new(2, INTERVAL, FADE);
        show.start(t0);
        show.stop();
        assert!(show.tick(t0 + INTERVAL).is_none());
        assert_eq!(show.current(), 0);
    }

    #[test]
    fn restart_begins_at_first_page() {
        let t0 = Instant::now();
        let mut show = SlideshowState::new(4, INTERVAL, FADE);
        show.start(t0);
        show.tick(t0 + INTERVAL);
        assert_eq!(show.current(), 1);
        show.stop();
        show.start(t0 + INTERVAL * 2);
        assert_eq!(show.current(), 0);
    }

    #[test]
    fn crossfade_progresses_linearly_then_clears() {
        let t0 = Instant::now();
        let mut show = SlideshowState::new(2, INTERVAL, FADE);
        show.start(t0);
        show.tick(t0 + INTERVAL);

        let mid = show.fade_frame(t0 + INTERVAL + FADE / 2).unwrap();
        assert_eq!((mid.from, mid.to), (0, 1));
        let (out_alpha, in_alpha) = mid.alphas();
        assert!((in_alpha - 0.5).abs() < 1e-3);
        assert!((out_alpha - 0.5).abs() < 1e-3);

        assert!(show.tick(t0 + INTERVAL + FADE).is_none());
        assert!(show.fade_frame(t0 + INTERVAL + FADE).is_none());
    }

    #[test]
    fn single_picture_does_not_fade_into_itself() {
        let t0 = Instant::now();
        let mut show = SlideshowState::new(1, INTERVAL, FADE);
        show.start(t0);
        assert_eq!(show.tick(t0 + INTERVAL), Some(Advance { from: 0, to: 0 }));
        assert!(show.fade_frame(t0 + INTERVAL).is_none());
    }

    #[test]
    fn stalled_loop_does_not_burst() {
        let t0 = Instant::now();
        let mut show = SlideshowState::new(5, INTERVAL, FADE);
        show.start(t0);
        let late = t0 + INTERVAL * 4;
        assert!(show.tick(late).is_some());
        assert!(show.tick(late + Duration::from_millis(1)).is_none());
        let mid_fade = late + FADE / 2;
        assert_eq!(show.next_wakeup(mid_fade), Some(mid_fade + FADE_FRAME));
        assert_eq!(show.next_wakeup(late + FADE * 2), Some(late + INTERVAL));
    }

    fn rect_close(a: Rect, b: Rect) {
        let eps = 0.001;
        assert!((a.x - b.x).abs() <= eps, "x mismatch: {a:?} vs {b:?}");
        assert!((a.y - b.y).abs() <= eps, "y mismatch: {a:?} vs {b:?}");
        assert!((a.w - b.w).abs() <= eps, "w mismatch: {a:?} vs {b:?}");
        assert!((a.h - b.h).abs() <= eps, "h mismatch: {a:?} vs {b:?}");
    }

    #[test]
    fn square_page_is_pillarboxed_on_16x9() {
        let rect = fit_rect(1000, 1000, 1920, 1080);
        rect_close(
            rect,
            Rect {
                x: 420.0,
                y: 0.0,
                w: 1080.0,
                h: 1080.0,
            },
        );
    }

    #[test]
    fn wide_page_is_letterboxed_on_16x9() {
        let rect = fit_rect(4000, 2000, 1920, 1080);
        rect_close(
            rect,
            Rect {
                x: 0.0,
                y: 60.0,
                w: 1920.0,
                h: 960.0,
            },
        );
    }

    #[test]
    fn portrait_page_is_pillarboxed() {
        let r = fit_rect(1080, 1920, 1920, 1080);
        assert!((r.h - 1080.0).abs() < 1e-3);
        assert!((r.w - 607.5).abs() < 1e-3);
        assert!((r.x - 656.25).abs() < 1e-3);
        assert_eq!(r.y, 0.0);
    }
}
