/// Axis-aligned rectangle in physical pixels, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn intersects_rows(&self, top: f32, bottom: f32) -> bool {
        self.y + self.h > top && self.y < bottom
    }
}

/// Largest size with the source aspect ratio that fits the canvas. Never upscales.
pub fn resize_to_contain(canvas_w: u32, canvas_h: u32, src_w: u32, src_h: u32) -> (u32, u32) {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let cw = canvas_w.max(1) as f32;
    let ch = canvas_h.max(1) as f32;
    let scale = (cw / iw).min(ch / ih).min(1.0);
    let scale = if scale.is_finite() { scale } else { 1.0 };
    let w = (iw * scale).round().max(1.0);
    let h = (ih * scale).round().max(1.0);
    (w as u32, h as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contain_shrinks_but_never_grows() {
        assert_eq!(resize_to_contain(1920, 1080, 4032, 3024), (1440, 1080));
        assert_eq!(resize_to_contain(1080, 1920, 3024, 4032), (1080, 1440));
        assert_eq!(resize_to_contain(1920, 1080, 800, 600), (800, 600));
    }
}
