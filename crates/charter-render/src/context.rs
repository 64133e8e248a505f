//! Immediate-mode drawing over a [`PixelBuffer`].
//!
//! Coordinates passed to a [`DrawContext`] are logical (CSS) pixels. The
//! context multiplies them by its device pixel ratio before rasterising, so
//! callers never deal with physical pixels except for image blits.

use crate::surface::{PixelBuffer, Rgba};

/// Counters for the work a context has done since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Times the active colour actually changed.
    pub color_switches: usize,
    pub strokes: usize,
    pub rects: usize,
    pub images: usize,
    pub clears: usize,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    from: (f64, f64),
    to: (f64, f64),
}

/// Drawing state plus the buffer it draws into.
#[derive(Debug, Clone)]
pub struct DrawContext {
    buffer: PixelBuffer,
    css_width: u32,
    css_height: u32,
    scale: f64,
    color: Rgba,
    line_width: f64,
    cursor: Option<(f64, f64)>,
    path: Vec<Segment>,
    stats: DrawStats,
}

/// Physical size for a logical size at `scale`.
pub fn device_size(css_width: u32, css_height: u32, scale: f64) -> (u32, u32) {
    let w = (css_width as f64 * scale).round().max(0.0) as u32;
    let h = (css_height as f64 * scale).round().max(0.0) as u32;
    (w, h)
}

impl DrawContext {
    pub fn new(css_width: u32, css_height: u32, scale: f64) -> Self {
        let scale = sanitize_scale(scale);
        let (w, h) = device_size(css_width, css_height, scale);
        Self {
            buffer: PixelBuffer::new(w, h),
            css_width,
            css_height,
            scale,
            color: Rgba::BLACK,
            line_width: 1.0,
            cursor: None,
            path: Vec::new(),
            stats: DrawStats::default(),
        }
    }

    /// Resize the backing buffer to `css * scale` and update the scale.
    pub fn resize(&mut self, css_width: u32, css_height: u32, scale: f64) {
        self.scale = sanitize_scale(scale);
        self.css_width = css_width;
        self.css_height = css_height;
        let (w, h) = device_size(css_width, css_height, self.scale);
        self.buffer.resize(w, h);
        self.path.clear();
        self.cursor = None;
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn css_width(&self) -> u32 {
        self.css_width
    }

    pub fn css_height(&self) -> u32 {
        self.css_height
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_zero_sized(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn stats(&self) -> DrawStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = DrawStats::default();
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    /// Set the fill and stroke colour.
    pub fn set_color(&mut self, color: Rgba) {
        if color != self.color {
            self.color = color;
            self.stats.color_switches += 1;
        }
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.line_width = width.max(0.0);
    }

    /// Fill the whole buffer.
    pub fn clear(&mut self, color: Rgba) {
        self.buffer.fill(color);
        self.stats.clears += 1;
    }

    pub fn begin_path(&mut self) {
        self.path.clear();
        self.cursor = None;
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.cursor = Some((x, y));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        if let Some(from) = self.cursor {
            self.path.push(Segment { from, to: (x, y) });
        }
        self.cursor = Some((x, y));
    }

    /// Rasterise the current path with the current colour and line width.
    pub fn stroke(&mut self) {
        self.stats.strokes += 1;
        if self.buffer.is_empty() {
            return;
        }
        let thickness = (self.line_width * self.scale).round().max(1.0) as i64;
        let segments = std::mem::take(&mut self.path);
        for segment in &segments {
            self.raster_segment(segment, thickness);
        }
        self.path = segments;
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.stats.rects += 1;
        let (x0, y0, x1, y1) = self.device_rect(x, y, width, height);
        self.buffer.fill_rect(x0, y0, x1.max(x0 + 1), y1.max(y0 + 1), self.color);
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.stats.rects += 1;
        let (x0, y0, x1, y1) = self.device_rect(x, y, width, height);
        let t = (self.line_width * self.scale).round().max(1.0) as i64;
        let (x1, y1) = (x1.max(x0 + 1), y1.max(y0 + 1));
        let color = self.color;
        self.buffer.fill_rect(x0, y0, x1, (y0 + t).min(y1), color);
        self.buffer.fill_rect(x0, (y1 - t).max(y0), x1, y1, color);
        self.buffer.fill_rect(x0, y0, (x0 + t).min(x1), y1, color);
        self.buffer.fill_rect((x1 - t).max(x0), y0, x1, y1, color);
    }

    /// Blit an image at a physical pixel position.
    pub fn draw_image(&mut self, image: &PixelBuffer, device_x: i64, device_y: i64) {
        self.stats.images += 1;
        self.buffer.blit(image, device_x, device_y);
    }

    /// Replace the whole buffer with `image` in a single copy.
    pub fn present(&mut self, image: &PixelBuffer) -> bool {
        self.stats.images += 1;
        self.buffer.copy_from(image)
    }

    /// Logical to physical coordinate.
    pub fn to_device(&self, v: f64) -> i64 {
        (v * self.scale).round() as i64
    }

    fn device_rect(&self, x: f64, y: f64, width: f64, height: f64) -> (i64, i64, i64, i64) {
        let (left, right) = if width < 0.0 { (x + width, x) } else { (x, x + width) };
        let (top, bottom) = if height < 0.0 { (y + height, y) } else { (y, y + height) };
        (
            (left * self.scale).floor() as i64,
            (top * self.scale).floor() as i64,
            (right * self.scale).ceil() as i64,
            (bottom * self.scale).ceil() as i64,
        )
    }

    fn raster_segment(&mut self, segment: &Segment, thickness: i64) {
        let from = (segment.from.0 * self.scale, segment.from.1 * self.scale);
        let to = (segment.to.0 * self.scale, segment.to.1 * self.scale);
        if !(from.0.is_finite() && from.1.is_finite() && to.0.is_finite() && to.1.is_finite()) {
            return;
        }

        let pad = thickness as f64;
        let bounds = (
            -pad,
            -pad,
            self.buffer.width() as f64 + pad,
            self.buffer.height() as f64 + pad,
        );
        let Some(((x0, y0), (x1, y1))) = clip_segment(from, to, bounds) else {
            return;
        };

        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as i64;
        let half = thickness / 2;
        let color = self.color;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = (x0 + (x1 - x0) * t).round() as i64;
            let y = (y0 + (y1 - y0) * t).round() as i64;
            self.buffer
                .fill_rect(x - half, y - half, x - half + thickness, y - half + thickness, color);
        }
    }
}

/// Liang-Barsky clip of `from -> to` against `(min_x, min_y, max_x, max_y)`.
/// `None` when the segment misses the rectangle.
fn clip_segment(
    from: (f64, f64),
    to: (f64, f64),
    (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    for (p, q) in [
        (-dx, from.0 - min_x),
        (dx, max_x - from.0),
        (-dy, from.1 - min_y),
        (dy, max_y - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some((
        (from.0 + t0 * dx, from.1 + t0 * dy),
        (from.0 + t1 * dx, from.1 + t1 * dy),
    ))
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_pixel_ratio_scales_buffer() {
        let ctx = DrawContext::new(100, 50, 2.0);
        assert_eq!(ctx.buffer().width(), 200);
        assert_eq!(ctx.buffer().height(), 100);
        assert_eq!(ctx.css_width(), 100);
    }

    #[test]
    fn test_resize_updates_scale() {
        let mut ctx = DrawContext::new(10, 10, 1.0);
        ctx.resize(20, 5, 1.5);
        assert_eq!(ctx.scale(), 1.5);
        assert_eq!((ctx.buffer().width(), ctx.buffer().height()), (30, 8));
    }

    #[test]
    fn test_color_switch_counted_only_on_change() {
        let mut ctx = DrawContext::new(4, 4, 1.0);
        ctx.set_color(Rgba::WHITE);
        ctx.set_color(Rgba::WHITE);
        ctx.set_color(Rgba::BLACK);
        assert_eq!(ctx.stats().color_switches, 2);
    }

    #[test]
    fn test_fill_rect_in_logical_pixels() {
        let mut ctx = DrawContext::new(4, 4, 2.0);
        ctx.set_color(Rgba::WHITE);
        ctx.fill_rect(1.0, 1.0, 1.0, 1.0);
        assert_eq!(ctx.buffer().get(2, 2), Some(Rgba::WHITE));
        assert_eq!(ctx.buffer().get(3, 3), Some(Rgba::WHITE));
        assert_eq!(ctx.buffer().get(4, 4), Some(Rgba::TRANSPARENT));
        assert_eq!(ctx.buffer().get(1, 1), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn test_stroke_vertical_line() {
        let mut ctx = DrawContext::new(5, 5, 1.0);
        ctx.set_color(Rgba::WHITE);
        ctx.begin_path();
        ctx.move_to(2.0, 0.0);
        ctx.line_to(2.0, 4.0);
        ctx.stroke();
        for y in 0..5 {
            assert_eq!(ctx.buffer().get(2, y), Some(Rgba::WHITE));
        }
        assert_eq!(ctx.buffer().get(1, 2), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn test_stroke_rect_leaves_interior() {
        let mut ctx = DrawContext::new(6, 6, 1.0);
        ctx.set_color(Rgba::WHITE);
        ctx.stroke_rect(0.0, 0.0, 5.0, 5.0);
        assert_eq!(ctx.buffer().get(0, 0), Some(Rgba::WHITE));
        assert_eq!(ctx.buffer().get(4, 2), Some(Rgba::WHITE));
        assert_eq!(ctx.buffer().get(2, 2), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn test_zero_sized_context_is_noop() {
        let mut ctx = DrawContext::new(0, 0, 2.0);
        assert!(ctx.is_zero_sized());
        ctx.clear(Rgba::WHITE);
        ctx.fill_rect(0.0, 0.0, 10.0, 10.0);
        ctx.begin_path();
        ctx.move_to(0.0, 0.0);
        ctx.line_to(10.0, 10.0);
        ctx.stroke();
        assert!(ctx.buffer().is_empty());
    }

    #[test]
    fn test_clip_segment() {
        let bounds = (0.0, 0.0, 10.0, 10.0);
        let ((x0, y0), (x1, y1)) = clip_segment((-10.0, 5.0), (20.0, 5.0), bounds).unwrap();
        assert!(x0.abs() < 1e-9 && (x1 - 10.0).abs() < 1e-9);
        assert_eq!((y0, y1), (5.0, 5.0));
        assert!(clip_segment((-10.0, 20.0), (20.0, 20.0), bounds).is_none());
        assert!(clip_segment((5.0, 5.0), (6.0, 6.0), bounds).is_some());
    }

    #[test]
    fn test_stroke_far_outside_surface_is_solid() {
        let mut ctx = DrawContext::new(100, 100, 1.0);
        ctx.set_color(Rgba::WHITE);
        ctx.begin_path();
        ctx.move_to(-100_000.0, 50.0);
        ctx.line_to(100.0, 50.0);
        ctx.stroke();
        let lit = (0..100)
            .filter(|&x| ctx.buffer().get(x, 50) == Some(Rgba::WHITE))
            .count();
        assert_eq!(lit, 100);
    }

    #[test]
    fn test_diagonal_through_surface_is_continuous() {
        let mut ctx = DrawContext::new(50, 50, 2.0);
        ctx.set_color(Rgba::WHITE);
        ctx.begin_path();
        ctx.move_to(-5_000.0, -5_000.0);
        ctx.line_to(5_000.0, 5_000.0);
        ctx.stroke();
        for i in 0..100 {
            assert_eq!(ctx.buffer().get(i, i), Some(Rgba::WHITE), "gap at {i}");
        }
    }
}
