//! Pixel storage.

use std::io::{self, Write};

use bytemuck::{Pod, Zeroable};

/// One RGBA8 pixel.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r, g, b)
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

/// A width x height grid of pixels in row-major order.
///
/// Every accessor clips to the grid, so a 0 x 0 buffer accepts any call.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba::TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Reallocate to a new size. Contents are cleared.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize(width as usize * height as usize, Rgba::TRANSPARENT);
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: i64, y: i64) -> Option<Rgba> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    pub fn set(&mut self, x: i64, y: i64, color: Rgba) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    pub fn fill(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    /// Fill the half-open rectangle `[x0, x1) x [y0, y1)`, clipped.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba) {
        let x0 = x0.clamp(0, self.width as i64) as usize;
        let x1 = x1.clamp(0, self.width as i64) as usize;
        let y0 = y0.clamp(0, self.height as i64) as usize;
        let y1 = y1.clamp(0, self.height as i64) as usize;
        if x0 >= x1 {
            return;
        }
        let stride = self.width as usize;
        for y in y0..y1 {
            self.pixels[y * stride + x0..y * stride + x1].fill(color);
        }
    }

    /// Copy `src` with its top-left corner at `(dx, dy)`. Transparent source
    /// pixels are skipped.
    pub fn blit(&mut self, src: &PixelBuffer, dx: i64, dy: i64) {
        for sy in 0..src.height as i64 {
            for sx in 0..src.width as i64 {
                if let Some(color) = src.get(sx, sy) {
                    if !color.is_transparent() {
                        self.set(dx + sx, dy + sy, color);
                    }
                }
            }
        }
    }

    /// Replace this buffer's contents with `src` in one copy. Sizes must match;
    /// otherwise nothing happens and `false` is returned.
    pub fn copy_from(&mut self, src: &PixelBuffer) -> bool {
        if src.width != self.width || src.height != self.height {
            return false;
        }
        self.pixels.copy_from_slice(&src.pixels);
        true
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Write a binary PPM (P6) image, dropping alpha.
    pub fn write_ppm<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        let rgb: Vec<u8> = self
            .as_bytes()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        out.write_all(&rgb)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rect_clips() {
        let mut buf = PixelBuffer::new(4, 4);
        buf.fill_rect(-2, -2, 2, 2, Rgba::WHITE);
        assert_eq!(buf.get(0, 0), Some(Rgba::WHITE));
        assert_eq!(buf.get(1, 1), Some(Rgba::WHITE));
        assert_eq!(buf.get(2, 2), Some(Rgba::TRANSPARENT));
        assert_eq!(buf.get(9, 9), None);
    }

    #[test]
    fn test_zero_sized_accepts_everything() {
        let mut buf = PixelBuffer::new(0, 0);
        buf.fill_rect(0, 0, 10, 10, Rgba::WHITE);
        buf.set(3, 3, Rgba::WHITE);
        buf.blit(&PixelBuffer::filled(2, 2, Rgba::WHITE), 0, 0);
        assert!(buf.is_empty());
        assert!(buf.as_bytes().is_empty());
    }

    #[test]
    fn test_blit_skips_transparent() {
        let mut dst = PixelBuffer::filled(3, 1, Rgba::BLACK);
        let mut src = PixelBuffer::new(2, 1);
        src.set(1, 0, Rgba::WHITE);
        dst.blit(&src, 1, 0);
        assert_eq!(dst.pixels(), &[Rgba::BLACK, Rgba::BLACK, Rgba::WHITE]);
    }

    #[test]
    fn test_ppm_header_and_size() {
        let buf = PixelBuffer::filled(2, 3, Rgba::rgb(1, 2, 3));
        let mut out = Vec::new();
        buf.write_ppm(&mut out).unwrap();
        let header = b"P6\n2 3\n255\n";
        assert!(out.starts_with(header));
        assert_eq!(out.len(), header.len() + 2 * 3 * 3);
        assert_eq!(&out[header.len()..header.len() + 3], &[1, 2, 3]);
    }
}
