//! Label rasterisation and the per-renderer text image cache.

use std::collections::HashMap;

use crate::context::DrawContext;
use crate::surface::{PixelBuffer, Rgba};

const GLYPH_COLS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_COLS + 1;

/// Font selection. Only the pixel size matters to the built-in rasteriser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Font {
    pub size_px: u32,
}

impl Font {
    pub const fn new(size_px: u32) -> Self {
        Self { size_px }
    }

    /// Same font at a device pixel ratio.
    pub fn scaled(self, scale: f64) -> Self {
        Self::new(((self.size_px as f64) * scale).round().max(1.0) as u32)
    }
}

impl Default for Font {
    fn default() -> Self {
        Self::new(11)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Cache key. Images differ whenever any part differs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextKey {
    pub text: String,
    pub font: Font,
    pub color: Rgba,
}

/// Turns a string into pixels. Hosts with real font shaping plug in here.
pub trait GlyphRasterizer {
    fn rasterize(&self, text: &str, font: Font, color: Rgba) -> PixelBuffer;

    /// Size in device pixels of what `rasterize` would produce.
    fn measure(&self, text: &str, font: Font) -> (u32, u32);
}

/// 5x7 bitmap font covering digits, A-Z and the punctuation price labels use.
/// Lowercase is drawn as uppercase; anything else becomes a box.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotMatrixGlyphs;

impl DotMatrixGlyphs {
    fn cell_scale(font: Font) -> u32 {
        (font.size_px / GLYPH_ROWS).max(1)
    }
}

impl GlyphRasterizer for DotMatrixGlyphs {
    fn rasterize(&self, text: &str, font: Font, color: Rgba) -> PixelBuffer {
        let (width, height) = self.measure(text, font);
        let mut image = PixelBuffer::new(width, height);
        let s = Self::cell_scale(font) as i64;

        for (i, ch) in text.chars().enumerate() {
            let origin = i as i64 * GLYPH_ADVANCE as i64 * s;
            for (row, bits) in glyph(ch).iter().enumerate() {
                for col in 0..GLYPH_COLS {
                    if bits & (1 << (GLYPH_COLS - 1 - col)) != 0 {
                        let x = origin + col as i64 * s;
                        let y = row as i64 * s;
                        image.fill_rect(x, y, x + s, y + s, color);
                    }
                }
            }
        }
        image
    }

    fn measure(&self, text: &str, font: Font) -> (u32, u32) {
        let s = Self::cell_scale(font);
        let chars = text.chars().count() as u32;
        if chars == 0 {
            return (0, 0);
        }
        // no trailing gap after the last glyph
        (chars * GLYPH_ADVANCE * s - s, GLYPH_ROWS * s)
    }
}

fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        ' ' => [0; 7],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '.' => [0, 0, 0, 0, 0, 0b01100, 0b01100],
        ',' => [0, 0, 0, 0, 0b01100, 0b00100, 0b01000],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '+' => [0, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0],
        '_' => [0, 0, 0, 0, 0, 0, 0b11111],
        '%' => [0b11000, 0b11001, 0b00010, 0b00100, 0b01000, 0b10011, 0b00011],
        ':' => [0, 0b01100, 0b01100, 0, 0b01100, 0b01100, 0],
        '/' => [0, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}

/// Rasterised label images keyed by text, font and colour.
///
/// Entries are never evicted. Once `capacity` is reached further inserts are
/// refused and callers draw those labels without caching.
#[derive(Debug)]
pub struct TextCache {
    capacity: usize,
    entries: HashMap<TextKey, PixelBuffer>,
    hits: u64,
    misses: u64,
}

impl TextCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &TextKey) -> Option<&PixelBuffer> {
        match self.entries.get(key) {
            Some(image) => {
                self.hits += 1;
                Some(image)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store `image`. Returns `false` when the cache is full.
    pub fn insert(&mut self, key: TextKey, image: PixelBuffer) -> bool {
        if self.is_full() && !self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, image);
        true
    }

    pub fn contains(&self, key: &TextKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Draws labels through a [`TextCache`].
pub struct TextRenderer<R = DotMatrixGlyphs> {
    rasterizer: R,
    cache: TextCache,
}

impl TextRenderer<DotMatrixGlyphs> {
    pub fn new(capacity: usize) -> Self {
        Self::with_rasterizer(DotMatrixGlyphs, capacity)
    }
}

impl<R: GlyphRasterizer> TextRenderer<R> {
    pub fn with_rasterizer(rasterizer: R, capacity: usize) -> Self {
        Self {
            rasterizer,
            cache: TextCache::new(capacity),
        }
    }

    pub fn cache(&self) -> &TextCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Draw `text` with its top edge at logical `y`. `x` is the left, centre
    /// or right edge depending on `align`. Returns `true` on a cache hit.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        ctx: &mut DrawContext,
        text: &str,
        x: f64,
        y: f64,
        font: Font,
        color: Rgba,
        align: TextAlign,
    ) -> bool {
        if ctx.is_zero_sized() || text.is_empty() {
            return false;
        }

        let key = TextKey {
            text: text.to_string(),
            font: font.scaled(ctx.scale()),
            color,
        };
        let (width, _) = self.rasterizer.measure(text, key.font);
        let dx = match align {
            TextAlign::Left => 0,
            TextAlign::Center => width as i64 / 2,
            TextAlign::Right => width as i64,
        };
        let (px, py) = (ctx.to_device(x) - dx, ctx.to_device(y));

        if let Some(image) = self.cache.get(&key) {
            ctx.draw_image(image, px, py);
            return true;
        }

        let image = self.rasterizer.rasterize(text, key.font, color);
        ctx.draw_image(&image, px, py);
        if !self.cache.insert(key, image) {
            log::trace!("text cache full, drawing {text:?} uncached");
        }
        false
    }
}
