// font.rs — glyph rasterisation and atlas packing via ab_glyph
//
// Coverage is written into a single-channel (R8) atlas texture, packed into
// horizontal shelves. New glyphs only touch the CPU copy; `sync` uploads the
// rows that changed since the last upload.

use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont};
use std::collections::HashMap;

use crate::device::{Filter, TextureDesc, TextureFormat, TextureId, TextureStore};
use crate::error::{RenderError, Result};
use crate::geometry::{IRect, Rect};
use crate::glyph::{GlyphInfo, GlyphSource};

pub const ATLAS_SIZE: u32 = 1024;
// 2px gap prevents filter bleed between neighbouring bitmaps.
const GAP: u32 = 2;

// ── ShelfPacker ───────────────────────────────────────────────────────────────

/// Left-to-right, top-to-bottom shelf allocator for a square atlas.
#[derive(Debug, Clone)]
pub struct ShelfPacker {
    size: u32,
    gap: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_h: u32,
}

impl ShelfPacker {
    pub fn new(size: u32, gap: u32) -> Self {
        Self {
            size,
            gap,
            cursor_x: 0,
            cursor_y: 0,
            row_h: 0,
        }
    }

    /// Reserve a `w × h` slot, returning its top-left corner. `None` once
    /// the atlas is full.
    pub fn alloc(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w + self.gap > self.size {
            return None;
        }
        if self.cursor_x + w + self.gap > self.size {
            self.cursor_y += self.row_h + self.gap;
            self.cursor_x = 0;
            self.row_h = 0;
        }
        if self.cursor_y + h + self.gap > self.size {
            return None;
        }
        let slot = (self.cursor_x, self.cursor_y);
        self.cursor_x += w + self.gap;
        self.row_h = self.row_h.max(h);
        Some(slot)
    }
}

// ── AtlasPage ─────────────────────────────────────────────────────────────────

/// CPU copy of a square R8 atlas texture plus its packer. Bitmaps are copied
/// in with `blit`; `sync` uploads only the rows touched since the last sync.
pub struct AtlasPage {
    size: u32,
    texture: TextureId,
    pixels: Vec<u8>,
    packer: ShelfPacker,
    /// Rows `start..end` changed since the last `sync`.
    dirty: Option<(u32, u32)>,
}

impl AtlasPage {
    pub fn new(size: u32, store: &mut dyn TextureStore) -> Self {
        let texture = store.create_texture(
            &TextureDesc {
                width: size,
                height: size,
                format: TextureFormat::R8,
                filter: Filter::Nearest,
            },
            &[],
        );
        Self {
            size,
            texture,
            pixels: vec![0u8; size as usize * size as usize],
            packer: ShelfPacker::new(size, GAP),
            dirty: None,
        }
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Copy a `w × h` coverage bitmap into a free slot and return its UV
    /// rect, or `None` when the page is full.
    pub fn blit(&mut self, coverage: &[u8], w: u32, h: u32) -> Option<Rect> {
        debug_assert_eq!(coverage.len(), w as usize * h as usize);
        let Some((x0, y0)) = self.packer.alloc(w, h) else {
            tracing::warn!("font atlas full ({0}x{0}), glyph dropped", self.size);
            return None;
        };
        let aw = self.size as usize;
        for row in 0..h as usize {
            let src = &coverage[row * w as usize..(row + 1) * w as usize];
            let dst = (y0 as usize + row) * aw + x0 as usize;
            self.pixels[dst..dst + w as usize].copy_from_slice(src);
        }
        self.dirty = Some(match self.dirty {
            Some((start, end)) => (start.min(y0), end.max(y0 + h)),
            None => (y0, y0 + h),
        });

        // Half-texel inset keeps NEAREST sampling inside the bitmap when a UV
        // lands exactly on a texel boundary.
        let texel = 1.0 / self.size as f32;
        let half = 0.5 * texel;
        Some(Rect::new(
            x0 as f32 * texel + half,
            y0 as f32 * texel + half,
            w as f32 * texel - 2.0 * half,
            h as f32 * texel - 2.0 * half,
        ))
    }

    /// Upload the dirty rows as one full-width region.
    pub fn sync(&mut self, store: &mut dyn TextureStore) {
        let Some((start, end)) = self.dirty.take() else {
            return;
        };
        let aw = self.size as usize;
        let rows = &self.pixels[start as usize * aw..end as usize * aw];
        store.update_texture(
            self.texture,
            IRect::new(0, start as i32, self.size as i32, (end - start) as i32),
            rows,
        );
    }

    pub fn release(self, store: &mut dyn TextureStore) {
        store.delete_texture(self.texture);
    }
}

// ── FontAtlas ─────────────────────────────────────────────────────────────────

pub struct FontAtlas {
    font: FontVec,
    scale: PxScale,
    pub size_px: f32,
    page: AtlasPage,
    cache: HashMap<char, Option<GlyphInfo>>,
    ascent: f32,
    line_height: f32,
}

impl FontAtlas {
    /// Parse `data` (TTF/OTF bytes), create the atlas texture in `store` and
    /// pre-rasterise printable ASCII.
    pub fn new(data: Vec<u8>, size_px: f32, store: &mut dyn TextureStore) -> Result<Self> {
        if !(size_px > 0.0) || !size_px.is_finite() {
            return Err(RenderError::Font(format!("invalid font size {size_px}")));
        }
        let font =
            FontVec::try_from_vec(data).map_err(|e| RenderError::Font(format!("ab_glyph parse error: {e}")))?;

        // PxScale(n) makes ascent + |descent| = n; scale up so the em square
        // is `size_px` instead.
        let em_scale = {
            let upm = font.units_per_em().unwrap_or(1000.0);
            let height_unscaled = font.ascent_unscaled() - font.descent_unscaled();
            size_px * height_unscaled / upm
        };
        let scale = PxScale::from(em_scale);

        let sf = font.as_scaled(scale);
        let ascent = sf.ascent().ceil();
        let descent = sf.descent().floor();
        let line_height = (ascent - descent + sf.line_gap()).round().max(1.0);

        let page = AtlasPage::new(ATLAS_SIZE, store);
        tracing::info!(
            "FontAtlas: {size_px:.1}px -> PxScale({em_scale:.3}) ascent={ascent} \
             line_height={line_height} texture={:?}",
            page.texture()
        );

        let mut atlas = Self {
            font,
            scale,
            size_px,
            page,
            cache: HashMap::new(),
            ascent,
            line_height,
        };
        for ch in ' '..='~' {
            atlas.lookup(ch);
        }
        Ok(atlas)
    }

    pub fn texture(&self) -> TextureId {
        self.page.texture()
    }

    /// Delete the atlas texture.
    pub fn release(self, store: &mut dyn TextureStore) {
        self.page.release(store);
    }

    fn lookup(&mut self, ch: char) -> Option<GlyphInfo> {
        if let Some(&cached) = self.cache.get(&ch) {
            return cached;
        }
        let info = self.rasterise(ch);
        self.cache.insert(ch, info);
        info
    }

    fn rasterise(&mut self, ch: char) -> Option<GlyphInfo> {
        let sf = self.font.as_scaled(self.scale);
        let glyph_id = sf.glyph_id(ch);
        if glyph_id == GlyphId(0) {
            tracing::debug!("font has no glyph for {ch:?}");
            return None;
        }
        let advance = sf.h_advance(glyph_id).ceil();
        let glyph = glyph_id.with_scale_and_position(self.scale, ab_glyph::point(0.0, self.ascent));
        let Some(outlined) = sf.outline_glyph(glyph) else {
            // Whitespace: metrics only.
            return Some(GlyphInfo {
                texture: self.page.texture(),
                uv: Rect::default(),
                width: 0.0,
                height: 0.0,
                bearing_x: 0.0,
                bearing_y: 0.0,
                advance,
            });
        };
        let bounds = outlined.px_bounds();
        let w = bounds.width().ceil() as u32;
        let h = bounds.height().ceil() as u32;

        let mut coverage = vec![0u8; (w * h) as usize];
        outlined.draw(|px, py, cov| {
            let idx = (py * w + px) as usize;
            if idx < coverage.len() {
                coverage[idx] = (cov * 255.0).round() as u8;
            }
        });
        let uv = self.page.blit(&coverage, w, h)?;
        Some(GlyphInfo {
            texture: self.page.texture(),
            uv,
            width: w as f32,
            height: h as f32,
            bearing_x: bounds.min.x.round(),
            // Distance from the baseline (at y = ascent) up to the bitmap top.
            bearing_y: (self.ascent - bounds.min.y).round(),
            advance,
        })
    }
}

impl GlyphSource for FontAtlas {
    fn glyph(&mut self, ch: char) -> Option<GlyphInfo> {
        self.lookup(ch)
    }

    fn ascent(&self) -> f32 {
        self.ascent
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn sync(&mut self, store: &mut dyn TextureStore) {
        self.page.sync(store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{GpuCall, RecordingDevice};

    #[test]
    fn packer_fills_shelves_left_to_right() {
        let mut p = ShelfPacker::new(32, 2);
        assert_eq!(p.alloc(10, 5), Some((0, 0)));
        assert_eq!(p.alloc(10, 8), Some((12, 0)));
        // 24 + 10 + 2 > 32: next shelf starts under the tallest bitmap.
        assert_eq!(p.alloc(10, 4), Some((0, 10)));
    }

    #[test]
    fn packer_reports_full() {
        let mut p = ShelfPacker::new(16, 2);
        assert_eq!(p.alloc(20, 2), None);
        assert_eq!(p.alloc(6, 12), Some((0, 0)));
        assert_eq!(p.alloc(6, 12), Some((8, 0)));
        assert_eq!(p.alloc(6, 2), None);
    }

    fn new_page(size: u32) -> (AtlasPage, RecordingDevice) {
        let mut dev = RecordingDevice::new();
        let page = AtlasPage::new(size, &mut dev);
        dev.clear_log();
        (page, dev)
    }

    #[test]
    fn blit_copies_rows_into_the_slot() {
        let (mut page, _dev) = new_page(16);
        let bitmap = [1, 2, 3, 4, 5, 6];
        assert!(page.blit(&bitmap, 3, 2).is_some());
        // Second bitmap lands after the first plus the gap.
        assert!(page.blit(&[9, 9], 2, 1).is_some());
        assert_eq!(&page.pixels[0..3], &[1, 2, 3]);
        assert_eq!(&page.pixels[16..19], &[4, 5, 6]);
        assert_eq!(page.pixels[3], 0);
        assert_eq!(&page.pixels[5..7], &[9, 9]);
    }

    #[test]
    fn uv_is_inset_by_half_a_texel() {
        let (mut page, _dev) = new_page(16);
        page.blit(&[0; 4 * 4], 4, 4).unwrap();
        let uv = page.blit(&[0; 2 * 3], 2, 3).unwrap();
        let texel = 1.0 / 16.0;
        // Slot at x = 4 + GAP = 6.
        assert_eq!(uv, Rect::new(6.5 * texel, 0.5 * texel, texel, 2.0 * texel));
    }

    #[test]
    fn sync_uploads_merged_dirty_rows_once() {
        let (mut page, mut dev) = new_page(16);
        page.blit(&[7; 6 * 3], 6, 3).unwrap();
        // Forces a new shelf starting at row 3 + GAP = 5.
        page.blit(&[7; 10 * 4], 10, 4).unwrap();
        page.sync(&mut dev);
        assert_eq!(
            dev.calls,
            vec![GpuCall::UpdateTexture(page.texture(), IRect::new(0, 0, 16, 9))]
        );

        dev.clear_log();
        page.sync(&mut dev);
        assert!(dev.calls.is_empty());

        page.blit(&[7; 2 * 2], 2, 2).unwrap();
        page.sync(&mut dev);
        assert_eq!(
            dev.calls,
            vec![GpuCall::UpdateTexture(page.texture(), IRect::new(0, 5, 16, 2))]
        );
    }

    #[test]
    fn full_page_drops_glyph_without_dirtying() {
        let (mut page, mut dev) = new_page(8);
        assert!(page.blit(&[1; 6 * 6], 6, 6).is_some());
        page.sync(&mut dev);
        dev.clear_log();
        assert_eq!(page.blit(&[1; 4 * 4], 4, 4), None);
        page.sync(&mut dev);
        assert!(dev.calls.is_empty());
    }

    #[test]
    fn page_texture_is_r8_nearest() {
        let mut dev = RecordingDevice::new();
        let page = AtlasPage::new(32, &mut dev);
        let desc = dev.textures[&page.texture()];
        assert_eq!(desc.format, TextureFormat::R8);
        assert_eq!(desc.filter, Filter::Nearest);
        assert_eq!((desc.width, desc.height), (32, 32));
        page.release(&mut dev);
        assert!(dev.textures.is_empty());
    }

    #[test]
    fn invalid_font_data_is_an_error() {
        let mut dev = RecordingDevice::new();
        let err = FontAtlas::new(vec![0, 1, 2, 3], 14.0, &mut dev).err().unwrap();
        assert!(matches!(err, RenderError::Font(_)));
        assert!(dev.textures.is_empty());
    }

    #[test]
    fn invalid_size_is_an_error() {
        let mut dev = RecordingDevice::new();
        assert!(FontAtlas::new(Vec::new(), 0.0, &mut dev).is_err());
        assert!(FontAtlas::new(Vec::new(), f32::NAN, &mut dev).is_err());
    }
}
