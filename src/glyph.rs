// glyph.rs — the glyph-lookup capability text drawing consumes.
//
// The renderer never rasterises anything itself: a `GlyphSource` hands back a
// texture, a UV rect inside it and the metrics needed to place the quad. Each
// distinct texture is a batching boundary.

use crate::device::{TextureId, TextureStore};
use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphInfo {
    pub texture: TextureId,
    /// Normalised rect of the bitmap inside `texture`.
    pub uv: Rect,
    /// Bitmap size in pixels; zero for blank glyphs such as space.
    pub width: f32,
    pub height: f32,
    /// Offset from the pen position to the bitmap's left edge.
    pub bearing_x: f32,
    /// Distance from the baseline up to the bitmap's top edge.
    pub bearing_y: f32,
    pub advance: f32,
}

impl GlyphInfo {
    pub fn is_blank(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

pub trait GlyphSource {
    /// Look up (rasterising on first use) the glyph for `ch`. `None` when the
    /// source cannot produce it at all.
    fn glyph(&mut self, ch: char) -> Option<GlyphInfo>;

    /// Baseline offset from the top of a line.
    fn ascent(&self) -> f32;

    fn line_height(&self) -> f32;

    /// Push any newly rasterised pixels to the GPU. Called before the quads
    /// referencing them can be drawn.
    fn sync(&mut self, _store: &mut dyn TextureStore) {}
}
