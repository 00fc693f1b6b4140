// draw.rs — the drawing helper API widget paint code calls: pens, brushes,
// gradient directions, outlines vs fills, pies and strings. Everything here
// forwards to the batcher's `add_*` primitives.

use std::f32::consts::TAU;

use crate::batcher::Batcher;
use crate::device::GpuDevice;
use crate::geometry::{arc_points, clamp_radius, rounded_outline, Color, Rect};
use crate::glyph::{GlyphInfo, GlyphSource};
use crate::vertex::LineStyle;

/// Stroke description for outlines and lines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pen {
    pub color: Color,
    pub width: f32,
    pub style: LineStyle,
}

impl Pen {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            width: 1.0,
            style: LineStyle::Solid,
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    pub fn with_style(mut self, style: LineStyle) -> Self {
        self.style = style;
        self
    }

    fn is_invisible(&self) -> bool {
        self.color.is_invisible() || !(self.width > 0.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GradientDirection {
    #[default]
    Horizontal,
    Vertical,
    TopLeft,
    ForwardDiagonal,
    BackwardDiagonal,
}

impl GradientDirection {
    /// Corner colours `[top-left, top-right, bottom-right, bottom-left]` for a
    /// gradient from `start` to `end`.
    pub fn corner_colors(self, start: Color, end: Color) -> [Color; 4] {
        let (s, e) = (start, end);
        let m = s.lerp(e, 0.5);
        match self {
            Self::Horizontal => [s, e, e, s],
            Self::Vertical => [s, s, e, e],
            Self::TopLeft => [s, e, e, e],
            Self::ForwardDiagonal => [s, m, e, m],
            Self::BackwardDiagonal => [m, s, m, e],
        }
    }
}

/// Fill description.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Brush {
    Solid(Color),
    LinearGradient {
        start: Color,
        end: Color,
        direction: GradientDirection,
    },
}

impl Brush {
    pub fn corner_colors(&self) -> [Color; 4] {
        match *self {
            Brush::Solid(c) => [c; 4],
            Brush::LinearGradient {
                start,
                end,
                direction,
            } => direction.corner_colors(start, end),
        }
    }

    fn solid(&self) -> Option<Color> {
        match *self {
            Brush::Solid(c) => Some(c),
            Brush::LinearGradient { .. } => None,
        }
    }
}

impl From<Color> for Brush {
    fn from(c: Color) -> Self {
        Brush::Solid(c)
    }
}

/// Background and border of a widget.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShapeStyle {
    pub fill: Option<Brush>,
    pub border: Option<Pen>,
    pub radius: f32,
}

impl<D: GpuDevice> Batcher<D> {
    pub fn draw_line(&mut self, pen: &Pen, from: [f32; 2], to: [f32; 2]) {
        if pen.is_invisible() {
            return;
        }
        self.add_line(from[0], from[1], to[0], to[1], pen.color, pen.width, pen.style);
    }

    /// Stroke `rect` with the pen lying inside its edges.
    pub fn draw_rectangle(&mut self, pen: &Pen, rect: Rect) {
        if pen.is_invisible() || rect.is_empty() {
            return;
        }
        let t = pen.width;
        if t * 2.0 >= rect.w.min(rect.h) {
            self.add_rectangle(rect, pen.color);
            return;
        }
        if pen.style == LineStyle::Solid {
            // Four edges that never overlap, so translucent pens stay even.
            let c = pen.color;
            self.add_rectangle(Rect::new(rect.x, rect.y, rect.w, t), c);
            self.add_rectangle(Rect::new(rect.x, rect.bottom() - t, rect.w, t), c);
            self.add_rectangle(Rect::new(rect.x, rect.y + t, t, rect.h - 2.0 * t), c);
            self.add_rectangle(Rect::new(rect.right() - t, rect.y + t, t, rect.h - 2.0 * t), c);
            return;
        }
        let r = rect.inset(t * 0.5);
        let corners = [
            [r.x, r.y],
            [r.right(), r.y],
            [r.right(), r.bottom()],
            [r.x, r.bottom()],
        ];
        self.add_polyline(&corners, pen.color, t, pen.style, true);
    }

    pub fn fill_rectangle(&mut self, brush: &Brush, rect: Rect) {
        self.add_rectangle_gradient(rect, brush.corner_colors());
    }

    pub fn draw_rounded_rectangle(&mut self, pen: &Pen, rect: Rect, radius: f32) {
        if pen.is_invisible() || rect.is_empty() {
            return;
        }
        let segments = self.config.corner_segments;
        if pen.style == LineStyle::Solid {
            self.add_rounded_rectangle_outline(rect, pen.color, pen.width, radius, segments);
            return;
        }
        let r = clamp_radius(&rect, radius).max(0.0);
        let outline = rounded_outline(&rect, r, segments);
        self.add_polyline(&outline, pen.color, pen.width, pen.style, true);
    }

    pub fn fill_rounded_rectangle(&mut self, brush: &Brush, rect: Rect, radius: f32) {
        let segments = self.config.corner_segments;
        match brush.solid() {
            Some(c) => self.add_rounded_rectangle(rect, c, radius, segments),
            None => self.add_rounded_rectangle_gradient(rect, brush.corner_colors(), radius, segments),
        }
    }

    pub fn draw_ellipse(&mut self, pen: &Pen, rect: Rect) {
        if pen.is_invisible() || rect.is_empty() {
            return;
        }
        if pen.style == LineStyle::Solid {
            self.add_ellipse_outline(rect, pen.color, pen.width);
            return;
        }
        let n = self.ellipse_segments_for(&rect);
        let mut ring = arc_points(rect.center(), rect.w * 0.5, rect.h * 0.5, 0.0, TAU, n);
        ring.pop();
        self.add_polyline(&ring, pen.color, pen.width, pen.style, true);
    }

    pub fn fill_ellipse(&mut self, brush: &Brush, rect: Rect) {
        match brush.solid() {
            Some(c) => self.add_ellipse(rect, c),
            None => self.add_ellipse_gradient(rect, brush.corner_colors()),
        }
    }

    /// Outline of a pie wedge: the arc plus both radii. Angles in degrees.
    pub fn draw_pie(&mut self, pen: &Pen, rect: Rect, start_deg: f32, sweep_deg: f32) {
        if pen.is_invisible() || rect.is_empty() || sweep_deg == 0.0 {
            return;
        }
        if sweep_deg.abs() >= 360.0 {
            self.draw_ellipse(pen, rect);
            return;
        }
        let n = self.pie_segments_for(&rect, sweep_deg);
        let center = rect.center();
        let arc = arc_points(
            center,
            rect.w * 0.5,
            rect.h * 0.5,
            start_deg.to_radians(),
            sweep_deg.to_radians(),
            n,
        );
        if pen.style == LineStyle::Solid {
            self.add_arc(rect, start_deg, sweep_deg, pen.color, pen.width);
            if let (Some(first), Some(last)) = (arc.first(), arc.last()) {
                self.draw_line(pen, center, *first);
                self.draw_line(pen, center, *last);
            }
            return;
        }
        let mut outline = Vec::with_capacity(arc.len() + 1);
        outline.push(center);
        outline.extend(arc);
        self.add_polyline(&outline, pen.color, pen.width, pen.style, true);
    }

    pub fn fill_pie(&mut self, brush: &Brush, rect: Rect, start_deg: f32, sweep_deg: f32) {
        self.add_pie(rect, start_deg, sweep_deg, brush.corner_colors());
    }

    /// Draw `text` with its first line's top-left at `origin`. `\n` starts a
    /// new line. Returns the widest line's advance.
    ///
    /// Every glyph is looked up before any quad is emitted, so the source can
    /// upload all new atlas pixels in one `sync` ahead of the draw calls that
    /// sample them.
    pub fn draw_string(
        &mut self,
        text: &str,
        origin: [f32; 2],
        color: Color,
        glyphs: &mut dyn GlyphSource,
    ) -> f32 {
        let mut placed: Vec<(GlyphInfo, Rect)> = Vec::with_capacity(text.len());
        let width = layout(text, origin, glyphs, |info, dest| placed.push((info, dest)));
        glyphs.sync(&mut self.device);
        if color.is_invisible() {
            return width;
        }
        for (info, dest) in placed {
            self.add_glyph(info.texture, dest, info.uv, color);
        }
        width
    }

    /// Paint a widget background: fill first, then the border on top.
    pub fn paint_shape(&mut self, rect: Rect, style: &ShapeStyle) {
        if let Some(brush) = &style.fill {
            if style.radius > 0.0 {
                self.fill_rounded_rectangle(brush, rect, style.radius);
            } else {
                self.fill_rectangle(brush, rect);
            }
        }
        if let Some(pen) = &style.border {
            if style.radius > 0.0 {
                self.draw_rounded_rectangle(pen, rect, style.radius);
            } else {
                self.draw_rectangle(pen, rect);
            }
        }
    }
}

/// Size of `text` laid out as `draw_string` would: widest line by number of
/// lines times the line height.
pub fn measure_string(text: &str, glyphs: &mut dyn GlyphSource) -> [f32; 2] {
    let width = layout(text, [0.0, 0.0], glyphs, |_, _| {});
    let lines = text.split('\n').count() as f32;
    [width, lines * glyphs.line_height()]
}

/// Walk `text`, calling `place` with each visible glyph's pixel-snapped
/// destination rect. Returns the widest line's advance.
fn layout(
    text: &str,
    origin: [f32; 2],
    glyphs: &mut dyn GlyphSource,
    mut place: impl FnMut(GlyphInfo, Rect),
) -> f32 {
    let ascent = glyphs.ascent();
    let line_height = glyphs.line_height();
    let mut pen_x = origin[0];
    let mut baseline = origin[1] + ascent;
    let mut widest: f32 = 0.0;

    for ch in text.chars() {
        if ch == '\n' {
            widest = widest.max(pen_x - origin[0]);
            pen_x = origin[0];
            baseline += line_height;
            continue;
        }
        let Some(info) = glyphs.glyph(ch) else {
            tracing::trace!("no glyph for {ch:?}");
            continue;
        };
        if !info.is_blank() {
            let dest = Rect::new(
                (pen_x + info.bearing_x).round(),
                (baseline - info.bearing_y).round(),
                info.width,
                info.height,
            );
            place(info, dest);
        }
        pen_x += info.advance;
    }
    widest.max(pen_x - origin[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcher::testing::*;
    use crate::device::{TextureId, TextureStore};
    use crate::geometry::IRect;
    use crate::recorder::GpuCall;
    use crate::vertex::VertexKind;

    /// Monospace source: every printable char is 8×10 with a 9px advance;
    /// space is blank. Chars at or above 'n' live on a second page.
    struct FakeGlyphs {
        pending: bool,
    }

    impl GlyphSource for FakeGlyphs {
        fn glyph(&mut self, ch: char) -> Option<GlyphInfo> {
            if ch == '\u{1F600}' {
                return None;
            }
            self.pending = true;
            let blank = ch == ' ';
            Some(GlyphInfo {
                texture: if ch >= 'n' { TextureId(71) } else { TextureId(70) },
                uv: Rect::new(0.0, 0.0, 0.1, 0.1),
                width: if blank { 0.0 } else { 8.0 },
                height: if blank { 0.0 } else { 10.0 },
                bearing_x: 0.5,
                bearing_y: 8.0,
                advance: 9.0,
            })
        }

        fn ascent(&self) -> f32 {
            10.0
        }

        fn line_height(&self) -> f32 {
            14.0
        }

        fn sync(&mut self, store: &mut dyn TextureStore) {
            if std::mem::take(&mut self.pending) {
                store.update_texture(TextureId(70), IRect::new(0, 0, 1, 1), &[0]);
            }
        }
    }

    #[test]
    fn gradient_directions_assign_corners() {
        let (s, e) = (Color::BLACK, Color::WHITE);
        let m = s.lerp(e, 0.5);
        assert_eq!(GradientDirection::Horizontal.corner_colors(s, e), [s, e, e, s]);
        assert_eq!(GradientDirection::Vertical.corner_colors(s, e), [s, s, e, e]);
        assert_eq!(GradientDirection::TopLeft.corner_colors(s, e), [s, e, e, e]);
        assert_eq!(GradientDirection::ForwardDiagonal.corner_colors(s, e), [s, m, e, m]);
        assert_eq!(GradientDirection::BackwardDiagonal.corner_colors(s, e), [m, s, m, e]);
    }

    #[test]
    fn gradient_fill_colours_rect_corners() {
        let mut b = batcher();
        let brush = Brush::LinearGradient {
            start: Color::RED,
            end: Color::BLUE,
            direction: GradientDirection::Vertical,
        };
        b.fill_rectangle(&brush, Rect::new(0., 0., 10., 10.));
        b.flush();
        let v = &b.device().draws[0].vertices;
        assert_eq!(v[0].color, Color::RED.to_array());
        assert_eq!(v[1].color, Color::RED.to_array());
        assert_eq!(v[2].color, Color::BLUE.to_array());
        assert_eq!(v[3].color, Color::BLUE.to_array());
    }

    #[test]
    fn solid_rectangle_border_is_four_edges() {
        let mut b = batcher();
        b.draw_rectangle(&Pen::new(Color::RED).with_width(2.0), Rect::new(10., 10., 100., 50.));
        b.flush();
        let draw = &b.device().draws[0];
        assert_eq!(draw.vertices.len(), 16);
        let area: f32 = draw
            .vertices
            .chunks(4)
            .map(|q| (q[1].position[0] - q[0].position[0]) * (q[2].position[1] - q[1].position[1]))
            .sum();
        // Perimeter band of a 100×50 rect at thickness 2, counted once.
        assert_eq!(area, 100. * 50. - 96. * 46.);
    }

    #[test]
    fn thick_border_fills_the_rect() {
        let mut b = batcher();
        b.draw_rectangle(&Pen::new(Color::RED).with_width(10.0), Rect::new(0., 0., 15., 40.));
        b.flush();
        assert_eq!(b.device().draws[0].vertices.len(), 4);
    }

    #[test]
    fn dashed_border_is_one_stipple_run() {
        let mut b = batcher();
        let pen = Pen::new(Color::RED).with_width(2.0).with_style(LineStyle::Dashed);
        b.draw_rectangle(&pen, Rect::new(0., 0., 22., 12.));
        b.flush();
        let v = &b.device().draws[0].vertices;
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|v| v.kind() == VertexKind::Dashed));
        // Centreline is 20×10; the last edge ends at the full perimeter.
        assert_eq!(v[15].tex_coord[0], 60.0);
    }

    #[test]
    fn solid_brush_rounded_fill_uses_flat_fan() {
        let mut b = batcher();
        b.fill_rounded_rectangle(&Brush::Solid(Color::GREEN), Rect::new(0., 0., 40., 40.), 5.0);
        b.flush();
        let segs = b.config().corner_segments as usize;
        assert_eq!(b.device().draws[0].vertices.len(), (segs + 1) * 4);
    }

    #[test]
    fn dotted_ellipse_is_closed_polyline() {
        let mut b = batcher();
        let rect = Rect::new(0., 0., 40., 40.);
        let n = b.ellipse_segments_for(&rect) as usize;
        b.draw_ellipse(&Pen::new(Color::RED).with_style(LineStyle::Dotted), rect);
        b.flush();
        let v = &b.device().draws[0].vertices;
        assert_eq!(v.len(), n * 4);
        assert!(v.iter().all(|v| v.kind() == VertexKind::Dotted));
    }

    #[test]
    fn pie_fill_and_outline() {
        let mut b = batcher();
        let rect = Rect::new(0., 0., 100., 100.);
        b.fill_pie(&Brush::Solid(Color::RED), rect, 0.0, 90.0);
        b.flush();
        let n = b.pie_segments_for(&rect, 90.0) as usize;
        assert_eq!(b.device().draws[0].vertices.len(), n + 2);

        b.draw_pie(&Pen::new(Color::RED).with_width(2.0), rect, 0.0, 90.0);
        b.flush();
        // Arc ring strip plus two radius quads.
        assert_eq!(b.device().draws[1].vertices.len(), 2 * (n + 1) + 8);
    }

    #[test]
    fn string_quads_snap_and_advance() {
        let mut b = batcher();
        let mut glyphs = FakeGlyphs { pending: false };
        let width = b.draw_string("ab c", [10.0, 20.0], Color::WHITE, &mut glyphs);
        assert_eq!(width, 36.0);
        b.flush();
        let draw = &b.device().draws[0];
        assert_eq!(draw.texture, Some(TextureId(70)));
        // Space is blank: three quads.
        assert_eq!(draw.vertices.len(), 12);
        assert!(draw.vertices.iter().all(|v| v.kind() == VertexKind::Glyph));
        // Pen x plus bearing rounds up; y is origin + ascent - bearing.
        assert_eq!(draw.vertices[0].position, [11.0, 22.0]);
        assert_eq!(draw.vertices[4].position, [20.0, 22.0]);
        assert_eq!(draw.vertices[8].position, [38.0, 22.0]);
    }

    #[test]
    fn atlas_sync_precedes_glyph_draws() {
        let mut b = batcher();
        let mut glyphs = FakeGlyphs { pending: false };
        b.draw_string("abc", [0.0, 0.0], Color::WHITE, &mut glyphs);
        b.flush();
        let calls = &b.device().calls;
        let update = calls
            .iter()
            .position(|c| matches!(c, GpuCall::UpdateTexture(..)))
            .unwrap();
        let draw = calls
            .iter()
            .position(|c| matches!(c, GpuCall::DrawElements(_)))
            .unwrap();
        assert!(update < draw);
    }

    #[test]
    fn glyph_page_change_splits_batches() {
        let mut b = batcher();
        let mut glyphs = FakeGlyphs { pending: false };
        b.draw_string("amz", [0.0, 0.0], Color::WHITE, &mut glyphs);
        b.flush();
        let textures: Vec<_> = b.device().draws.iter().map(|d| d.texture).collect();
        assert_eq!(textures, vec![Some(TextureId(70)), Some(TextureId(71))]);
    }

    #[test]
    fn newline_and_missing_glyphs() {
        let mut glyphs = FakeGlyphs { pending: false };
        assert_eq!(measure_string("abc\nde", &mut glyphs), [27.0, 28.0]);
        assert_eq!(measure_string("a\u{1F600}b", &mut glyphs), [18.0, 14.0]);
        assert_eq!(measure_string("", &mut glyphs), [0.0, 14.0]);

        let mut b = batcher();
        b.draw_string("a\nb", [0.0, 0.0], Color::WHITE, &mut glyphs);
        b.flush();
        let v = &b.device().draws[0].vertices;
        assert_eq!(v[4].position[1] - v[0].position[1], 14.0);
        assert_eq!(v[4].position[0], v[0].position[0]);
    }

    #[test]
    fn shape_paints_fill_then_border() {
        let mut b = batcher();
        let style = ShapeStyle {
            fill: Some(Brush::Solid(Color::BLUE)),
            border: Some(Pen::new(Color::RED)),
            radius: 0.0,
        };
        b.paint_shape(Rect::new(0., 0., 50., 20.), &style);
        b.flush();
        let v = &b.device().draws[0].vertices;
        assert_eq!(v.len(), 4 + 16);
        assert_eq!(v[0].color, Color::BLUE.to_array());
        assert_eq!(v[4].color, Color::RED.to_array());
    }
}
