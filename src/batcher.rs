// batcher.rs — primitive accumulation into the shared vertex/index pool.
//
// Every `add_*` call computes its worst-case vertex/index consumption first,
// then `prepare()` flushes if the batch key (texture + topology) changes or the
// pool lacks room. Only after that is the first vertex written, so a primitive
// never straddles two draw calls. Invisible input is a silent no-op.

use std::f32::consts::TAU;

use crate::buffer::BufferPool;
use crate::config::RendererConfig;
use crate::device::{Filter, GpuDevice, TextureDesc, TextureFormat, TextureId, WrapMode};
use crate::error::{RenderError, Result};
use crate::flush::FrameStats;
use crate::geometry::{
    arc_points, bilinear, clamp_radius, ellipse_segments, pie_segments, rounded_corner_frames,
    rounded_outline, Color, Rect,
};
use crate::surface::SurfaceRegistry;
use crate::vertex::{LineStyle, Topology, Vertex, VertexKind};

const QUAD_UV: [[f32; 2]; 4] = [[0., 0.], [1., 0.], [1., 1.], [0., 1.]];

/// Everything that must be shared by all vertices of one draw call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchKey {
    pub texture: Option<TextureId>,
    pub topology: Topology,
}

pub struct Batcher<D: GpuDevice> {
    pub(crate) device: D,
    pub(crate) config: RendererConfig,
    pub(crate) pool: BufferPool,
    pub(crate) key: BatchKey,
    pub(crate) white: TextureId,
    pub(crate) stats: FrameStats,
    pub(crate) surfaces: SurfaceRegistry,
}

impl<D: GpuDevice> Batcher<D> {
    pub fn new(mut device: D, config: RendererConfig) -> Result<Self> {
        config.validate()?;
        if let Some((max_v, max_i)) = device.buffer_capacity() {
            if config.vertex_capacity > max_v || config.index_capacity > max_i {
                return Err(RenderError::Config(format!(
                    "batcher capacity {}/{} exceeds the device buffers ({max_v}/{max_i})",
                    config.vertex_capacity, config.index_capacity
                )));
            }
        }
        let white = device.create_texture(
            &TextureDesc {
                width: 1,
                height: 1,
                format: TextureFormat::Rgba8,
                filter: Filter::Nearest,
            },
            &[0xFF; 4],
        );
        tracing::info!(
            "Batcher: vertex_capacity={} index_capacity={} white={:?}",
            config.vertex_capacity,
            config.index_capacity,
            white
        );
        Ok(Self {
            device,
            pool: BufferPool::new(config.vertex_capacity, config.index_capacity),
            config,
            key: BatchKey::default(),
            white,
            stats: FrameStats::default(),
            surfaces: SurfaceRegistry::default(),
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// The 1×1 white texture solid fills sample through.
    pub fn white_texture(&self) -> TextureId {
        self.white
    }

    pub fn pending_vertices(&self) -> usize {
        self.pool.vertex_count()
    }

    pub fn pending_indices(&self) -> usize {
        self.pool.index_count()
    }

    pub fn batch_key(&self) -> BatchKey {
        self.key
    }

    fn fill_key(&self) -> BatchKey {
        BatchKey {
            texture: Some(self.white),
            topology: Topology::Triangles,
        }
    }

    /// Make room for a primitive of `v` vertices and `i` indices under `key`.
    /// Returns false if it can never fit, in which case it is dropped.
    pub(crate) fn prepare(&mut self, key: BatchKey, v: usize, i: usize) -> bool {
        if !self.pool.can_ever_fit(v, i) {
            tracing::warn!(
                "primitive of {v} vertices / {i} indices exceeds pool capacity ({}/{}) — dropped",
                self.pool.vertex_capacity(),
                self.pool.index_capacity()
            );
            return false;
        }
        if self.key != key {
            if !self.pool.is_empty() {
                self.flush();
            }
            self.key = key;
        }
        if !self.pool.fits(v, i) {
            self.flush();
        }
        true
    }

    /// `prepare` for a primitive whose size was computed with checked
    /// arithmetic; `None` means it overflowed and is dropped.
    fn prepare_checked(&mut self, key: BatchKey, budget: Option<(usize, usize)>) -> bool {
        match budget {
            Some((v, i)) => self.prepare(key, v, i),
            None => {
                tracing::warn!("primitive size overflows the address space — dropped");
                false
            }
        }
    }

    fn emit_quad(&mut self, pos: [[f32; 2]; 4], colors: [Color; 4], uv: [[f32; 2]; 4], kind: VertexKind) {
        let base = self.pool.base();
        for k in 0..4 {
            self.pool
                .push_vertex(Vertex::new(pos[k], colors[k].to_array(), uv[k], kind));
        }
        self.pool.push_triangle(base, base + 1, base + 2);
        self.pool.push_triangle(base, base + 2, base + 3);
    }

    fn emit_textured_quad(&mut self, key: BatchKey, dest: Rect, uv: Rect, color: Color, kind: VertexKind) {
        if !self.prepare(key, 4, 6) {
            return;
        }
        let pos = [
            [dest.x, dest.y],
            [dest.right(), dest.y],
            [dest.right(), dest.bottom()],
            [dest.x, dest.bottom()],
        ];
        let uvs = [
            [uv.x, uv.y],
            [uv.right(), uv.y],
            [uv.right(), uv.bottom()],
            [uv.x, uv.bottom()],
        ];
        self.emit_quad(pos, [color; 4], uvs, kind);
    }

    /// Triangle fan around `center`. `closed` joins the last ring vertex back
    /// to the first.
    fn emit_fan(&mut self, center: [f32; 2], center_color: Color, ring: &[([f32; 2], Color)], closed: bool) {
        let n = ring.len();
        if n < 2 {
            return;
        }
        let tris = if closed { n } else { n - 1 };
        if !self.prepare(self.fill_key(), n + 1, tris * 3) {
            return;
        }
        let c = self
            .pool
            .push_vertex(Vertex::new(center, center_color.to_array(), [0.5, 0.5], VertexKind::Fill));
        for (p, color) in ring {
            self.pool
                .push_vertex(Vertex::new(*p, color.to_array(), [0.5, 0.5], VertexKind::Fill));
        }
        for i in 0..tris {
            let a = c + 1 + i as u32;
            let b = c + 1 + ((i + 1) % n) as u32;
            self.pool.push_triangle(c, a, b);
        }
    }

    /// Quad strip between paired outer/inner rings.
    fn emit_ring_strip(&mut self, outer: &[[f32; 2]], inner: &[[f32; 2]], color: Color, closed: bool) {
        let n = outer.len().min(inner.len());
        if n < 2 {
            return;
        }
        let quads = if closed { n } else { n - 1 };
        if !self.prepare(self.fill_key(), 2 * n, quads * 6) {
            return;
        }
        let rgba = color.to_array();
        let base = self.pool.base();
        for k in 0..n {
            self.pool
                .push_vertex(Vertex::new(outer[k], rgba, [0.5, 0.5], VertexKind::Fill));
            self.pool
                .push_vertex(Vertex::new(inner[k], rgba, [0.5, 0.5], VertexKind::Fill));
        }
        for i in 0..quads {
            let j = (i + 1) % n;
            let (o_i, in_i) = (base + 2 * i as u32, base + 2 * i as u32 + 1);
            let (o_j, in_j) = (base + 2 * j as u32, base + 2 * j as u32 + 1);
            self.pool.push_triangle(o_i, o_j, in_i);
            self.pool.push_triangle(in_i, o_j, in_j);
        }
    }

    // ── rectangles ────────────────────────────────────────────────────────────

    pub fn add_rectangle(&mut self, rect: Rect, color: Color) {
        if color.is_invisible() {
            return;
        }
        self.add_rectangle_gradient(rect, [color; 4]);
    }

    /// Corner colours are `[top-left, top-right, bottom-right, bottom-left]`.
    pub fn add_rectangle_gradient(&mut self, rect: Rect, colors: [Color; 4]) {
        if rect.is_empty() || colors.iter().all(Color::is_invisible) {
            return;
        }
        if !self.prepare(self.fill_key(), 4, 6) {
            return;
        }
        let pos = [
            [rect.x, rect.y],
            [rect.right(), rect.y],
            [rect.right(), rect.bottom()],
            [rect.x, rect.bottom()],
        ];
        self.emit_quad(pos, colors, QUAD_UV, VertexKind::Fill);
    }

    pub fn add_rounded_rectangle(&mut self, rect: Rect, color: Color, radius: f32, segments: u32) {
        if rect.is_empty() || color.is_invisible() {
            return;
        }
        let r = clamp_radius(&rect, radius);
        if !(r > 0.0) {
            self.add_rectangle(rect, color);
            return;
        }
        let budget = rounded_ring_len(segments).and_then(|n| Some((n, (n - 2).checked_mul(3)?)));
        if !self.prepare_checked(self.fill_key(), budget) {
            return;
        }
        let points = rounded_outline(&rect, r, segments.max(1));
        let n = points.len();
        let rgba = color.to_array();
        let base = self.pool.base();
        for p in &points {
            let (u, v) = rect.normalized(*p);
            self.pool
                .push_vertex(Vertex::new(*p, rgba, [u, v], VertexKind::Fill));
        }
        for i in 1..(n as u32 - 1) {
            self.pool.push_triangle(base, base + i, base + i + 1);
        }
    }

    pub fn add_rounded_rectangle_gradient(&mut self, rect: Rect, colors: [Color; 4], radius: f32, segments: u32) {
        if rect.is_empty() || colors.iter().all(Color::is_invisible) {
            return;
        }
        let r = clamp_radius(&rect, radius);
        if !(r > 0.0) {
            self.add_rectangle_gradient(rect, colors);
            return;
        }
        let budget = rounded_ring_len(segments).and_then(|n| Some((n + 1, n.checked_mul(3)?)));
        if !self.prepare_checked(self.fill_key(), budget) {
            return;
        }
        let ring: Vec<([f32; 2], Color)> = rounded_outline(&rect, r, segments.max(1))
            .into_iter()
            .map(|p| {
                let (u, v) = rect.normalized(p);
                (p, bilinear(&colors, u, v))
            })
            .collect();
        self.emit_fan(rect.center(), Color::average(&colors), &ring, true);
    }

    /// Stroke centred on the rounded outline; `radius` is clamped to at least
    /// half the thickness and at most half the smaller side.
    pub fn add_rounded_rectangle_outline(
        &mut self,
        rect: Rect,
        color: Color,
        thickness: f32,
        radius: f32,
        segments: u32,
    ) {
        if rect.is_empty() || color.is_invisible() || !(thickness > 0.0) {
            return;
        }
        let half = thickness * 0.5;
        let r = radius.max(half).min(rect.w.min(rect.h) * 0.5);
        let inner_r = (r - half).max(0.0);
        let budget = rounded_ring_len(segments).and_then(|n| Some((n.checked_mul(2)?, n.checked_mul(6)?)));
        if !self.prepare_checked(self.fill_key(), budget) {
            return;
        }
        let frames = rounded_corner_frames(&rect, r, segments.max(1));
        let outer: Vec<[f32; 2]> = frames
            .iter()
            .map(|(c, d)| [c[0] + d[0] * (r + half), c[1] + d[1] * (r + half)])
            .collect();
        let inner: Vec<[f32; 2]> = frames
            .iter()
            .map(|(c, d)| [c[0] + d[0] * inner_r, c[1] + d[1] * inner_r])
            .collect();
        self.emit_ring_strip(&outer, &inner, color, true);
    }

    // ── triangles, ellipses, pies ─────────────────────────────────────────────

    pub fn add_triangle(&mut self, p0: [f32; 2], p1: [f32; 2], p2: [f32; 2], color: Color) {
        let area2 = (p1[0] - p0[0]) * (p2[1] - p0[1]) - (p2[0] - p0[0]) * (p1[1] - p0[1]);
        if color.is_invisible() || area2.abs() < 1e-6 {
            return;
        }
        if !self.prepare(self.fill_key(), 3, 3) {
            return;
        }
        let rgba = color.to_array();
        let a = self.pool.push_vertex(Vertex::new(p0, rgba, [0., 0.], VertexKind::Fill));
        let b = self.pool.push_vertex(Vertex::new(p1, rgba, [1., 0.], VertexKind::Fill));
        let c = self.pool.push_vertex(Vertex::new(p2, rgba, [1., 1.], VertexKind::Fill));
        self.pool.push_triangle(a, b, c);
    }

    pub(crate) fn ellipse_segments_for(&self, rect: &Rect) -> u32 {
        let r = rect.w.max(rect.h) * 0.5;
        ellipse_segments(
            r,
            self.config.min_ellipse_segments,
            self.config.max_ellipse_segments,
        )
    }

    fn ellipse_ring(&self, rect: &Rect, grow: f32) -> Vec<[f32; 2]> {
        let n = self.ellipse_segments_for(rect);
        let rx = (rect.w * 0.5 + grow).max(0.0);
        let ry = (rect.h * 0.5 + grow).max(0.0);
        let mut pts = arc_points(rect.center(), rx, ry, 0.0, TAU, n);
        pts.pop();
        pts
    }

    pub fn add_circle(&mut self, center: [f32; 2], radius: f32, color: Color) {
        let d = radius * 2.0;
        self.add_ellipse(Rect::new(center[0] - radius, center[1] - radius, d, d), color);
    }

    /// Filled ellipse inscribed in `rect`, with an adaptive segment count.
    pub fn add_ellipse(&mut self, rect: Rect, color: Color) {
        if rect.is_empty() || color.is_invisible() {
            return;
        }
        let ring: Vec<_> = self
            .ellipse_ring(&rect, 0.0)
            .into_iter()
            .map(|p| (p, color))
            .collect();
        self.emit_fan(rect.center(), color, &ring, true);
    }

    pub fn add_ellipse_gradient(&mut self, rect: Rect, colors: [Color; 4]) {
        if rect.is_empty() || colors.iter().all(Color::is_invisible) {
            return;
        }
        let ring: Vec<_> = self
            .ellipse_ring(&rect, 0.0)
            .into_iter()
            .map(|p| {
                let (u, v) = rect.normalized(p);
                (p, bilinear(&colors, u, v))
            })
            .collect();
        self.emit_fan(rect.center(), bilinear(&colors, 0.5, 0.5), &ring, true);
    }

    /// Ellipse outline of `width`, centred on the inscribed ellipse.
    pub fn add_ellipse_outline(&mut self, rect: Rect, color: Color, width: f32) {
        if rect.is_empty() || color.is_invisible() || !(width > 0.0) {
            return;
        }
        let half = width * 0.5;
        let outer = self.ellipse_ring(&rect, half);
        let inner = self.ellipse_ring(&rect, -half);
        self.emit_ring_strip(&outer, &inner, color, true);
    }

    /// Filled pie wedge; angles in degrees, clockwise on screen from +x.
    pub fn add_pie(&mut self, rect: Rect, start_deg: f32, sweep_deg: f32, colors: [Color; 4]) {
        if rect.is_empty() || colors.iter().all(Color::is_invisible) || sweep_deg == 0.0 {
            return;
        }
        if sweep_deg.abs() >= 360.0 {
            self.add_ellipse_gradient(rect, colors);
            return;
        }
        let n = self.pie_segments_for(&rect, sweep_deg);
        let ring: Vec<_> = arc_points(
            rect.center(),
            rect.w * 0.5,
            rect.h * 0.5,
            start_deg.to_radians(),
            sweep_deg.to_radians(),
            n,
        )
        .into_iter()
        .map(|p| {
            let (u, v) = rect.normalized(p);
            (p, bilinear(&colors, u, v))
        })
        .collect();
        self.emit_fan(rect.center(), bilinear(&colors, 0.5, 0.5), &ring, false);
    }

    /// Open arc stroke of `width` along the inscribed ellipse.
    pub fn add_arc(&mut self, rect: Rect, start_deg: f32, sweep_deg: f32, color: Color, width: f32) {
        if rect.is_empty() || color.is_invisible() || !(width > 0.0) || sweep_deg == 0.0 {
            return;
        }
        if sweep_deg.abs() >= 360.0 {
            self.add_ellipse_outline(rect, color, width);
            return;
        }
        let n = self.pie_segments_for(&rect, sweep_deg);
        let half = width * 0.5;
        let ring = |grow: f32| {
            arc_points(
                rect.center(),
                (rect.w * 0.5 + grow).max(0.0),
                (rect.h * 0.5 + grow).max(0.0),
                start_deg.to_radians(),
                sweep_deg.to_radians(),
                n,
            )
        };
        let (outer, inner) = (ring(half), ring(-half));
        self.emit_ring_strip(&outer, &inner, color, false);
    }

    pub(crate) fn pie_segments_for(&self, rect: &Rect, sweep_deg: f32) -> u32 {
        pie_segments(
            rect.w.max(rect.h) * 0.5,
            sweep_deg,
            self.config.min_ellipse_segments,
            self.config.max_ellipse_segments,
        )
    }

    // ── lines ─────────────────────────────────────────────────────────────────

    /// Thick line as a quad. `tex_coord.x` runs `0..length`, `tex_coord.y`
    /// carries the width, for the shader's stipple patterns.
    pub fn add_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Color, width: f32, style: LineStyle) {
        self.emit_line([x1, y1], [x2, y2], color, width, style.vertex_kind(), 0.0);
    }

    /// Connected segments sharing one stipple phase; distance accumulates
    /// across the joints.
    pub fn add_polyline(&mut self, points: &[[f32; 2]], color: Color, width: f32, style: LineStyle, closed: bool) {
        if points.len() < 2 {
            return;
        }
        // Two points have no interior to close around.
        let closed = closed && points.len() >= 3;
        let kind = style.vertex_kind();
        let mut dist = 0.0;
        let count = if closed { points.len() } else { points.len() - 1 };
        for i in 0..count {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            dist += self.emit_line(a, b, color, width, kind, dist);
        }
    }

    /// Returns the segment length, or 0 if it was skipped.
    fn emit_line(&mut self, a: [f32; 2], b: [f32; 2], color: Color, width: f32, kind: VertexKind, start: f32) -> f32 {
        let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
        let len = (dx * dx + dy * dy).sqrt();
        if !(len >= self.config.min_line_length) || color.is_invisible() || !(width > 0.0) {
            return 0.0;
        }
        if !self.prepare(self.fill_key(), 4, 6) {
            return len;
        }
        let nx = -dy / len * width * 0.5;
        let ny = dx / len * width * 0.5;
        let pos = [
            [a[0] + nx, a[1] + ny],
            [a[0] - nx, a[1] - ny],
            [b[0] - nx, b[1] - ny],
            [b[0] + nx, b[1] + ny],
        ];
        let end = start + len;
        let tc = [[start, width], [start, width], [end, width], [end, width]];
        self.emit_quad(pos, [color; 4], tc, kind);
        len
    }

    /// One-pixel GPU line, drawn with the non-indexed Lines topology.
    pub fn add_hairline(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Color) {
        let len = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        if !(len >= self.config.min_line_length) || color.is_invisible() {
            return;
        }
        let key = BatchKey {
            texture: None,
            topology: Topology::Lines,
        };
        if !self.prepare(key, 2, 0) {
            return;
        }
        let rgba = color.to_array();
        self.pool
            .push_vertex(Vertex::new([x1, y1], rgba, [0., 0.], VertexKind::Fill));
        self.pool
            .push_vertex(Vertex::new([x2, y2], rgba, [len, 1.], VertexKind::Fill));
    }

    // ── textured quads ────────────────────────────────────────────────────────

    /// Glyph quad; `uv` is the glyph's rect inside its atlas.
    pub fn add_glyph(&mut self, texture: TextureId, dest: Rect, uv: Rect, color: Color) {
        if dest.is_empty() || color.is_invisible() {
            return;
        }
        let key = BatchKey {
            texture: Some(texture),
            topology: Topology::Triangles,
        };
        self.emit_textured_quad(key, dest, uv, color, VertexKind::Glyph);
    }

    /// Image quad tinted by `tint` (white = untouched).
    pub fn add_image(&mut self, texture: TextureId, dest: Rect, uv: Rect, tint: Color) {
        if dest.is_empty() || tint.is_invisible() {
            return;
        }
        let key = BatchKey {
            texture: Some(texture),
            topology: Topology::Triangles,
        };
        self.emit_textured_quad(key, dest, uv, tint, VertexKind::Fill);
    }

    /// Repeat `texture` every `tile_w × tile_h` pixels across `dest`.
    ///
    /// Runs as its own batch: pending geometry is flushed, the sampler is
    /// switched to Repeat, the quad is drawn and flushed, then the previous
    /// wrap mode is restored. No other geometry ever sees the Repeat state.
    pub fn add_tiled_image(&mut self, texture: TextureId, dest: Rect, tile_w: f32, tile_h: f32, tint: Color) {
        if dest.is_empty() || tint.is_invisible() || !(tile_w > 0.0) || !(tile_h > 0.0) {
            return;
        }
        self.flush();
        let previous = self.device.wrap_mode(texture);
        if previous != WrapMode::Repeat {
            self.device.set_wrap_mode(texture, WrapMode::Repeat);
        }
        let uv = Rect::new(0.0, 0.0, dest.w / tile_w, dest.h / tile_h);
        self.add_image(texture, dest, uv, tint);
        self.flush();
        if previous != WrapMode::Repeat {
            self.device.set_wrap_mode(texture, previous);
        }
    }
}

/// Points on a rounded outline with `segments` per corner, if that count
/// fits in `usize`.
fn rounded_ring_len(segments: u32) -> Option<usize> {
    usize::try_from(segments.max(1)).ok()?.checked_add(1)?.checked_mul(4)
}

// ── test support ──────────────────────────────────────────────────────────────
