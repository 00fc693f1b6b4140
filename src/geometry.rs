// geometry.rs — rectangles, colours and the tessellation math shared by every
// primitive: arc sampling, adaptive segment counts, bilinear corner colours.

use std::f32::consts::{FRAC_PI_2, PI};

// ── Rect ──────────────────────────────────────────────────────────────────────

/// Float rectangle in surface pixels, top-left origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> [f32; 2] {
        [self.x + self.w * 0.5, self.y + self.h * 0.5]
    }

    pub fn is_empty(&self) -> bool {
        !(self.w > 0.0 && self.h > 0.0)
    }

    /// Overlap of two rectangles, clamped to non-negative size.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        Rect::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.intersect(other).is_empty()
    }

    pub fn inset(&self, d: f32) -> Rect {
        Rect::new(
            self.x + d,
            self.y + d,
            (self.w - 2.0 * d).max(0.0),
            (self.h - 2.0 * d).max(0.0),
        )
    }

    /// Position of `p` inside the rect as `(u, v)` in `0..=1`.
    pub fn normalized(&self, p: [f32; 2]) -> (f32, f32) {
        let u = if self.w > 0.0 { (p[0] - self.x) / self.w } else { 0.0 };
        let v = if self.h > 0.0 { (p[1] - self.y) / self.h } else { 0.0 };
        (u.clamp(0.0, 1.0), v.clamp(0.0, 1.0))
    }
}

// ── IRect ─────────────────────────────────────────────────────────────────────

/// Integer rectangle used for scissor boxes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl IRect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Round edges to the nearest pixel; size never goes negative.
    pub fn from_rect(r: &Rect) -> Self {
        let x0 = r.x.round() as i32;
        let y0 = r.y.round() as i32;
        let x1 = r.right().round() as i32;
        let y1 = r.bottom().round() as i32;
        Self {
            x: x0,
            y: y0,
            w: (x1 - x0).max(0),
            h: (y1 - y0).max(0),
        }
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(self.x as f32, self.y as f32, self.w as f32, self.h as f32)
    }

    pub fn has_area(&self) -> bool {
        self.w > 0 && self.h > 0
    }
}

// ── Color ─────────────────────────────────────────────────────────────────────

/// Straight (non-premultiplied) RGBA in `0..=1`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const RED: Self = Self::new(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Self = Self::new(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Self = Self::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.,
            g as f32 / 255.,
            b as f32 / 255.,
            a as f32 / 255.,
        )
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn is_invisible(&self) -> bool {
        self.a <= 0.0
    }

    pub fn lerp(self, other: Color, t: f32) -> Color {
        Color::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    pub fn average(colors: &[Color; 4]) -> Color {
        let mut sum = [0.0f32; 4];
        for c in colors {
            sum[0] += c.r;
            sum[1] += c.g;
            sum[2] += c.b;
            sum[3] += c.a;
        }
        Color::new(sum[0] / 4.0, sum[1] / 4.0, sum[2] / 4.0, sum[3] / 4.0)
    }
}

/// Bilinear blend of corner colours ordered `[top-left, top-right,
/// bottom-right, bottom-left]` at normalized position `(u, v)`.
pub fn bilinear(corners: &[Color; 4], u: f32, v: f32) -> Color {
    let top = corners[0].lerp(corners[1], u);
    let bottom = corners[3].lerp(corners[2], u);
    top.lerp(bottom, v)
}

// ── Arc tessellation ──────────────────────────────────────────────────────────

/// Adaptive segment count for a full circle of `radius` pixels.
///
/// `2π / (2·acos(r / (r + 0.125)))` keeps the chord deviation under an eighth
/// of a pixel, so smoothness does not depend on size. Clamped to
/// `min..=max`.
pub fn ellipse_segments(radius: f32, min: u32, max: u32) -> u32 {
    let min = min.max(3);
    let max = max.max(min);
    if !(radius > 0.0) || !radius.is_finite() {
        return min;
    }
    let r = radius as f64;
    let half_step = (r / (r + 0.125)).acos();
    if half_step <= f64::EPSILON {
        return max;
    }
    let n = (std::f64::consts::TAU / (2.0 * half_step)).round().min(u32::MAX as f64);
    (n as u32).clamp(min, max)
}

/// Segment count for an arc of `sweep_deg` degrees on a circle of `radius`.
pub fn pie_segments(radius: f32, sweep_deg: f32, min: u32, max: u32) -> u32 {
    let full = ellipse_segments(radius, min, max) as f32;
    let frac = (sweep_deg.abs() / 360.0).min(1.0);
    ((full * frac).ceil() as u32).max(2)
}

/// `segments + 1` points on a 90° arc starting at `start` radians.
/// Angles follow screen space: 0 = +x, π/2 = +y (down).
pub fn corner_arc(center: [f32; 2], radius: f32, start: f32, segments: u32) -> Vec<[f32; 2]> {
    arc_points(center, radius, radius, start, FRAC_PI_2, segments)
}

/// `segments + 1` points on an elliptical arc from `start` sweeping `sweep`
/// radians.
pub fn arc_points(
    center: [f32; 2],
    rx: f32,
    ry: f32,
    start: f32,
    sweep: f32,
    segments: u32,
) -> Vec<[f32; 2]> {
    let segments = segments.max(1);
    let step = sweep / segments as f32;
    (0..=segments)
        .map(|i| {
            let t = start + step * i as f32;
            [center[0] + t.cos() * rx, center[1] + t.sin() * ry]
        })
        .collect()
}

/// Clockwise (screen space) outline of a rounded rectangle: four corner arcs
/// of `segments + 1` points each, starting at the top-left corner.
pub fn rounded_outline(rect: &Rect, radius: f32, segments: u32) -> Vec<[f32; 2]> {
    rounded_corner_frames(rect, radius, segments)
        .into_iter()
        .map(|(c, d)| [c[0] + d[0] * radius, c[1] + d[1] * radius])
        .collect()
}

/// Same walk as `rounded_outline`, but yields each sample as its corner
/// centre plus unit direction, so callers can offset along the normal.
pub fn rounded_corner_frames(
    rect: &Rect,
    radius: f32,
    segments: u32,
) -> Vec<([f32; 2], [f32; 2])> {
    let r = radius;
    let segments = segments.max(1);
    let corners = [
        ([rect.x + r, rect.y + r], PI),
        ([rect.right() - r, rect.y + r], PI * 1.5),
        ([rect.right() - r, rect.bottom() - r], 0.0),
        ([rect.x + r, rect.bottom() - r], FRAC_PI_2),
    ];
    let mut out = Vec::with_capacity((segments as usize + 1) * 4);
    for (c, start) in corners {
        out.extend(
            corner_arc([0.0, 0.0], 1.0, start, segments)
                .into_iter()
                .map(|d| (c, d)),
        );
    }
    out
}

/// Clamp a corner radius to what fits the rect.
pub fn clamp_radius(rect: &Rect, radius: f32) -> f32 {
    radius.min(rect.w.min(rect.h) * 0.5)
}

/// Orthographic projection, top-left origin, column-major.
pub fn ortho(width: f32, height: f32) -> [f32; 16] {
    let w = width.max(1.0);
    let h = height.max(1.0);
    #[rustfmt::skip]
    let m = [
        2.0 / w, 0.0,      0.0,  0.0,
        0.0,     -2.0 / h, 0.0,  0.0,
        0.0,     0.0,      -1.0, 0.0,
        -1.0,    1.0,      0.0,  1.0,
    ];
    m
}

// ── Tests ─────────────────────────────────────────────────────────────────────
