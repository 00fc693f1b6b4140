// vertex.rs — the single vertex layout shared by every primitive, plus the
// per-vertex discriminator and the batch topology.

use bytemuck::{Pod, Zeroable};

/// Interleaved vertex: position, straight RGBA colour, texture coordinate and
/// a float tag selecting the fragment path.
///
/// Attribute locations are fixed: 0 = position, 1 = color, 2 = tex_coord,
/// 3 = kind.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
    pub kind: f32,
}

impl Vertex {
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();
    pub const OFFSET_POSITION: usize = 0;
    pub const OFFSET_COLOR: usize = 8;
    pub const OFFSET_TEX_COORD: usize = 24;
    pub const OFFSET_KIND: usize = 32;

    pub fn new(position: [f32; 2], color: [f32; 4], tex_coord: [f32; 2], kind: VertexKind) -> Self {
        Self {
            position,
            color,
            tex_coord,
            kind: kind.as_f32(),
        }
    }

    pub fn kind(&self) -> VertexKind {
        VertexKind::from_f32(self.kind)
    }
}

// ── Discriminator ─────────────────────────────────────────────────────────────

/// Fragment-stage behaviour for a vertex.
///
/// For the line patterns `tex_coord.x` is the distance along the segment and
/// `tex_coord.y` the line width; the shader stipples on those.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VertexKind {
    /// Colour times the bound texture (the white pixel for solid fills).
    #[default]
    Fill,
    /// Red channel as coverage, gamma corrected.
    Glyph,
    Dotted,
    Dashed,
    DashDot,
}

impl VertexKind {
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Fill => 0.0,
            Self::Glyph => 1.0,
            Self::Dotted => 2.0,
            Self::Dashed => 3.0,
            Self::DashDot => 4.0,
        }
    }

    pub fn from_f32(v: f32) -> Self {
        match v.round() as i32 {
            1 => Self::Glyph,
            2 => Self::Dotted,
            3 => Self::Dashed,
            4 => Self::DashDot,
            _ => Self::Fill,
        }
    }
}

/// Stroke pattern for thick lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineStyle {
    #[default]
    Solid,
    Dotted,
    Dashed,
    DashDot,
}

impl LineStyle {
    pub fn vertex_kind(self) -> VertexKind {
        match self {
            Self::Solid => VertexKind::Fill,
            Self::Dotted => VertexKind::Dotted,
            Self::Dashed => VertexKind::Dashed,
            Self::DashDot => VertexKind::DashDot,
        }
    }
}

// ── Topology ──────────────────────────────────────────────────────────────────

/// Primitive assembly for a batch. Triangles are always indexed; lines are
/// drawn straight from the vertex range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Topology {
    #[default]
    Triangles,
    Lines,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_tightly_packed() {
        assert_eq!(Vertex::STRIDE, 36);
        let v = Vertex::new([1., 2.], [3., 4., 5., 6.], [7., 8.], VertexKind::Dashed);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(floats, &[1., 2., 3., 4., 5., 6., 7., 8., 3.]);
    }

    #[test]
    fn style_discriminators() {
        assert_eq!(LineStyle::Solid.vertex_kind().as_f32(), 0.0);
        assert_eq!(LineStyle::Dotted.vertex_kind().as_f32(), 2.0);
        assert_eq!(LineStyle::Dashed.vertex_kind().as_f32(), 3.0);
        assert_eq!(LineStyle::DashDot.vertex_kind().as_f32(), 4.0);
        assert_eq!(VertexKind::from_f32(1.0), VertexKind::Glyph);
    }
}
