pub mod batcher;
pub mod buffer;
pub mod clip;
pub mod config;
pub mod device;
pub mod draw;
pub mod error;
pub mod flush;
pub mod font;
pub mod geometry;
pub mod gl_device;
pub mod glyph;
pub mod recorder;
pub mod scale;
pub mod shader;
pub mod surface;
pub mod tree;
pub mod vertex;

pub use batcher::{BatchKey, Batcher};
pub use clip::{ClipChange, ClipScope, ClipStack};
pub use config::RendererConfig;
pub use device::{GpuDevice, TextureId, TextureStore};
pub use draw::{measure_string, Brush, GradientDirection, Pen, ShapeStyle};
pub use error::{RenderError, Result};
pub use flush::FrameStats;
pub use geometry::{Color, IRect, Rect};
pub use glyph::{GlyphInfo, GlyphSource};
pub use surface::SurfaceId;
pub use tree::{paint_frame, PaintNode, PaintResult, PaintSummary};
pub use vertex::{LineStyle, Topology, Vertex, VertexKind};
