// recorder.rs — headless `GpuDevice` that records what a real device would
// have been asked to do. Backs the test-suite and `glint-trace`.

use std::collections::{HashMap, HashSet};

use crate::device::{GpuDevice, TextureDesc, TextureId, TextureStore, VaoId, WrapMode};
use crate::geometry::IRect;
use crate::vertex::{Topology, Vertex};

/// One issued draw call with the state it was issued under.
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub texture: Option<TextureId>,
    pub topology: Topology,
    pub indexed: bool,
    pub vao: Option<VaoId>,
    pub scissor: Option<IRect>,
    pub projection: [f32; 16],
}

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateVertexArray(VaoId),
    DeleteVertexArray(VaoId),
    BindVertexArray(VaoId),
    UseProgram,
    SetGamma(f32),
    BindTexture(Option<TextureId>),
    UploadVertices(usize),
    UploadIndices(usize),
    DrawElements(usize),
    DrawArrays(Topology, usize),
    Viewport(u32, u32),
    Scissor(Option<IRect>),
    SetWrapMode(TextureId, WrapMode),
    CreateTexture(TextureId),
    UpdateTexture(TextureId, IRect),
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub calls: Vec<GpuCall>,
    pub draws: Vec<DrawRecord>,
    pub textures: HashMap<TextureId, TextureDesc>,
    pub wrap_modes: HashMap<TextureId, WrapMode>,
    live_vaos: HashSet<VaoId>,
    next_id: u32,
    bound_vao: Option<VaoId>,
    bound_texture: Option<TextureId>,
    scissor: Option<IRect>,
    projection: [f32; 16],
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    capacity: Option<(usize, usize)>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behave like a device whose buffers hold `vertices` / `indices`.
    pub fn with_buffer_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            capacity: Some((vertices, indices)),
            ..Self::default()
        }
    }

    pub fn scissor(&self) -> Option<IRect> {
        self.scissor
    }

    pub fn draw_calls(&self) -> usize {
        self.draws.len()
    }

    pub fn scissor_changes(&self) -> Vec<Option<IRect>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                GpuCall::Scissor(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    /// Drop a VAO behind the renderer's back, as a lost context would.
    pub fn forget_vertex_array(&mut self, vao: VaoId) {
        self.live_vaos.remove(&vao);
    }

    pub fn clear_log(&mut self) {
        self.calls.clear();
        self.draws.clear();
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn record_draw(&mut self, topology: Topology, indexed: bool) {
        self.draws.push(DrawRecord {
            vertices: self.vertices.clone(),
            indices: if indexed { self.indices.clone() } else { Vec::new() },
            texture: self.bound_texture,
            topology,
            indexed,
            vao: self.bound_vao,
            scissor: self.scissor,
            projection: self.projection,
        });
    }
}

impl TextureStore for RecordingDevice {
    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> TextureId {
        debug_assert!(pixels.is_empty() || pixels.len() == desc.byte_len());
        let id = TextureId(self.next());
        self.textures.insert(id, *desc);
        self.calls.push(GpuCall::CreateTexture(id));
        id
    }

    fn update_texture(&mut self, texture: TextureId, region: IRect, pixels: &[u8]) {
        if let Some(desc) = self.textures.get(&texture) {
            debug_assert_eq!(
                pixels.len(),
                region.w as usize * region.h as usize * desc.format.bytes_per_pixel()
            );
        }
        self.calls.push(GpuCall::UpdateTexture(texture, region));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.wrap_modes.remove(&texture);
    }
}

impl GpuDevice for RecordingDevice {
    fn create_vertex_array(&mut self) -> VaoId {
        let vao = VaoId(self.next());
        self.live_vaos.insert(vao);
        self.calls.push(GpuCall::CreateVertexArray(vao));
        vao
    }

    fn vertex_array_exists(&self, vao: VaoId) -> bool {
        self.live_vaos.contains(&vao)
    }

    fn delete_vertex_array(&mut self, vao: VaoId) {
        self.live_vaos.remove(&vao);
        if self.bound_vao == Some(vao) {
            self.bound_vao = None;
        }
        self.calls.push(GpuCall::DeleteVertexArray(vao));
    }

    fn bind_vertex_array(&mut self, vao: VaoId) {
        self.bound_vao = Some(vao);
        self.calls.push(GpuCall::BindVertexArray(vao));
    }

    fn use_program(&mut self) {
        self.calls.push(GpuCall::UseProgram);
    }

    fn set_projection(&mut self, matrix: &[f32; 16]) {
        self.projection = *matrix;
    }

    fn set_gamma(&mut self, gamma: f32) {
        self.calls.push(GpuCall::SetGamma(gamma));
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.bound_texture = texture;
        self.calls.push(GpuCall::BindTexture(texture));
    }

    fn buffer_capacity(&self) -> Option<(usize, usize)> {
        self.capacity
    }

    fn upload_vertices(&mut self, vertices: &[Vertex]) {
        if let Some((max_v, _)) = self.capacity {
            assert!(vertices.len() <= max_v, "{} vertices overrun a {max_v}-vertex buffer", vertices.len());
        }
        self.vertices = vertices.to_vec();
        self.calls.push(GpuCall::UploadVertices(vertices.len()));
    }

    fn upload_indices(&mut self, indices: &[u32]) {
        if let Some((_, max_i)) = self.capacity {
            assert!(indices.len() <= max_i, "{} indices overrun a {max_i}-index buffer", indices.len());
        }
        self.indices = indices.to_vec();
        self.calls.push(GpuCall::UploadIndices(indices.len()));
    }

    fn draw_elements(&mut self, index_count: usize) {
        self.calls.push(GpuCall::DrawElements(index_count));
        self.record_draw(Topology::Triangles, true);
    }

    fn draw_arrays(&mut self, topology: Topology, vertex_count: usize) {
        self.calls.push(GpuCall::DrawArrays(topology, vertex_count));
        self.record_draw(topology, false);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(GpuCall::Viewport(width, height));
    }

    fn set_scissor(&mut self, scissor: Option<IRect>) {
        self.scissor = scissor;
        self.calls.push(GpuCall::Scissor(scissor));
    }

    fn wrap_mode(&self, texture: TextureId) -> WrapMode {
        self.wrap_modes.get(&texture).copied().unwrap_or_default()
    }

    fn set_wrap_mode(&mut self, texture: TextureId, mode: WrapMode) {
        self.wrap_modes.insert(texture, mode);
        self.calls.push(GpuCall::SetWrapMode(texture, mode));
    }
}
