// gl_device.rs — `GpuDevice` over real OpenGL (ES 3.0 / GL 3.3 core).
//
// The caller owns the context: it loads function pointers with
// `gl::load_with` and makes the right context current before every batcher
// call. One VBO/IBO pair is allocated up front at the configured capacities
// and reused by every surface; each surface gets its own VAO pointing at them.

use std::collections::HashMap;

use crate::config::RendererConfig;
use crate::device::{Filter, GpuDevice, TextureDesc, TextureFormat, TextureId, TextureStore, VaoId, WrapMode};
use crate::error::{RenderError, Result};
use crate::geometry::IRect;
use crate::shader::{ShaderProgram, FRAGMENT_SHADER, VERTEX_SHADER};
use crate::vertex::{Topology, Vertex};

pub struct GlDevice {
    program: ShaderProgram,
    vbo: u32,
    ibo: u32,
    vertex_capacity: usize,
    index_capacity: usize,
    viewport_h: i32,
    formats: HashMap<TextureId, TextureFormat>,
}

impl GlDevice {
    /// Compile the shader and allocate the shared buffers. Fails if either
    /// step does; nothing can be drawn without them.
    pub fn new(config: &RendererConfig) -> Result<Self> {
        config.validate()?;
        let program = unsafe { ShaderProgram::compile(VERTEX_SHADER, FRAGMENT_SHADER)? };
        let (vbo, ibo) = unsafe {
            let (mut vbo, mut ibo) = (0u32, 0u32);
            gl::GenBuffers(1, &mut vbo);
            gl::GenBuffers(1, &mut ibo);
            gl::BindBuffer(gl::ARRAY_BUFFER, vbo);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                (config.vertex_capacity * Vertex::STRIDE) as isize,
                std::ptr::null(),
                gl::DYNAMIC_DRAW,
            );
            gl::BindBuffer(gl::ARRAY_BUFFER, 0);
            // Element buffer storage is allocated through the copy-read
            // target so no VAO's element binding is disturbed.
            gl::BindBuffer(gl::COPY_READ_BUFFER, ibo);
            gl::BufferData(
                gl::COPY_READ_BUFFER,
                (config.index_capacity * std::mem::size_of::<u32>()) as isize,
                std::ptr::null(),
                gl::DYNAMIC_DRAW,
            );
            gl::BindBuffer(gl::COPY_READ_BUFFER, 0);

            let err = gl::GetError();
            if err != gl::NO_ERROR {
                gl::DeleteBuffers(1, &vbo);
                gl::DeleteBuffers(1, &ibo);
                program.delete();
                return Err(RenderError::BufferAllocation(format!(
                    "glBufferData failed with 0x{err:04X} for {} vertices / {} indices",
                    config.vertex_capacity, config.index_capacity
                )));
            }

            gl::Enable(gl::BLEND);
            gl::BlendFuncSeparate(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA, gl::ONE, gl::ONE_MINUS_SRC_ALPHA);
            (vbo, ibo)
        };
        tracing::info!(
            "GlDevice: program={} vbo={vbo} ibo={ibo} capacity={}/{}",
            program.id,
            config.vertex_capacity,
            config.index_capacity
        );
        Ok(Self {
            program,
            vbo,
            ibo,
            vertex_capacity: config.vertex_capacity,
            index_capacity: config.index_capacity,
            viewport_h: 0,
            formats: HashMap::new(),
        })
    }
}

impl Drop for GlDevice {
    fn drop(&mut self) {
        // Needs the owning context current, as every other call does.
        unsafe {
            gl::DeleteBuffers(1, &self.vbo);
            gl::DeleteBuffers(1, &self.ibo);
            self.program.delete();
        }
    }
}

unsafe fn float_attr(loc: u32, size: i32, offset: usize) {
    gl::EnableVertexAttribArray(loc);
    gl::VertexAttribPointer(
        loc,
        size,
        gl::FLOAT,
        gl::FALSE,
        Vertex::STRIDE as i32,
        offset as *const _,
    );
}

fn gl_filter(filter: Filter) -> i32 {
    match filter {
        Filter::Linear => gl::LINEAR as i32,
        Filter::Nearest => gl::NEAREST as i32,
    }
}

fn gl_format(format: TextureFormat) -> (i32, u32) {
    match format {
        TextureFormat::Rgba8 => (gl::RGBA8 as i32, gl::RGBA),
        TextureFormat::R8 => (gl::R8 as i32, gl::RED),
    }
}

impl TextureStore for GlDevice {
    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> TextureId {
        debug_assert!(pixels.is_empty() || pixels.len() == desc.byte_len());
        let (internal, format) = gl_format(desc.format);
        let data = if pixels.is_empty() {
            std::ptr::null()
        } else {
            pixels.as_ptr() as *const _
        };
        let mut tex = 0u32;
        unsafe {
            gl::GenTextures(1, &mut tex);
            gl::BindTexture(gl::TEXTURE_2D, tex);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl_filter(desc.filter));
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl_filter(desc.filter));
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as i32);
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, desc.format.bytes_per_pixel() as i32);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                internal,
                desc.width as i32,
                desc.height as i32,
                0,
                format,
                gl::UNSIGNED_BYTE,
                data,
            );
        }
        let id = TextureId(tex);
        self.formats.insert(id, desc.format);
        tracing::debug!("texture {id:?}: {}x{} {:?}", desc.width, desc.height, desc.format);
        id
    }

    fn update_texture(&mut self, texture: TextureId, region: IRect, pixels: &[u8]) {
        let fmt = self.formats.get(&texture).copied().unwrap_or_default();
        debug_assert_eq!(
            pixels.len(),
            region.w as usize * region.h as usize * fmt.bytes_per_pixel()
        );
        let (_, format) = gl_format(fmt);
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, texture.0);
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, fmt.bytes_per_pixel() as i32);
            gl::TexSubImage2D(
                gl::TEXTURE_2D,
                0,
                region.x,
                region.y,
                region.w,
                region.h,
                format,
                gl::UNSIGNED_BYTE,
                pixels.as_ptr() as *const _,
            );
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.formats.remove(&texture);
        unsafe { gl::DeleteTextures(1, &texture.0) };
    }
}

impl GpuDevice for GlDevice {
    fn create_vertex_array(&mut self) -> VaoId {
        let mut vao = 0u32;
        unsafe {
            gl::GenVertexArrays(1, &mut vao);
            gl::BindVertexArray(vao);
            gl::BindBuffer(gl::ARRAY_BUFFER, self.vbo);
            float_attr(0, 2, Vertex::OFFSET_POSITION);
            float_attr(1, 4, Vertex::OFFSET_COLOR);
            float_attr(2, 2, Vertex::OFFSET_TEX_COORD);
            float_attr(3, 1, Vertex::OFFSET_KIND);
            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, self.ibo);
            gl::BindVertexArray(0);
        }
        VaoId(vao)
    }

    fn vertex_array_exists(&self, vao: VaoId) -> bool {
        unsafe { gl::IsVertexArray(vao.0) == gl::TRUE }
    }

    fn delete_vertex_array(&mut self, vao: VaoId) {
        unsafe { gl::DeleteVertexArrays(1, &vao.0) };
    }

    fn bind_vertex_array(&mut self, vao: VaoId) {
        unsafe { gl::BindVertexArray(vao.0) };
    }

    fn use_program(&mut self) {
        unsafe { self.program.bind() };
    }

    fn set_projection(&mut self, matrix: &[f32; 16]) {
        unsafe { self.program.set_projection(matrix) };
    }

    fn set_gamma(&mut self, gamma: f32) {
        unsafe { self.program.set_gamma(gamma) };
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, texture.map_or(0, |t| t.0));
            self.program.set_use_texture(texture.is_some());
        }
    }

    fn upload_vertices(&mut self, vertices: &[Vertex]) {
        debug_assert!(vertices.len() <= self.vertex_capacity);
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        unsafe {
            gl::BindBuffer(gl::ARRAY_BUFFER, self.vbo);
            gl::BufferSubData(gl::ARRAY_BUFFER, 0, bytes.len() as isize, bytes.as_ptr() as *const _);
        }
    }

    fn upload_indices(&mut self, indices: &[u32]) {
        debug_assert!(indices.len() <= self.index_capacity);
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        // The bound VAO already references `ibo` as its element buffer.
        unsafe {
            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, self.ibo);
            gl::BufferSubData(
                gl::ELEMENT_ARRAY_BUFFER,
                0,
                bytes.len() as isize,
                bytes.as_ptr() as *const _,
            );
        }
    }

    fn draw_elements(&mut self, index_count: usize) {
        unsafe {
            gl::DrawElements(gl::TRIANGLES, index_count as i32, gl::UNSIGNED_INT, std::ptr::null());
        }
    }

    fn draw_arrays(&mut self, topology: Topology, vertex_count: usize) {
        let mode = match topology {
            Topology::Triangles => gl::TRIANGLES,
            Topology::Lines => gl::LINES,
        };
        unsafe { gl::DrawArrays(mode, 0, vertex_count as i32) };
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport_h = height as i32;
        unsafe { gl::Viewport(0, 0, width as i32, height as i32) };
    }

    fn set_scissor(&mut self, scissor: Option<IRect>) {
        unsafe {
            match scissor {
                Some(r) => {
                    gl::Enable(gl::SCISSOR_TEST);
                    // GL's scissor origin is bottom-left.
                    gl::Scissor(r.x, self.viewport_h - (r.y + r.h), r.w, r.h);
                }
                None => gl::Disable(gl::SCISSOR_TEST),
            }
        }
    }

    fn buffer_capacity(&self) -> Option<(usize, usize)> {
        Some((self.vertex_capacity, self.index_capacity))
    }

    fn wrap_mode(&self, texture: TextureId) -> WrapMode {
        let mut mode = 0i32;
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, texture.0);
            gl::GetTexParameteriv(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, &mut mode);
        }
        if mode == gl::REPEAT as i32 {
            WrapMode::Repeat
        } else {
            WrapMode::ClampToEdge
        }
    }

    fn set_wrap_mode(&mut self, texture: TextureId, mode: WrapMode) {
        let value = match mode {
            WrapMode::ClampToEdge => gl::CLAMP_TO_EDGE,
            WrapMode::Repeat => gl::REPEAT,
        } as i32;
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, texture.0);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, value);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, value);
        }
    }
}
