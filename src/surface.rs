// surface.rs — per-surface GPU identity.
//
// One vertex/index buffer pair is shared by every surface; only the vertex
// array object (attribute bindings) and the clip stack are per surface. The
// map is mutated only by bind/unbind, on the thread owning the GL context.

use std::collections::HashMap;

use crate::batcher::{BatchKey, Batcher};
use crate::clip::ClipStack;
use crate::device::{GpuDevice, VaoId};
use crate::geometry::{ortho, Rect};

/// Opaque identity of a rendering surface (window).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

pub(crate) struct SurfaceState {
    pub vao: VaoId,
    pub width: u32,
    pub height: u32,
    pub projection: [f32; 16],
    pub clip: ClipStack,
}

impl SurfaceState {
    pub fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

#[derive(Default)]
pub(crate) struct SurfaceRegistry {
    states: HashMap<SurfaceId, SurfaceState>,
    active: Option<SurfaceId>,
}

impl SurfaceRegistry {
    pub fn active(&self) -> Option<SurfaceId> {
        self.active
    }

    pub fn active_state(&self) -> Option<&SurfaceState> {
        self.states.get(&self.active?)
    }

    pub fn active_state_mut(&mut self) -> Option<&mut SurfaceState> {
        self.states.get_mut(&self.active?)
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut SurfaceState> {
        self.states.get_mut(&id)
    }

    pub fn vao(&self, id: SurfaceId) -> Option<VaoId> {
        self.states.get(&id).map(|s| s.vao)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }
}

impl<D: GpuDevice> Batcher<D> {
    /// Make `surface` the drawing target. The caller must already have made
    /// its GL context current on this thread.
    ///
    /// Flushes anything staged for the previous target, syncs the viewport and
    /// projection to `width × height`, looks up the surface's VAO (creating it
    /// on first use, or again if the old one no longer exists), resets the
    /// texture cache and re-applies the surface's scissor.
    pub fn bind_context(&mut self, surface: SurfaceId, width: u32, height: u32) {
        self.flush();
        self.device.set_viewport(width, height);

        let vao = match self.surfaces.vao(surface) {
            Some(vao) if self.device.vertex_array_exists(vao) => vao,
            Some(stale) => {
                let vao = self.device.create_vertex_array();
                tracing::debug!("VAO {stale:?} for {surface:?} is gone — recreated as {vao:?}");
                vao
            }
            None => {
                let vao = self.device.create_vertex_array();
                tracing::debug!("created VAO {vao:?} for {surface:?}");
                vao
            }
        };

        let projection = ortho(width as f32, height as f32);
        let state = self
            .surfaces
            .states
            .entry(surface)
            .or_insert_with(|| SurfaceState {
                vao,
                width,
                height,
                projection,
                clip: ClipStack::new(),
            });
        state.vao = vao;
        state.width = width;
        state.height = height;
        state.projection = projection;
        let scissor = state.clip.recent();

        self.surfaces.active = Some(surface);
        self.key = BatchKey::default();
        self.device.set_scissor(scissor);
    }

    /// Forget `surface` (its window closed): flush if it is the target, then
    /// delete its VAO.
    pub fn unbind_context(&mut self, surface: SurfaceId) {
        if self.surfaces.active == Some(surface) {
            self.flush();
            self.surfaces.active = None;
        }
        if let Some(state) = self.surfaces.states.remove(&surface) {
            if self.device.vertex_array_exists(state.vao) {
                self.device.delete_vertex_array(state.vao);
            }
            tracing::debug!("released VAO {:?} for {surface:?}", state.vao);
        }
    }

    pub fn active_surface(&self) -> Option<SurfaceId> {
        self.surfaces.active()
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Full-surface rect of the bound target.
    pub fn viewport(&self) -> Option<Rect> {
        self.surfaces.active_state().map(SurfaceState::viewport)
    }
}
