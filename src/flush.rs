// flush.rs — drains the staging pool to the GPU in exactly one draw call and
// keeps the per-frame diagnostic counters.

use crate::batcher::Batcher;
use crate::device::GpuDevice;

/// Per-frame counters, reset by `begin_frame`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// GPU draw calls issued.
    pub draw_calls: u32,
    /// `flush()` invocations, including ones with nothing pending.
    pub flushes: u32,
    /// Scissor changes pushed to the GPU.
    pub clip_changes: u32,
    pub vertices: u32,
    pub indices: u32,
}

impl<D: GpuDevice> Batcher<D> {
    /// Upload everything staged since the last flush and draw it. Issues no
    /// GPU calls when nothing is pending.
    pub fn flush(&mut self) {
        self.stats.flushes += 1;
        if self.pool.is_empty() {
            return;
        }
        let Some(surface) = self.surfaces.active_state() else {
            tracing::warn!(
                "flush with no bound surface — dropping {} vertices",
                self.pool.vertex_count()
            );
            self.pool.clear();
            return;
        };
        let vao = surface.vao;
        let projection = surface.projection;

        let device = &mut self.device;
        device.use_program();
        device.set_projection(&projection);
        device.set_gamma(self.config.gamma);
        device.bind_texture(self.key.texture);
        device.bind_vertex_array(vao);
        device.upload_vertices(self.pool.vertices());
        let (vertex_count, index_count) = (self.pool.vertex_count(), self.pool.index_count());
        if index_count > 0 {
            device.upload_indices(self.pool.indices());
            device.draw_elements(index_count);
        } else {
            device.draw_arrays(self.key.topology, vertex_count);
        }

        self.stats.draw_calls += 1;
        self.stats.vertices += vertex_count as u32;
        self.stats.indices += index_count as u32;
        tracing::trace!(
            "flush: {vertex_count} vertices, {index_count} indices, {:?}",
            self.key
        );
        self.pool.clear();
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Start a frame on the bound surface: zero the counters, clear any clip
    /// scopes a previous frame leaked, disable scissoring.
    pub fn begin_frame(&mut self) {
        self.reset_clip();
        self.stats = FrameStats::default();
    }

    /// Final flush after the whole tree has painted.
    pub fn end_frame(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use crate::batcher::testing::*;
    use crate::device::TextureId;
    use crate::geometry::{Color, Rect};
    use crate::recorder::GpuCall;
    use crate::vertex::Topology;

    #[test]
    fn two_rectangles_one_draw() {
        let mut b = batcher();
        b.add_rectangle(Rect::new(0., 0., 10., 10.), Color::RED);
        b.add_rectangle(Rect::new(20., 0., 10., 10.), Color::RED);
        b.flush();

        let dev = b.device();
        assert_eq!(dev.draw_calls(), 1);
        let draw = &dev.draws[0];
        assert_eq!(draw.vertices.len(), 8);
        assert_eq!(draw.indices.len(), 12);
        assert!(draw.vertices.iter().all(|v| v.kind == 0.0));
        assert!(draw.vertices.iter().all(|v| v.color == Color::RED.to_array()));
        assert_eq!(draw.indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
        assert_eq!(draw.vertices[4].position, [20., 0.]);
        assert_eq!(b.pending_vertices(), 0);
        assert_eq!(b.stats().draw_calls, 1);
    }

    #[test]
    fn empty_flush_touches_nothing() {
        let mut b = batcher();
        // Binding the surface already flushed once; count this frame only.
        b.begin_frame();
        b.device_mut().clear_log();
        b.flush();
        b.flush();
        assert!(b.device().calls.is_empty());
        assert_eq!(b.stats().flushes, 2);
        assert_eq!(b.stats().draw_calls, 0);
    }

    #[test]
    fn texture_change_splits_batches_in_order() {
        let mut b = batcher();
        let dest = Rect::new(0., 0., 10., 10.);
        let uv = Rect::new(0., 0., 1., 1.);
        b.add_image(TextureId(100), dest, uv, Color::WHITE);
        b.add_image(TextureId(200), Rect::new(50., 0., 10., 10.), uv, Color::WHITE);
        b.flush();

        let dev = b.device();
        assert_eq!(dev.draw_calls(), 2);
        assert_eq!(dev.draws[0].texture, Some(TextureId(100)));
        assert_eq!(dev.draws[0].vertices.len(), 4);
        assert_eq!(dev.draws[0].vertices[0].position, [0., 0.]);
        assert_eq!(dev.draws[1].texture, Some(TextureId(200)));
        assert_eq!(dev.draws[1].vertices[0].position, [50., 0.]);
        // Indices restart at zero after each flush.
        assert_eq!(dev.draws[1].indices[0], 0);
    }

    #[test]
    fn capacity_overflow_flushes_before_writing() {
        let mut b = batcher_with(10, 100);
        b.add_rectangle(Rect::new(0., 0., 1., 1.), Color::RED);
        b.add_rectangle(Rect::new(1., 0., 1., 1.), Color::RED);
        assert_eq!(b.device().draw_calls(), 0);
        assert_eq!(b.pending_vertices(), 8);
        // The third quad would need 12 > 10 vertices.
        b.add_rectangle(Rect::new(2., 0., 1., 1.), Color::RED);
        assert_eq!(b.device().draw_calls(), 1);
        assert_eq!(b.device().draws[0].vertices.len(), 8);
        assert_eq!(b.pending_vertices(), 4);
        assert_eq!(b.pool.vertices()[0].position, [2., 0.]);
    }

    #[test]
    fn capacity_never_exceeded_over_many_adds() {
        let mut b = batcher_with(64, 90);
        for i in 0..500 {
            let x = (i % 40) as f32 * 5.;
            b.add_rectangle(Rect::new(x, 0., 4., 4.), Color::RED);
            b.add_triangle([x, 10.], [x + 4., 10.], [x, 14.], Color::BLUE);
            assert!(b.pending_vertices() <= 64);
            assert!(b.pending_indices() <= 90);
        }
        b.flush();
        for draw in &b.device().draws {
            assert!(draw.vertices.len() <= 64);
            assert!(draw.indices.len() <= 90);
            let max = *draw.indices.iter().max().unwrap() as usize;
            assert!(max < draw.vertices.len());
        }
        let total: usize = b.device().draws.iter().map(|d| d.vertices.len()).sum();
        assert_eq!(total, 500 * 7);
    }

    #[test]
    fn lines_draw_non_indexed() {
        let mut b = batcher();
        b.add_hairline(0., 0., 10., 0., Color::RED);
        b.add_hairline(0., 5., 10., 5., Color::RED);
        b.flush();
        let dev = b.device();
        assert!(dev.calls.contains(&GpuCall::DrawArrays(Topology::Lines, 4)));
        assert!(!dev.calls.iter().any(|c| matches!(c, GpuCall::UploadIndices(_))));
        assert_eq!(dev.draws[0].texture, None);
    }

    #[test]
    fn flush_binds_state_in_order() {
        let mut b = batcher();
        b.add_rectangle(Rect::new(0., 0., 10., 10.), Color::RED);
        b.flush();
        let white = b.white_texture();
        let calls = &b.device().calls;
        assert_eq!(calls[0], GpuCall::UseProgram);
        assert!(matches!(calls[1], GpuCall::SetGamma(_)));
        assert_eq!(calls[2], GpuCall::BindTexture(Some(white)));
        assert!(matches!(calls[3], GpuCall::BindVertexArray(_)));
        assert_eq!(calls[4], GpuCall::UploadVertices(4));
        assert_eq!(calls[5], GpuCall::UploadIndices(6));
        assert_eq!(calls[6], GpuCall::DrawElements(6));
    }

    #[test]
    fn begin_frame_resets_stats() {
        let mut b = batcher();
        b.add_rectangle(Rect::new(0., 0., 10., 10.), Color::RED);
        b.end_frame();
        assert_eq!(b.stats().draw_calls, 1);
        b.begin_frame();
        assert_eq!(*b.stats(), crate::flush::FrameStats::default());
    }
}
