// buffer.rs — fixed-capacity CPU staging arrays for vertices and indices.
//
// The pool never grows. Callers ask `fits()` with a primitive's worst-case
// consumption before writing a single vertex, and flush when it says no, so a
// primitive is never split across two draw calls.

use crate::vertex::Vertex;

pub const MIN_VERTEX_CAPACITY: usize = 4;
pub const MIN_INDEX_CAPACITY: usize = 6;

pub struct BufferPool {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    vertex_capacity: usize,
    index_capacity: usize,
}

impl BufferPool {
    pub fn new(vertex_capacity: usize, index_capacity: usize) -> Self {
        let vertex_capacity = vertex_capacity.max(MIN_VERTEX_CAPACITY);
        let index_capacity = index_capacity.max(MIN_INDEX_CAPACITY);
        Self {
            vertices: Vec::with_capacity(vertex_capacity),
            indices: Vec::with_capacity(index_capacity),
            vertex_capacity,
            index_capacity,
        }
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertex_capacity
    }

    pub fn index_capacity(&self) -> usize {
        self.index_capacity
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    /// Room for `v` more vertices and `i` more indices right now.
    pub fn fits(&self, v: usize, i: usize) -> bool {
        self.vertices.len() + v <= self.vertex_capacity
            && self.indices.len() + i <= self.index_capacity
    }

    /// Whether a primitive of this size fits an empty pool at all.
    pub fn can_ever_fit(&self, v: usize, i: usize) -> bool {
        v <= self.vertex_capacity && i <= self.index_capacity
    }

    /// Global index of the next vertex written.
    pub fn base(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Append a vertex and return its global index.
    pub fn push_vertex(&mut self, v: Vertex) -> u32 {
        debug_assert!(self.vertices.len() < self.vertex_capacity, "vertex pool overrun");
        let idx = self.vertices.len() as u32;
        self.vertices.push(v);
        idx
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        debug_assert!(self.indices.len() + 3 <= self.index_capacity, "index pool overrun");
        self.indices.extend_from_slice(&[a, b, c]);
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Zero both cursors. Capacity is kept.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }
}
