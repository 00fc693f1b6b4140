// tree.rs — the paint traversal boundary. Each node paints inside a clip
// scope for its bounds; a node whose clip is empty is skipped with its whole
// subtree, and a node that fails is logged and treated as having painted
// nothing while its siblings carry on.

use std::error::Error;

use crate::batcher::Batcher;
use crate::device::GpuDevice;
use crate::geometry::Rect;

pub type PaintResult = Result<(), Box<dyn Error + Send + Sync>>;

pub trait PaintNode<D: GpuDevice> {
    /// Surface-space rect the node (and its children) are clipped to.
    fn bounds(&self) -> Rect;

    fn paint(&self, batcher: &mut Batcher<D>) -> PaintResult;

    fn children(&self) -> &[Box<dyn PaintNode<D>>] {
        &[]
    }

    /// Used in failure logs.
    fn name(&self) -> &str {
        "node"
    }
}

/// What happened during one `paint_frame`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaintSummary {
    pub painted: u32,
    /// Nodes skipped because their clip was empty (subtrees not counted).
    pub culled: u32,
    pub failed: u32,
}

/// Paint one frame of `root` onto the bound surface: reset the clip stack,
/// walk the tree depth-first, then drain the last batch.
pub fn paint_frame<D: GpuDevice>(batcher: &mut Batcher<D>, root: &dyn PaintNode<D>) -> PaintSummary {
    batcher.begin_frame();
    let mut summary = PaintSummary::default();
    paint_node(batcher, root, &mut summary);
    batcher.end_frame();
    tracing::debug!(
        "frame: {} painted, {} culled, {} failed, {:?}",
        summary.painted,
        summary.culled,
        summary.failed,
        batcher.stats()
    );
    summary
}

fn paint_node<D: GpuDevice>(batcher: &mut Batcher<D>, node: &dyn PaintNode<D>, summary: &mut PaintSummary) {
    let mut scope = batcher.clip(node.bounds());
    if scope.is_empty_clip() {
        summary.culled += 1;
        return;
    }
    match node.paint(&mut *scope) {
        Ok(()) => summary.painted += 1,
        Err(e) => {
            summary.failed += 1;
            tracing::warn!("paint failed for {}: {e}", node.name());
        }
    }
    for child in node.children() {
        paint_node(&mut *scope, child.as_ref(), summary);
    }
}
