// clip.rs — per-surface scissor stack and the scope guard that keeps it
// balanced.
//
// `ClipStack` is a pure state machine: each transition reports the scissor
// change the GPU needs, and `Batcher` flushes pending geometry before applying
// it. An entry is pushed for every push, even a degenerate one, so pops always
// pair up; degenerate entries keep the last valid scissor on the GPU and make
// `is_empty_clip()` true so callers skip the subtree.

use std::ops::{Deref, DerefMut};

use crate::batcher::Batcher;
use crate::device::GpuDevice;
use crate::geometry::{IRect, Rect};
use crate::surface::SurfaceId;

/// What a stack transition requires of the GPU scissor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipChange {
    Unchanged,
    Apply(IRect),
    Disable,
}

#[derive(Clone, Copy, Debug)]
struct ClipEntry {
    /// Requested clip after intersection; may have zero area.
    rect: IRect,
    /// Scissor in effect while this entry is on top.
    applied: Option<IRect>,
}

#[derive(Clone, Debug, Default)]
pub struct ClipStack {
    entries: Vec<ClipEntry>,
    /// Scissor currently on the GPU; `None` = scissor test off.
    recent: Option<IRect>,
}

impl ClipStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn recent(&self) -> Option<IRect> {
        self.recent
    }

    pub fn top(&self) -> Option<IRect> {
        self.entries.last().map(|e| e.rect)
    }

    /// True when the innermost clip has no area.
    pub fn is_empty_clip(&self) -> bool {
        self.entries.last().is_some_and(|e| !e.rect.has_area())
    }

    /// Push `rect`. With `combine` it is intersected with the current top, or
    /// with `viewport` when the stack is empty.
    pub fn push(&mut self, rect: Rect, combine: bool, viewport: Rect) -> ClipChange {
        let requested = if combine {
            match self.entries.last() {
                Some(top) => rect.intersect(&top.rect.to_rect()),
                None => rect.intersect(&viewport),
            }
        } else {
            rect
        };
        let scissor = IRect::from_rect(&requested);
        let applied = if scissor.has_area() {
            Some(scissor)
        } else {
            self.recent
        };
        self.entries.push(ClipEntry {
            rect: scissor,
            applied,
        });
        self.transition(applied)
    }

    /// Replace the top entry without intersecting. `None` if the stack is
    /// empty.
    pub fn set(&mut self, rect: Rect) -> Option<ClipChange> {
        let n = self.entries.len();
        if n == 0 {
            return None;
        }
        let below = if n >= 2 { self.entries[n - 2].applied } else { None };
        let scissor = IRect::from_rect(&rect);
        let applied = if scissor.has_area() { Some(scissor) } else { below };
        self.entries[n - 1] = ClipEntry {
            rect: scissor,
            applied,
        };
        Some(self.transition(applied))
    }

    /// Drop the top entry and fall back to the one below. `None` on underflow.
    pub fn pop(&mut self) -> Option<ClipChange> {
        self.entries.pop()?;
        let applied = self.entries.last().and_then(|e| e.applied);
        Some(self.transition(applied))
    }

    /// Clear everything; returns how many entries were left over.
    pub fn reset(&mut self) -> usize {
        let leaked = self.entries.len();
        self.entries.clear();
        self.recent = None;
        leaked
    }

    fn transition(&mut self, applied: Option<IRect>) -> ClipChange {
        if applied == self.recent {
            return ClipChange::Unchanged;
        }
        self.recent = applied;
        match applied {
            Some(r) => ClipChange::Apply(r),
            None => ClipChange::Disable,
        }
    }
}

// ── Batcher integration ───────────────────────────────────────────────────────

impl<D: GpuDevice> Batcher<D> {
    fn apply_clip_change(&mut self, change: ClipChange) {
        let scissor = match change {
            ClipChange::Unchanged => return,
            ClipChange::Apply(r) => Some(r),
            ClipChange::Disable => None,
        };
        // Pending geometry belongs to the old scissor.
        self.flush();
        self.device.set_scissor(scissor);
        self.stats.clip_changes += 1;
    }

    pub fn push_clip(&mut self, rect: Rect, combine: bool) {
        let Some(state) = self.surfaces.active_state_mut() else {
            tracing::warn!("push_clip with no bound surface — ignored");
            return;
        };
        let viewport = state.viewport();
        let change = state.clip.push(rect, combine, viewport);
        self.apply_clip_change(change);
    }

    pub fn set_clip(&mut self, rect: Rect) {
        let Some(state) = self.surfaces.active_state_mut() else {
            tracing::warn!("set_clip with no bound surface — ignored");
            return;
        };
        match state.clip.set(rect) {
            Some(change) => self.apply_clip_change(change),
            None => tracing::warn!("set_clip on an empty clip stack — ignored"),
        }
    }

    pub fn pop_clip(&mut self) {
        if let Some(surface) = self.surfaces.active() {
            self.pop_clip_on(surface);
        }
    }

    /// Pop `surface`'s stack. The GPU is only touched when `surface` is the
    /// bound target; otherwise the next `bind_context` re-applies its scissor.
    fn pop_clip_on(&mut self, surface: SurfaceId) {
        let is_active = self.surfaces.active() == Some(surface);
        let Some(state) = self.surfaces.get_mut(surface) else {
            return;
        };
        match state.clip.pop() {
            None => tracing::warn!("clip stack underflow on {surface:?}"),
            Some(change) if is_active => self.apply_clip_change(change),
            Some(_) => {}
        }
    }

    /// Clear the bound surface's stack at frame start. Leftover entries mean
    /// some painter pushed without popping last frame.
    pub fn reset_clip(&mut self) {
        let Some(state) = self.surfaces.active_state_mut() else {
            return;
        };
        let leaked = state.clip.reset();
        if leaked > 0 {
            tracing::warn!("clip stack held {leaked} entries at frame start — push/pop mismatch");
        }
        self.flush();
        self.device.set_scissor(None);
    }

    pub fn is_empty_clip(&self) -> bool {
        self.surfaces
            .active_state()
            .is_some_and(|s| s.clip.is_empty_clip())
    }

    /// Whether any of `rect` survives the current clip.
    pub fn is_on_screen(&self, rect: Rect) -> bool {
        let Some(state) = self.surfaces.active_state() else {
            return false;
        };
        if state.clip.is_empty_clip() {
            return false;
        }
        let visible = state
            .clip
            .recent()
            .map(IRect::to_rect)
            .unwrap_or_else(|| state.viewport());
        rect.intersects(&visible)
    }

    pub fn current_clip(&self) -> Option<IRect> {
        self.surfaces.active_state().and_then(|s| s.clip.recent())
    }

    pub fn clip_depth(&self) -> usize {
        self.surfaces.active_state().map_or(0, |s| s.clip.depth())
    }

    /// Push `rect` intersected with the current clip for the lifetime of the
    /// returned scope.
    pub fn clip(&mut self, rect: Rect) -> ClipScope<'_, D> {
        self.clip_with(rect, true)
    }

    pub fn clip_with(&mut self, rect: Rect, combine: bool) -> ClipScope<'_, D> {
        let surface = self.surfaces.active();
        self.push_clip(rect, combine);
        ClipScope {
            batcher: self,
            surface,
        }
    }
}

// ── ClipScope ─────────────────────────────────────────────────────────────────

/// Pops its clip exactly once when dropped, including during unwinding and
/// early returns. Derefs to the batcher so painting happens through it.
pub struct ClipScope<'a, D: GpuDevice> {
    batcher: &'a mut Batcher<D>,
    surface: Option<SurfaceId>,
}

impl<D: GpuDevice> Deref for ClipScope<'_, D> {
    type Target = Batcher<D>;

    fn deref(&self) -> &Batcher<D> {
        self.batcher
    }
}

impl<D: GpuDevice> DerefMut for ClipScope<'_, D> {
    fn deref_mut(&mut self) -> &mut Batcher<D> {
        self.batcher
    }
}

impl<D: GpuDevice> Drop for ClipScope<'_, D> {
    fn drop(&mut self) {
        if let Some(surface) = self.surface {
            self.batcher.pop_clip_on(surface);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcher::testing::*;
    use crate::geometry::Color;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    const VIEWPORT: Rect = Rect::new(0., 0., 800., 600.);

    #[test]
    fn nested_push_intersects_and_pop_restores() {
        let mut s = ClipStack::new();
        assert_eq!(
            s.push(Rect::new(0., 0., 100., 100.), true, VIEWPORT),
            ClipChange::Apply(IRect::new(0, 0, 100, 100))
        );
        assert_eq!(
            s.push(Rect::new(50., 50., 100., 100.), true, VIEWPORT),
            ClipChange::Apply(IRect::new(50, 50, 50, 50))
        );
        assert_eq!(s.pop(), Some(ClipChange::Apply(IRect::new(0, 0, 100, 100))));
        assert_eq!(s.pop(), Some(ClipChange::Disable));
        assert_eq!(s.recent(), None);
        assert_eq!(s.pop(), None);
    }

    #[test]
    fn uncombined_push_ignores_parent() {
        let mut s = ClipStack::new();
        s.push(Rect::new(0., 0., 10., 10.), true, VIEWPORT);
        s.push(Rect::new(100., 100., 20., 20.), false, VIEWPORT);
        assert_eq!(s.recent(), Some(IRect::new(100, 100, 20, 20)));
    }

    #[test]
    fn degenerate_push_keeps_recent_and_depth() {
        let mut s = ClipStack::new();
        s.push(Rect::new(0., 0., 100., 100.), true, VIEWPORT);
        let change = s.push(Rect::new(200., 200., 50., 50.), true, VIEWPORT);
        assert_eq!(change, ClipChange::Unchanged);
        assert_eq!(s.recent(), Some(IRect::new(0, 0, 100, 100)));
        assert!(s.is_empty_clip());
        assert_eq!(s.depth(), 2);

        // A child of an invisible node stays invisible.
        s.push(Rect::new(0., 0., 800., 600.), true, VIEWPORT);
        assert!(s.is_empty_clip());
        assert_eq!(s.depth(), 3);

        s.pop();
        s.pop();
        assert!(!s.is_empty_clip());
        assert_eq!(s.recent(), Some(IRect::new(0, 0, 100, 100)));
    }

    #[test]
    fn first_push_outside_viewport_keeps_scissor_off() {
        let mut s = ClipStack::new();
        assert_eq!(
            s.push(Rect::new(900., 0., 10., 10.), true, VIEWPORT),
            ClipChange::Unchanged
        );
        assert!(s.is_empty_clip());
        assert_eq!(s.pop(), Some(ClipChange::Unchanged));
    }

    #[test]
    fn set_replaces_top() {
        let mut s = ClipStack::new();
        assert_eq!(s.set(Rect::new(0., 0., 5., 5.)), None);
        s.push(Rect::new(0., 0., 100., 100.), true, VIEWPORT);
        s.push(Rect::new(10., 10., 10., 10.), true, VIEWPORT);
        assert_eq!(
            s.set(Rect::new(300., 300., 40., 40.)),
            Some(ClipChange::Apply(IRect::new(300, 300, 40, 40)))
        );
        assert_eq!(s.depth(), 2);
        assert_eq!(s.pop(), Some(ClipChange::Apply(IRect::new(0, 0, 100, 100))));
    }

    #[test]
    fn batcher_scenario_applies_scissors() {
        let mut b = batcher();
        b.push_clip(Rect::new(0., 0., 100., 100.), true);
        b.push_clip(Rect::new(50., 50., 100., 100.), true);
        assert_eq!(b.current_clip(), Some(IRect::new(50, 50, 50, 50)));
        b.pop_clip();
        assert_eq!(b.device().scissor(), Some(IRect::new(0, 0, 100, 100)));
        b.pop_clip();
        assert_eq!(b.device().scissor(), None);
        assert_eq!(
            b.device().scissor_changes(),
            vec![
                Some(IRect::new(0, 0, 100, 100)),
                Some(IRect::new(50, 50, 50, 50)),
                Some(IRect::new(0, 0, 100, 100)),
                None,
            ]
        );
        assert_eq!(b.stats().clip_changes, 4);
    }

    #[test]
    fn clip_change_flushes_pending_geometry_first() {
        let mut b = batcher();
        b.add_rectangle(Rect::new(0., 0., 10., 10.), Color::RED);
        b.push_clip(Rect::new(0., 0., 5., 5.), true);
        b.add_rectangle(Rect::new(0., 0., 10., 10.), Color::RED);
        b.pop_clip();
        let draws = &b.device().draws;
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].scissor, None);
        assert_eq!(draws[1].scissor, Some(IRect::new(0, 0, 5, 5)));
    }

    #[test]
    fn degenerate_clip_does_not_touch_gpu() {
        let mut b = batcher();
        b.push_clip(Rect::new(0., 0., 100., 100.), true);
        let changes = b.device().scissor_changes().len();
        b.push_clip(Rect::new(500., 500., 10., 10.), true);
        assert!(b.is_empty_clip());
        assert!(!b.is_on_screen(Rect::new(0., 0., 10., 10.)));
        assert_eq!(b.device().scissor_changes().len(), changes);
        assert_eq!(b.clip_depth(), 2);
        b.pop_clip();
        assert!(!b.is_empty_clip());
        assert!(b.is_on_screen(Rect::new(90., 90., 50., 50.)));
        assert!(!b.is_on_screen(Rect::new(200., 0., 10., 10.)));
    }

    #[test]
    fn scopes_unwind_in_lifo_order() {
        let mut b = batcher();
        {
            let mut outer = b.clip(Rect::new(0., 0., 100., 100.));
            {
                let inner = outer.clip(Rect::new(50., 50., 100., 100.));
                assert_eq!(inner.clip_depth(), 2);
                assert_eq!(inner.current_clip(), Some(IRect::new(50, 50, 50, 50)));
            }
            assert_eq!(outer.clip_depth(), 1);
            assert_eq!(outer.current_clip(), Some(IRect::new(0, 0, 100, 100)));
        }
        assert_eq!(b.clip_depth(), 0);
        assert_eq!(b.device().scissor(), None);
    }

    fn paint_failing(b: &mut Batcher<crate::recorder::RecordingDevice>, depth: usize) -> Result<(), String> {
        let mut scope = b.clip(Rect::new(depth as f32, depth as f32, 100., 100.));
        scope.add_rectangle(Rect::new(0., 0., 10., 10.), Color::RED);
        if depth == 3 {
            return Err("boom".into());
        }
        paint_failing(&mut scope, depth + 1)
    }

    #[test]
    fn scopes_balance_on_error_return() {
        let mut b = batcher();
        b.push_clip(Rect::new(0., 0., 400., 400.), true);
        assert!(paint_failing(&mut b, 0).is_err());
        assert_eq!(b.clip_depth(), 1);
        assert_eq!(b.current_clip(), Some(IRect::new(0, 0, 400, 400)));
    }

    #[test]
    fn scopes_balance_on_panic() {
        let mut b = batcher();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut outer = b.clip(Rect::new(0., 0., 100., 100.));
            let _inner = outer.clip(Rect::new(10., 10., 20., 20.));
            panic!("widget paint failed");
        }));
        assert!(result.is_err());
        assert_eq!(b.clip_depth(), 0);
        assert_eq!(b.device().scissor(), None);
    }

    #[test]
    fn reset_clears_leaked_entries() {
        let mut b = batcher();
        b.push_clip(Rect::new(0., 0., 100., 100.), true);
        b.push_clip(Rect::new(0., 0., 50., 50.), true);
        b.begin_frame();
        assert_eq!(b.clip_depth(), 0);
        assert_eq!(b.device().scissor(), None);
        assert!(!b.is_empty_clip());
    }

    #[test]
    fn scope_pops_its_own_surface() {
        let mut b = batcher();
        let other = SurfaceId(9);
        {
            let mut scope = b.clip(Rect::new(0., 0., 100., 100.));
            scope.bind_context(other, 100, 100);
        }
        assert_eq!(b.clip_depth(), 0);
        b.bind_context(SURFACE, 800, 600);
        assert_eq!(b.clip_depth(), 0);
        assert_eq!(b.device().scissor(), None);
    }
}
