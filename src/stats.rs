//! Opt-in, zero-cost-when-unused per-draw counters (§3.1 ambient expansion).
//!
//! `RenderStats` is updated from inside the rasterizer the same way the teacher sprinkles
//! `log::trace!` call sites through its hot path: the counters below are bumped at exactly the
//! same spots a `trace!` would fire, just into a `Cell<u64>` instead of a log sink, so tests can
//! assert exact coverage counts without re-deriving them from pixel contents.

use core::cell::Cell;

/// Per-draw counters, reset by [`crate::framebuffer::FrameBuffer::begin_draw`]. Reading a counter
/// never costs more than the `Cell` load; a caller that never looks at `RenderStats` pays nothing
/// beyond the handful of `fetch_add`-style increments already inlined into the rasterizer.
#[derive(Default, Debug)]
pub struct RenderStats {
    primitives_submitted: Cell<u64>,
    primitives_clipped: Cell<u64>,
    primitives_culled: Cell<u64>,
    primitives_rasterized: Cell<u64>,
    fragments_shaded: Cell<u64>,
    samples_covered: Cell<u64>,
}

impl RenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.primitives_submitted.set(0);
        self.primitives_clipped.set(0);
        self.primitives_culled.set(0);
        self.primitives_rasterized.set(0);
        self.fragments_shaded.set(0);
        self.samples_covered.set(0);
    }

    pub fn primitives_submitted(&self) -> u64 {
        self.primitives_submitted.get()
    }
    pub fn primitives_clipped(&self) -> u64 {
        self.primitives_clipped.get()
    }
    pub fn primitives_culled(&self) -> u64 {
        self.primitives_culled.get()
    }
    pub fn primitives_rasterized(&self) -> u64 {
        self.primitives_rasterized.get()
    }
    pub fn fragments_shaded(&self) -> u64 {
        self.fragments_shaded.get()
    }
    pub fn samples_covered(&self) -> u64 {
        self.samples_covered.get()
    }

    pub(crate) fn inc_submitted(&self) {
        self.primitives_submitted.set(self.primitives_submitted.get() + 1);
    }
    pub(crate) fn inc_clipped(&self) {
        self.primitives_clipped.set(self.primitives_clipped.get() + 1);
    }
    pub(crate) fn inc_culled(&self) {
        self.primitives_culled.set(self.primitives_culled.get() + 1);
    }
    pub(crate) fn inc_rasterized(&self) {
        self.primitives_rasterized.set(self.primitives_rasterized.get() + 1);
    }
    pub(crate) fn inc_fragments_shaded(&self) {
        self.fragments_shaded.set(self.fragments_shaded.get() + 1);
    }
    pub(crate) fn add_samples_covered(&self, n: u64) {
        self.samples_covered.set(self.samples_covered.get() + n);
    }
}
