#![forbid(unsafe_code)]

//! Virtualization primitives for long inventory lists.
//!
//! Only a bounded window of item views exists at any time, so rendering
//! cost is O(window) regardless of how many records the collection holds.
//!
//! # Core Types
//!
//! - [`OffsetIndex`] - Fenwick tree of item slot heights for O(log n)
//!   offset ↔ index queries
//! - [`VirtualizedList`] - scroll state and render-window planning
//! - [`ViewPool`] - id-keyed live views with a recycling free list
//!
//! # Windowing
//!
//! The *visible* range covers the viewport. The *target* range extends it by
//! `(window_size - 1) / 2` viewports on each side. Every [`VirtualizedList::step`]
//! drops rendered items outside the target at once, then grows toward the
//! target by at most `max_to_render_per_batch` items. When the user jumps
//! far enough that nothing rendered is visible, the window restarts at the
//! visible range.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use serde::Deserialize;
use stockview_core::RecordId;

// ---------------------------------------------------------------------------
// WindowConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for the render window.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Items rendered before the viewport is known.
    pub initial_num_to_render: usize,
    /// Most items added to the window per step. At least one.
    pub max_to_render_per_batch: usize,
    /// Retained window, in viewport heights.
    pub window_size: usize,
    /// Gap between consecutive items.
    pub item_separator: f32,
    /// Height assumed for items that were never measured.
    pub estimated_item_height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            initial_num_to_render: 10,
            max_to_render_per_batch: 5,
            window_size: 11,
            item_separator: 12.0,
            estimated_item_height: 109.0,
        }
    }
}

// ---------------------------------------------------------------------------
// OffsetIndex
// ---------------------------------------------------------------------------

/// Prefix sums over slot heights, stored as a 1-indexed Fenwick tree.
///
/// Slots hold at most `u32::MAX`, so sums stay exact in `u64` for any
/// collection that fits in memory.
#[derive(Debug, Clone, Default)]
pub struct OffsetIndex {
    tree: Vec<u64>,
    n: usize,
}

impl OffsetIndex {
    /// `n` slots of height `fill`.
    pub fn filled(n: usize, fill: u64) -> Self {
        let mut index = Self {
            tree: vec![0; n + 1],
            n,
        };
        index.rebuild(&vec![fill; n]);
        index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Height of slot `i`.
    pub fn get(&self, i: usize) -> u64 {
        self.offset_of(i + 1) - self.offset_of(i)
    }

    /// Set slot `i` to `value`. Out-of-range indices are ignored.
    pub fn set(&mut self, i: usize, value: u64) {
        if i >= self.n {
            return;
        }
        let old = self.get(i);
        let mut idx = i + 1;
        while idx <= self.n {
            // Node sums include slot `i`, so shrinking never goes below zero.
            self.tree[idx] = self.tree[idx] - old + value;
            idx += lowbit(idx);
        }
    }

    /// Sum of slots `[0, i)`, i.e. the top offset of slot `i`.
    /// `i` is clamped to `len()`.
    pub fn offset_of(&self, i: usize) -> u64 {
        let mut sum = 0u64;
        let mut idx = i.min(self.n);
        while idx > 0 {
            sum = sum.saturating_add(self.tree[idx]);
            idx -= lowbit(idx);
        }
        sum
    }

    /// Sum of all slots.
    #[inline]
    pub fn total(&self) -> u64 {
        self.offset_of(self.n)
    }

    /// Index of the slot containing `offset`, or `len()` past the end.
    pub fn index_at(&self, offset: u64) -> usize {
        let mut pos = 0usize;
        let mut remaining = offset;
        let mut mask = most_significant_bit(self.n);
        while mask > 0 {
            let next = pos + mask;
            if next <= self.n && self.tree[next] <= remaining {
                remaining -= self.tree[next];
                pos = next;
            }
            mask >>= 1;
        }
        pos
    }

    /// Resize, keeping existing slots and filling new ones with `fill`.
    pub fn resize(&mut self, new_n: usize, fill: u64) {
        if new_n == self.n {
            return;
        }
        let mut values: Vec<u64> = (0..self.n.min(new_n)).map(|i| self.get(i)).collect();
        values.resize(new_n, fill);
        self.n = new_n;
        self.tree = vec![0; new_n + 1];
        self.rebuild(&values);
    }

    fn rebuild(&mut self, values: &[u64]) {
        self.tree.fill(0);
        for (i, &v) in values.iter().enumerate() {
            self.tree[i + 1] = v;
        }
        for i in 1..=self.n {
            let parent = i + lowbit(i);
            if parent <= self.n {
                self.tree[parent] = self.tree[parent].saturating_add(self.tree[i]);
            }
        }
    }
}

#[inline]
fn lowbit(x: usize) -> usize {
    x & x.wrapping_neg()
}

#[inline]
fn most_significant_bit(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    1 << (usize::BITS - 1 - n.leading_zeros())
}

fn slot_height(item_height: f32, separator: f32) -> u64 {
    let h = item_height.max(0.0).ceil() + separator.max(0.0).ceil();
    (h as u64).min(u64::from(u32::MAX))
}

// ---------------------------------------------------------------------------
// VirtualizedList
// ---------------------------------------------------------------------------

/// Scroll state and render-window planning for a list of `len` items.
#[derive(Debug, Clone)]
pub struct VirtualizedList {
    config: WindowConfig,
    offsets: OffsetIndex,
    viewport_height: f32,
    scroll_offset: f32,
    rendered: Range<usize>,
}

impl VirtualizedList {
    /// A zero batch budget is raised to one so the window can still
    /// reach its target.
    #[must_use]
    pub fn new(mut config: WindowConfig) -> Self {
        config.max_to_render_per_batch = config.max_to_render_per_batch.max(1);
        Self {
            config,
            offsets: OffsetIndex::default(),
            viewport_height: 0.0,
            scroll_offset: 0.0,
            rendered: 0..0,
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    #[inline]
    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    #[inline]
    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    /// Items currently rendered.
    #[inline]
    pub fn rendered_range(&self) -> Range<usize> {
        self.rendered.clone()
    }

    /// Change the item count. Heights of surviving indices are kept;
    /// new items start at the estimated height.
    pub fn set_len(&mut self, len: usize) {
        let fill = slot_height(self.config.estimated_item_height, self.config.item_separator);
        self.offsets.resize(len, fill);
        self.clamp_scroll();
        self.rendered = self.rendered.start.min(len)..self.rendered.end.min(len);
        if self.rendered.is_empty() {
            let start = self.visible_range().start;
            self.rendered = start..(start + self.config.initial_num_to_render).min(len);
        }
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.viewport_height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        self.clamp_scroll();
    }

    /// Scroll by `delta` pixels. Returns the distance actually moved.
    pub fn scroll_by(&mut self, delta: f32) -> f32 {
        let before = self.scroll_offset;
        self.scroll_to(before + delta);
        self.scroll_offset - before
    }

    pub fn scroll_to(&mut self, offset: f32) {
        self.scroll_offset = if offset.is_finite() { offset } else { 0.0 };
        self.clamp_scroll();
    }

    /// Record the measured height of item `index`. Returns whether the
    /// layout changed.
    pub fn set_item_height(&mut self, index: usize, height: f32) -> bool {
        if index >= self.len() {
            return false;
        }
        let slot = slot_height(height, self.config.item_separator);
        if self.offsets.get(index) == slot {
            return false;
        }
        self.offsets.set(index, slot);
        true
    }

    /// Top offset of item `index`.
    pub fn item_offset(&self, index: usize) -> f32 {
        self.offsets.offset_of(index) as f32
    }

    /// Total scrollable height.
    pub fn content_height(&self) -> f32 {
        let total = self.offsets.total() as f32;
        if self.is_empty() {
            0.0
        } else {
            (total - self.config.item_separator.max(0.0).ceil()).max(0.0)
        }
    }

    pub fn max_scroll(&self) -> f32 {
        (self.content_height() - self.viewport_height).max(0.0)
    }

    /// Items intersecting the viewport.
    pub fn visible_range(&self) -> Range<usize> {
        self.range_between(self.scroll_offset, self.scroll_offset + self.viewport_height)
    }

    /// Items the window should converge to.
    pub fn target_range(&self) -> Range<usize> {
        let half = self.config.window_size.saturating_sub(1) as f32 / 2.0 * self.viewport_height;
        self.range_between(
            self.scroll_offset - half,
            self.scroll_offset + self.viewport_height + half,
        )
    }

    fn range_between(&self, top: f32, bottom: f32) -> Range<usize> {
        let n = self.len();
        if n == 0 {
            return 0..0;
        }
        let top = top.max(0.0) as u64;
        let bottom = (bottom.max(0.0) as u64).max(top.saturating_add(1));
        let start = self.offsets.index_at(top).min(n - 1);
        let end = (self.offsets.index_at(bottom - 1) + 1).clamp(start + 1, n);
        start..end
    }

    /// Advance the render window one step toward the target range.
    ///
    /// Without a known viewport the window is left as is.
    pub fn step(&mut self) -> Range<usize> {
        let n = self.len();
        if n == 0 {
            self.rendered = 0..0;
            return 0..0;
        }
        if self.viewport_height <= 0.0 {
            return self.rendered.clone();
        }

        let visible = self.visible_range();
        let target = self.target_range();
        let mut start = self.rendered.start.max(target.start);
        let mut end = self.rendered.end.min(target.end);

        if end <= visible.start || start >= visible.end {
            tracing::trace!(
                from_start = self.rendered.start,
                from_end = self.rendered.end,
                to_start = visible.start,
                to_end = visible.end,
                "render window jumped"
            );
            start = visible.start;
            end = visible.end;
        } else {
            start = start.min(visible.start);
            end = end.max(visible.end);
        }

        let mut budget = self.config.max_to_render_per_batch;
        let grow = target.end.saturating_sub(end).min(budget);
        end += grow;
        budget -= grow;
        let grow = start.saturating_sub(target.start).min(budget);
        start -= grow;

        self.rendered = start..end;
        self.rendered.clone()
    }

    fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.clamp(0.0, self.max_scroll());
    }
}

// ---------------------------------------------------------------------------
// ViewPool
// ---------------------------------------------------------------------------

/// A view that can be re-bound to a different record instead of rebuilt.
pub trait Recyclable {
    type Data;

    /// Reset all per-item state and bind to `data`.
    fn rebind(&mut self, data: Self::Data);
}

/// Live views keyed by record id, plus a free list of evicted views.
///
/// Keying by id means collection inserts and removals never move state
/// from one record to another.
#[derive(Debug)]
pub struct ViewPool<V> {
    live: HashMap<RecordId, V>,
    free: Vec<V>,
    allocated: usize,
}

impl<V> Default for ViewPool<V> {
    fn default() -> Self {
        Self {
            live: HashMap::new(),
            free: Vec::new(),
            allocated: 0,
        }
    }
}

impl<V: Recyclable> ViewPool<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live view for `id`, binding one if needed.
    ///
    /// `data` is only called when a view has to be bound. A pooled view is
    /// reused before `make` constructs a new one.
    pub fn acquire(
        &mut self,
        id: RecordId,
        data: impl FnOnce() -> V::Data,
        make: impl FnOnce(V::Data) -> V,
    ) -> &mut V {
        match self.live.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let data = data();
                let view = match self.free.pop() {
                    Some(mut view) => {
                        view.rebind(data);
                        view
                    }
                    None => {
                        self.allocated += 1;
                        make(data)
                    }
                };
                entry.insert(view)
            }
        }
    }

    /// Move every live view not in `keep` to the free list. Returns the
    /// evicted ids.
    pub fn release_except(&mut self, keep: &HashSet<RecordId>) -> Vec<RecordId> {
        let evicted: Vec<RecordId> = self
            .live
            .keys()
            .filter(|id| !keep.contains(*id))
            .cloned()
            .collect();
        for id in &evicted {
            if let Some(view) = self.live.remove(id) {
                self.free.push(view);
            }
        }
        evicted
    }

    /// Release everything.
    pub fn clear(&mut self) {
        self.free.extend(self.live.drain().map(|(_, view)| view));
    }

    pub fn get(&self, id: &RecordId) -> Option<&V> {
        self.live.get(id)
    }

    pub fn get_mut(&mut self, id: &RecordId) -> Option<&mut V> {
        self.live.get_mut(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.live.contains_key(id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&RecordId, &mut V)> {
        self.live.iter_mut()
    }

    /// Views currently bound.
    #[inline]
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Views waiting for reuse.
    #[inline]
    pub fn pooled(&self) -> usize {
        self.free.len()
    }

    /// Views ever constructed.
    #[inline]
    pub fn allocated(&self) -> usize {
        self.allocated
    }
}
