//! Layout height oracle for the category block.
//!
//! The category chips are laid out once, at zero visible height, so the
//! expansion machine can animate toward a concrete target. [`ChipFlowLayout`]
//! computes that natural height from chip metrics; [`MeasureCache`] memoizes
//! it per (content, width) so re-rendering a card does not re-measure.
//!
//! # Invalidation
//!
//! None needed. Cache keys are content-addressed: the key hashes the record
//! id together with its categories, and the available width is part of the
//! key, so a resize or an edited record simply misses. Chip metrics are
//! fixed for the life of a [`HeightOracle`].
//!
//! # Eviction
//!
//! LFU when at capacity.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::Deserialize;
use stockview_core::RecordId;
use unicode_width::UnicodeWidthStr;

// ---------------------------------------------------------------------------
// Chip flow layout
// ---------------------------------------------------------------------------

/// Sizing of one category chip and the gaps between chips.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChipMetrics {
    pub column_gap: f32,
    pub row_gap: f32,
    pub padding_x: f32,
    pub padding_y: f32,
    pub line_height: f32,
    /// Advance of one text column.
    pub glyph_width: f32,
}

impl Default for ChipMetrics {
    fn default() -> Self {
        Self {
            column_gap: 6.0,
            row_gap: 4.0,
            padding_x: 12.0,
            padding_y: 2.0,
            line_height: 22.0,
            glyph_width: 7.0,
        }
    }
}

impl ChipMetrics {
    /// Height of a single chip row.
    #[inline]
    pub fn chip_height(&self) -> f32 {
        self.line_height + 2.0 * self.padding_y
    }

    /// Width of the chip for `label`.
    pub fn chip_width(&self, label: &str) -> f32 {
        label.width() as f32 * self.glyph_width + 2.0 * self.padding_x
    }
}

/// Computes the natural height of a category block at a given width.
pub trait CategoryMeasure {
    fn measure(&self, categories: &[String], available_width: f32) -> f32;
}

/// Wrapping row layout: chips are placed left to right and wrap to a new
/// row when the next one would overflow. A chip wider than the block gets a
/// row of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChipFlowLayout {
    metrics: ChipMetrics,
}

impl ChipFlowLayout {
    pub fn new(metrics: ChipMetrics) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &ChipMetrics {
        &self.metrics
    }

    /// Number of rows the chips occupy.
    pub fn rows(&self, categories: &[String], available_width: f32) -> usize {
        let mut rows = 0;
        let mut cursor = 0.0f32;
        for label in categories {
            let width = self.metrics.chip_width(label);
            if rows == 0 {
                rows = 1;
                cursor = width;
                continue;
            }
            let next = cursor + self.metrics.column_gap + width;
            if next <= available_width {
                cursor = next;
            } else {
                rows += 1;
                cursor = width;
            }
        }
        rows
    }
}

impl CategoryMeasure for ChipFlowLayout {
    fn measure(&self, categories: &[String], available_width: f32) -> f32 {
        let rows = self.rows(categories, available_width);
        if rows == 0 {
            return 0.0;
        }
        let rows = rows as f32;
        rows * self.metrics.chip_height() + (rows - 1.0) * self.metrics.row_gap
    }
}

// ---------------------------------------------------------------------------
// Measure cache
// ---------------------------------------------------------------------------

/// Content-addressed identity of one category block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BlockId(pub u64);

impl BlockId {
    /// Hash the record id together with its categories.
    pub fn of(id: &RecordId, categories: &[String]) -> Self {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        categories.hash(&mut hasher);
        Self(hasher.finish())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct CacheKey {
    block: BlockId,
    width_bits: u32,
}

#[derive(Clone, Debug)]
struct CacheEntry {
    height: f32,
    access_count: u32,
}

/// Statistics about cache performance.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Hit rate as a fraction (0.0 to 1.0).
    pub hit_rate: f64,
}

/// Memoized category block heights, bounded by LFU eviction.
#[derive(Debug)]
pub struct MeasureCache {
    entries: HashMap<CacheKey, CacheEntry>,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

impl MeasureCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(max_entries.min(1024)),
            max_entries: max_entries.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Cached height for `block` at `width`, computing it on a miss.
    pub fn get_or_compute<F>(&mut self, block: BlockId, width: f32, compute: F) -> f32
    where
        F: FnOnce() -> f32,
    {
        let key = CacheKey {
            block,
            width_bits: width.to_bits(),
        };

        if let Some(entry) = self.entries.get_mut(&key) {
            self.hits += 1;
            entry.access_count = entry.access_count.saturating_add(1);
            return entry.height;
        }

        self.misses += 1;
        let height = compute();

        if self.entries.len() >= self.max_entries {
            self.evict_lfu();
        }
        self.entries.insert(
            key,
            CacheEntry {
                height,
                access_count: 1,
            },
        );
        height
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_lfu(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.access_count)
            .map(|(k, _)| *k)
        {
            self.entries.remove(&key);
        }
    }
}

impl Default for MeasureCache {
    fn default() -> Self {
        Self::new(256)
    }
}

// ---------------------------------------------------------------------------
// Height oracle
// ---------------------------------------------------------------------------

/// Measures category blocks through a [`CategoryMeasure`] with memoization.
#[derive(Debug)]
pub struct HeightOracle<L = ChipFlowLayout> {
    layout: L,
    cache: MeasureCache,
}

impl<L: CategoryMeasure> HeightOracle<L> {
    pub fn new(layout: L) -> Self {
        Self {
            layout,
            cache: MeasureCache::default(),
        }
    }

    /// Like [`new`](Self::new) with a cache bounded to `max_entries`.
    pub fn with_capacity(layout: L, max_entries: usize) -> Self {
        Self {
            layout,
            cache: MeasureCache::new(max_entries),
        }
    }

    /// Natural height of `categories` at `available_width`. Empty lists
    /// measure zero without touching the cache.
    pub fn measure(&mut self, id: &RecordId, categories: &[String], available_width: f32) -> f32 {
        if categories.is_empty() {
            return 0.0;
        }
        let layout = &self.layout;
        self.cache
            .get_or_compute(BlockId::of(id, categories), available_width, || {
                layout.measure(categories, available_width)
            })
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
