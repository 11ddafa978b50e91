#![forbid(unsafe_code)]

//! List-item widgets for stockview.
//!
//! - [`expansion`]: the per-item expand/collapse state machine and its pure
//!   visual frame.
//! - [`measure`]: category block height measurement and memoization.
//! - [`virtualized`]: render-window planning and view recycling.
//! - [`card`]: the item card that ties the three together for one record.

pub mod card;
pub mod expansion;
pub mod measure;
pub mod virtualized;

pub use card::{CardConfig, CardFrame, ImageFrame, ImageSlot, ItemCard};
pub use expansion::{
    Chevron, ExpansionState, ExpansionView, HeightUpdate, Phase, TapOutcome, TitleMetrics,
    VisualFrame, render,
};
pub use measure::{CategoryMeasure, ChipFlowLayout, ChipMetrics, HeightOracle, MeasureCache};
pub use virtualized::{OffsetIndex, Recyclable, ViewPool, VirtualizedList, WindowConfig};
