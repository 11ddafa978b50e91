#![forbid(unsafe_code)]

//! Core: inventory records, recency, input events, image geometry, and animation.
//!
//! Everything in this crate is synchronous and free of I/O. The widgets and
//! runtime crates build the list screen on top of these types.

pub mod animation;
pub mod error;
pub mod event;
pub mod geometry;
pub mod recency;
pub mod record;

pub use error::ParseError;
pub use event::Event;
pub use recency::{Clock, FixedClock, RECENT_WINDOW, SystemClock, is_recent};
pub use record::{
    DisplayRecord, InventoryCollection, InventoryRecord, RawFields, RawRecord, RecordId,
    parse_record, split_categories,
};
