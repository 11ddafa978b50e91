#![forbid(unsafe_code)]

//! Canonical input events for the inventory screen.
//!
//! The host (a test, the demo binary, or a real UI shell) translates its own
//! input into these and hands them to the runtime. Coordinates and sizes are
//! in logical pixels.

use std::time::Duration;

use crate::record::RecordId;

/// Canonical input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The user tapped the list item with this id.
    Tap(RecordId),

    /// Screen focus gained or lost.
    ///
    /// `true` = the screen became active.
    Focus(bool),

    /// The user pulled the list down to refresh.
    PullToRefresh,

    /// The list was scrolled by `delta` pixels (positive = towards the end).
    Scroll {
        /// Scroll distance.
        delta: f32,
    },

    /// The viewport changed size.
    Resize {
        /// New viewport width.
        width: f32,
        /// New viewport height.
        height: f32,
    },

    /// A frame elapsed.
    ///
    /// Drives running transitions. `dt` is the time since the previous tick.
    Tick(Duration),
}

impl Event {
    /// Whether this event originated from direct user input.
    #[must_use]
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Self::Tap(_) | Self::PullToRefresh | Self::Scroll { .. }
        )
    }
}
