#![forbid(unsafe_code)]

//! Per-item expand/collapse state machine.
//!
//! ```text
//!              tap                      timer
//!  Collapsed ───────▶ Expanding ───────────────▶ Expanded
//!      ▲                                            │
//!      │   timer                     tap            │
//!      └────────── Collapsing ◀─────────────────────┘
//! ```
//!
//! Taps during `Expanding` or `Collapsing` are ignored. All visual
//! quantities derive from the single `progress` scalar through [`render`],
//! so they can never disagree with each other.
//!
//! Title truncation is released when expansion *starts* and re-applied only
//! when collapse *finishes*.

use std::time::Duration;

use serde::Deserialize;
use stockview_core::animation::{Animation, DEFAULT_TRANSITION, Tween, lerp};

/// Aspect ratio used before (or instead of) a resolved image size.
pub const SQUARE: f32 = 1.0;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Expansion phase of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Collapsed,
    Expanding,
    Expanded,
    Collapsing,
}

impl Phase {
    /// Whether a transition is in flight.
    #[inline]
    pub fn is_animating(self) -> bool {
        matches!(self, Self::Expanding | Self::Collapsing)
    }

    /// Indicator glyph for this phase.
    #[inline]
    pub fn chevron(self) -> Chevron {
        match self {
            Self::Collapsed | Self::Collapsing => Chevron::Down,
            Self::Expanding | Self::Expanded => Chevron::Up,
        }
    }

    /// Stable lowercase name, used in logs and text frames.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collapsed => "collapsed",
            Self::Expanding => "expanding",
            Self::Expanded => "expanded",
            Self::Collapsing => "collapsing",
        }
    }
}

/// Directional indicator shown on the card. Flips at toggle time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chevron {
    Down,
    Up,
}

/// Result of [`ExpansionState::tap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// A transition started; carries the new phase.
    Started(Phase),
    /// A transition was already running; nothing changed.
    Ignored(Phase),
}

/// Result of [`ExpansionState::report_category_height`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightUpdate {
    /// The stored height changed.
    Updated,
    /// Same as the stored value.
    Unchanged,
    /// Not a positive finite height.
    Rejected,
    /// Expansion is running; the value is applied when it settles.
    Deferred,
}

// ---------------------------------------------------------------------------
// Visual frame
// ---------------------------------------------------------------------------

/// Title sizing in both stable states.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TitleMetrics {
    /// One-line height; the collapsed title cap.
    pub line_height: f32,
    /// Expanded title cap.
    pub max_height: f32,
    /// Line clamp while truncated.
    pub collapsed_lines: u16,
    /// Line clamp once truncation is released.
    pub expanded_lines: u16,
}

impl Default for TitleMetrics {
    fn default() -> Self {
        Self {
            line_height: 24.0,
            max_height: 240.0,
            collapsed_lines: 1,
            expanded_lines: 10,
        }
    }
}

/// Derived visual quantities for one progress value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualFrame {
    /// Image width / height. Square when collapsed.
    pub image_aspect_ratio: f32,
    /// Visible height of the category block.
    pub category_height: f32,
    /// Height allotted to the title.
    pub title_max_height: f32,
}

/// Compute the visual frame for `progress`.
///
/// `progress` is clamped to [0, 1]. At 0 the frame is the collapsed layout
/// regardless of the measured inputs.
pub fn render(
    progress: f32,
    measured_category_height: f32,
    aspect_ratio: f32,
    title: &TitleMetrics,
) -> VisualFrame {
    let t = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    VisualFrame {
        image_aspect_ratio: lerp(SQUARE, aspect_ratio, t),
        category_height: lerp(0.0, measured_category_height.max(0.0), t),
        title_max_height: lerp(title.line_height, title.max_height, t),
    }
}

/// Everything a card needs from its expansion state for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpansionView {
    pub phase: Phase,
    pub progress: f32,
    pub frame: VisualFrame,
    pub title_line_limit: u16,
    pub chevron: Chevron,
}

// ---------------------------------------------------------------------------
// ExpansionState
// ---------------------------------------------------------------------------

/// Expansion state of one rendered item.
#[derive(Debug, Clone)]
pub struct ExpansionState {
    phase: Phase,
    progress: f32,
    measured_category_height: f32,
    resolved_aspect_ratio: f32,
    title_truncated: bool,
    tween: Option<Tween>,
    pending_category_height: Option<f32>,
    duration: Duration,
    title: TitleMetrics,
}

impl Default for ExpansionState {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSITION, TitleMetrics::default())
    }
}

impl ExpansionState {
    /// A collapsed item with a square image and no measured categories.
    pub fn new(duration: Duration, title: TitleMetrics) -> Self {
        Self {
            phase: Phase::Collapsed,
            progress: 0.0,
            measured_category_height: 0.0,
            resolved_aspect_ratio: SQUARE,
            title_truncated: true,
            tween: None,
            pending_category_height: None,
            duration,
            title,
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Interpolation progress in [0, 1].
    #[inline]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    #[inline]
    pub fn measured_category_height(&self) -> f32 {
        self.measured_category_height
    }

    #[inline]
    pub fn resolved_aspect_ratio(&self) -> f32 {
        self.resolved_aspect_ratio
    }

    /// Whether the title is clamped to its collapsed line count.
    #[inline]
    pub fn title_truncated(&self) -> bool {
        self.title_truncated
    }

    /// Handle a tap on the item.
    pub fn tap(&mut self) -> TapOutcome {
        let (next, from, to) = match self.phase {
            Phase::Collapsed => (Phase::Expanding, 0.0, 1.0),
            Phase::Expanded => (Phase::Collapsing, 1.0, 0.0),
            phase => {
                tracing::trace!(phase = phase.as_str(), "tap ignored mid-transition");
                return TapOutcome::Ignored(phase);
            }
        };
        if next == Phase::Expanding {
            self.title_truncated = false;
        }
        self.phase = next;
        self.tween = Some(Tween::new(from, to, self.duration));
        tracing::debug!(phase = next.as_str(), "expansion transition started");
        TapOutcome::Started(next)
    }

    /// Advance a running transition by `dt`. Returns whether anything changed.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let Some(tween) = self.tween.as_mut() else {
            return false;
        };
        tween.tick(dt);
        self.progress = tween.current();
        if tween.is_complete() {
            self.settle();
        }
        true
    }

    fn settle(&mut self) {
        self.tween = None;
        match self.phase {
            Phase::Expanding => {
                self.phase = Phase::Expanded;
                self.progress = 1.0;
            }
            Phase::Collapsing => {
                self.phase = Phase::Collapsed;
                self.progress = 0.0;
                self.title_truncated = true;
            }
            Phase::Collapsed | Phase::Expanded => {}
        }
        if let Some(height) = self.pending_category_height.take() {
            self.measured_category_height = height;
        }
        tracing::debug!(phase = self.phase.as_str(), "expansion transition settled");
    }

    /// Publish a resolved image aspect ratio.
    ///
    /// Non-positive or non-finite ratios fall back to square.
    pub fn set_aspect_ratio(&mut self, ratio: f32) {
        self.resolved_aspect_ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            SQUARE
        };
    }

    /// Publish a measured category block height.
    ///
    /// Only positive values that differ from the stored one are accepted.
    /// While expanding, a new value is held back until the transition
    /// settles so the running interpolation keeps its target.
    pub fn report_category_height(&mut self, height: f32) -> HeightUpdate {
        if !(height.is_finite() && height > 0.0) {
            return HeightUpdate::Rejected;
        }
        if self.phase == Phase::Expanding {
            if height == self.measured_category_height {
                self.pending_category_height = None;
                return HeightUpdate::Unchanged;
            }
            self.pending_category_height = Some(height);
            return HeightUpdate::Deferred;
        }
        if height == self.measured_category_height {
            return HeightUpdate::Unchanged;
        }
        self.measured_category_height = height;
        HeightUpdate::Updated
    }

    /// Current visual frame.
    pub fn frame(&self) -> VisualFrame {
        render(
            self.progress,
            self.measured_category_height,
            self.resolved_aspect_ratio,
            &self.title,
        )
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> ExpansionView {
        ExpansionView {
            phase: self.phase,
            progress: self.progress,
            frame: self.frame(),
            title_line_limit: if self.title_truncated {
                self.title.collapsed_lines
            } else {
                self.title.expanded_lines
            },
            chevron: self.phase.chevron(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF: Duration = Duration::from_millis(250);
    const FULL: Duration = Duration::from_millis(500);

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn starts_collapsed() {
        let state = ExpansionState::default();
        assert_eq!(state.phase(), Phase::Collapsed);
        assert_eq!(state.progress(), 0.0);
        assert!(state.title_truncated());
        assert_eq!(state.view().chevron, Chevron::Down);
        assert_eq!(state.view().title_line_limit, 1);
    }

    #[test]
    fn expand_releases_title_immediately() {
        let mut state = ExpansionState::default();
        assert_eq!(state.tap(), TapOutcome::Started(Phase::Expanding));
        assert!(!state.title_truncated());
        assert_eq!(state.progress(), 0.0);
        assert_eq!(state.view().title_line_limit, 10);
        assert_eq!(state.view().chevron, Chevron::Up);
    }

    #[test]
    fn expand_settles_at_one() {
        let mut state = ExpansionState::default();
        state.tap();
        assert!(state.tick(HALF));
        assert!(approx(state.progress(), 0.5));
        assert_eq!(state.phase(), Phase::Expanding);
        state.tick(HALF);
        assert_eq!(state.phase(), Phase::Expanded);
        assert_eq!(state.progress(), 1.0);
        assert!(!state.tick(HALF));
    }

    #[test]
    fn collapse_reapplies_truncation_only_at_end() {
        let mut state = ExpansionState::default();
        state.tap();
        state.tick(FULL);
        assert_eq!(state.tap(), TapOutcome::Started(Phase::Collapsing));
        assert_eq!(state.view().chevron, Chevron::Down);
        state.tick(HALF);
        assert!(!state.title_truncated());
        assert!(approx(state.progress(), 0.5));
        state.tick(HALF);
        assert_eq!(state.phase(), Phase::Collapsed);
        assert_eq!(state.progress(), 0.0);
        assert!(state.title_truncated());
    }

    #[test]
    fn tap_mid_transition_is_ignored() {
        let mut tapped = ExpansionState::default();
        let mut control = ExpansionState::default();
        tapped.tap();
        control.tap();
        tapped.tick(HALF);
        control.tick(HALF);
        assert_eq!(tapped.tap(), TapOutcome::Ignored(Phase::Expanding));
        for _ in 0..5 {
            tapped.tick(Duration::from_millis(50));
            control.tick(Duration::from_millis(50));
            assert_eq!(tapped.phase(), control.phase());
            assert!(approx(tapped.progress(), control.progress()));
        }
        assert_eq!(tapped.phase(), Phase::Expanded);
    }

    #[test]
    fn tap_mid_collapse_is_ignored() {
        let mut state = ExpansionState::default();
        state.tap();
        state.tick(FULL);
        state.tap();
        state.tick(Duration::from_millis(100));
        assert_eq!(state.tap(), TapOutcome::Ignored(Phase::Collapsing));
        assert_eq!(state.phase(), Phase::Collapsing);
    }

    #[test]
    fn height_rules() {
        let mut state = ExpansionState::default();
        assert_eq!(state.report_category_height(0.0), HeightUpdate::Rejected);
        assert_eq!(state.report_category_height(-3.0), HeightUpdate::Rejected);
        assert_eq!(state.report_category_height(f32::NAN), HeightUpdate::Rejected);
        assert_eq!(state.report_category_height(52.0), HeightUpdate::Updated);
        assert_eq!(state.report_category_height(52.0), HeightUpdate::Unchanged);
        assert_eq!(state.measured_category_height(), 52.0);
    }

    #[test]
    fn height_deferred_while_expanding() {
        let mut state = ExpansionState::default();
        state.report_category_height(26.0);
        state.tap();
        state.tick(HALF);
        assert_eq!(state.report_category_height(56.0), HeightUpdate::Deferred);
        assert_eq!(state.measured_category_height(), 26.0);
        assert!(approx(state.frame().category_height, 13.0));
        state.tick(HALF);
        assert_eq!(state.phase(), Phase::Expanded);
        assert_eq!(state.measured_category_height(), 56.0);
        assert_eq!(state.frame().category_height, 56.0);
    }

    #[test]
    fn repeated_cycles_reset_cleanly() {
        let mut state = ExpansionState::default();
        assert_eq!(state.report_category_height(40.0), HeightUpdate::Updated);
        let mut measured = 40.0;

        for cycle in 0..6 {
            assert_eq!(state.tap(), TapOutcome::Started(Phase::Expanding));
            assert!(!state.title_truncated());
            state.tick(HALF);
            assert!(approx(state.progress(), 0.5));
            assert!(approx(state.frame().category_height, measured / 2.0));

            if cycle == 2 {
                assert_eq!(state.report_category_height(64.0), HeightUpdate::Deferred);
                assert_eq!(state.measured_category_height(), measured);
            }
            if cycle == 3 {
                // Same value again: nothing pending from the previous cycle.
                assert_eq!(state.report_category_height(64.0), HeightUpdate::Unchanged);
            }

            state.tick(HALF);
            if cycle == 2 {
                measured = 64.0;
            }
            assert_eq!(state.phase(), Phase::Expanded);
            assert_eq!(state.progress(), 1.0);
            assert_eq!(state.measured_category_height(), measured);
            assert_eq!(state.frame().category_height, measured);

            assert_eq!(state.tap(), TapOutcome::Started(Phase::Collapsing));
            state.tick(HALF);
            assert!(!state.title_truncated());
            state.tick(HALF);
            assert_eq!(state.phase(), Phase::Collapsed);
            assert_eq!(state.progress(), 0.0);
            assert!(state.title_truncated());
            assert_eq!(state.frame().category_height, 0.0);
            assert_eq!(state.view().title_line_limit, 1);
            assert_eq!(state.view().chevron, Chevron::Down);
            assert_eq!(state.measured_category_height(), measured);
            assert!(!state.tick(HALF));
        }
    }

    #[test]
    fn aspect_ratio_fallback() {
        let mut state = ExpansionState::default();
        state.set_aspect_ratio(1.5);
        assert_eq!(state.resolved_aspect_ratio(), 1.5);
        state.set_aspect_ratio(0.0);
        assert_eq!(state.resolved_aspect_ratio(), SQUARE);
        state.set_aspect_ratio(f32::INFINITY);
        assert_eq!(state.resolved_aspect_ratio(), SQUARE);
    }

    #[test]
    fn render_endpoints() {
        let title = TitleMetrics::default();
        let collapsed = render(0.0, 80.0, 2.0, &title);
        assert_eq!(collapsed.image_aspect_ratio, 1.0);
        assert_eq!(collapsed.category_height, 0.0);
        assert_eq!(collapsed.title_max_height, 24.0);

        let expanded = render(1.0, 80.0, 2.0, &title);
        assert_eq!(expanded.image_aspect_ratio, 2.0);
        assert_eq!(expanded.category_height, 80.0);
        assert_eq!(expanded.title_max_height, 240.0);

        let mid = render(0.5, 80.0, 2.0, &title);
        assert!(approx(mid.image_aspect_ratio, 1.5));
        assert!(approx(mid.category_height, 40.0));
        assert!(approx(mid.title_max_height, 132.0));
    }

    #[test]
    fn render_clamps_progress() {
        let title = TitleMetrics::default();
        assert_eq!(render(-1.0, 10.0, 3.0, &title), render(0.0, 10.0, 3.0, &title));
        assert_eq!(render(7.0, 10.0, 3.0, &title), render(1.0, 10.0, 3.0, &title));
        assert_eq!(render(f32::NAN, 10.0, 3.0, &title), render(0.0, 10.0, 3.0, &title));
    }

    #[test]
    fn empty_categories_expand_with_zero_height() {
        let mut state = ExpansionState::default();
        state.tap();
        state.tick(FULL);
        assert_eq!(state.phase(), Phase::Expanded);
        assert_eq!(state.frame().category_height, 0.0);
    }
}
