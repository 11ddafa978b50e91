#![forbid(unsafe_code)]

//! Time-based animation primitives.
//!
//! A [`Tween`] drives a scalar between two endpoints over a fixed duration.
//! The expansion engine uses one per active transition, ticking it from
//! frame deltas and reading [`Tween::current`] as the shared progress value.

use std::time::Duration;

/// Default duration of an expand or collapse transition.
pub const DEFAULT_TRANSITION: Duration = Duration::from_millis(500);

/// Identity easing, clamped to [0, 1].
#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Linear interpolation between `a` and `b` at `t`. `t` is not clamped.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// ---------------------------------------------------------------------------
// Animation trait
// ---------------------------------------------------------------------------

/// A time-based animation producing normalized values in [0.0, 1.0].
pub trait Animation {
    /// Advance the animation by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has reached its end.
    fn is_complete(&self) -> bool;

    /// Current progress, clamped to [0.0, 1.0].
    fn value(&self) -> f32;
}

// ---------------------------------------------------------------------------
// Tween
// ---------------------------------------------------------------------------

/// Linearly interpolates an `f32` from `from` to `to` over a duration.
///
/// Elapsed time is tracked as a [`Duration`] so repeated small ticks do not
/// drift. A zero duration is clamped to one nanosecond, so the first tick
/// completes the tween.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    from: f32,
    to: f32,
    elapsed: Duration,
    duration: Duration,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        Self {
            from,
            to,
            elapsed: Duration::ZERO,
            duration: if duration.is_zero() {
                Duration::from_nanos(1)
            } else {
                duration
            },
        }
    }

    /// Interpolated value between `from` and `to`.
    ///
    /// Exactly `to` once complete, so callers can snap without an epsilon.
    pub fn current(&self) -> f32 {
        if self.is_complete() {
            return self.to;
        }
        lerp(self.from, self.to, self.value())
    }
}

impl Animation for Tween {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn value(&self) -> f32 {
        let t = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        linear(t as f32)
    }
}
