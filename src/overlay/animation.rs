//! Fade-in animation state.
//!
//! Alpha is recomputed from the start instant on every frame and multiplied
//! into the scene colors at draw time, so a cancelled or restarted transition
//! takes effect on the very next frame.

use std::time::{Duration, Instant};

/// A show transition in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub start: Instant,
    pub duration: Duration,
}

impl Animation {
    /// Start a transition now. A zero duration yields `None` (instant show).
    pub fn start(duration_ms: u32) -> Option<Self> {
        Self::start_at(Instant::now(), duration_ms)
    }

    pub fn start_at(start: Instant, duration_ms: u32) -> Option<Self> {
        if duration_ms == 0 {
            return None;
        }
        Some(Self {
            start,
            duration: Duration::from_millis(duration_ms as u64),
        })
    }

    /// Progress of the transition at `now`, clamped to `0..=1`.
    pub fn alpha_at(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.start);
        if elapsed >= self.duration {
            return 1.0;
        }
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn is_finished_at(&self, now: Instant) -> bool {
        self.alpha_at(now) >= 1.0
    }
}

/// Alpha for an optional animation; no animation means fully visible.
pub fn alpha_at(animation: Option<&Animation>, now: Instant) -> f32 {
    animation.map_or(1.0, |a| a.alpha_at(now))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_instant() {
        assert!(Animation::start(0).is_none());
        assert_eq!(alpha_at(None, Instant::now()), 1.0);
    }

    #[test]
    fn alpha_starts_at_zero() {
        let start = Instant::now();
        let anim = Animation::start_at(start, 200).unwrap();
        assert_eq!(anim.alpha_at(start), 0.0);
    }

    #[test]
    fn alpha_is_monotonic_and_reaches_one() {
        let start = Instant::now();
        let anim = Animation::start_at(start, 100).unwrap();

        let mut last = 0.0_f32;
        for ms in 0..=150 {
            let alpha = anim.alpha_at(start + Duration::from_millis(ms));
            assert!(alpha >= last, "alpha decreased at {}ms", ms);
            assert!((0.0..=1.0).contains(&alpha));
            last = alpha;
        }

        assert_eq!(anim.alpha_at(start + Duration::from_millis(100)), 1.0);
        assert_eq!(anim.alpha_at(start + Duration::from_secs(10)), 1.0);
        assert!(anim.is_finished_at(start + Duration::from_millis(100)));
    }

    #[test]
    fn alpha_midway() {
        let start = Instant::now();
        let anim = Animation::start_at(start, 200).unwrap();
        let alpha = anim.alpha_at(start + Duration::from_millis(100));
        assert!((alpha - 0.5).abs() < 1e-3);
    }

    #[test]
    fn clock_before_start_clamps_to_zero() {
        let now = Instant::now();
        let anim = Animation::start_at(now + Duration::from_millis(50), 100).unwrap();
        assert_eq!(anim.alpha_at(now), 0.0);
    }
}
