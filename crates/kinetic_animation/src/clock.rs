//! Frame clocks
//!
//! A frame clock supplies the `dt` a host driver passes to `step`/`tick`.
//! The core never reads time itself, so tests use [`FixedClock`] and real
//! hosts use [`SystemClock`] or their own display-refresh source.

use std::time::Instant;

/// Longest frame a [`SystemClock`] reports, in seconds
const MAX_FRAME_SECS: f32 = 0.25;

/// Source of per-frame time deltas
pub trait FrameClock {
    /// Seconds since the previous call
    fn delta(&mut self) -> f32;
}

/// Deterministic clock for tests and headless runs
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedClock {
    step: f32,
    frames: u64,
}

impl FixedClock {
    pub fn new(step_secs: f32) -> Self {
        Self {
            step: step_secs,
            frames: 0,
        }
    }

    /// Clock ticking at `fps` frames per second
    pub fn from_fps(fps: u32) -> Self {
        Self::new(1.0 / fps.max(1) as f32)
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Frames handed out so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Simulated seconds handed out so far
    pub fn now(&self) -> f32 {
        self.frames as f32 * self.step
    }
}

impl FrameClock for FixedClock {
    fn delta(&mut self) -> f32 {
        self.frames += 1;
        self.step
    }
}

/// Wall-clock deltas, clamped so a stalled host does not produce one huge step
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    last_frame: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        dt.min(MAX_FRAME_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let mut clock = FixedClock::from_fps(60);
        assert!((clock.delta() - 1.0 / 60.0).abs() < 1e-7);
        clock.delta();
        assert_eq!(clock.frames(), 2);
        assert!((clock.now() - 2.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_system_clock_is_clamped() {
        let mut clock = SystemClock::new();
        let dt = clock.delta();
        assert!((0.0..=MAX_FRAME_SECS).contains(&dt));
    }
}
