//! Frame timing for the cooperative update loop.

use std::time::{Duration, Instant};

/// Where frame deltas come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Clock {
    /// Wall-clock time, measured between `update` calls.
    RealTime,
    /// Every frame advances by the same fixed step (headless runs, tests).
    Stepped(Duration),
}

/// Manages frame timing and delta time calculation.
#[derive(Debug)]
pub struct Time {
    clock: Clock,
    /// Time of the last frame (real-time clock only).
    last_frame: Instant,
    /// Duration of the last frame.
    delta: Duration,
    /// Total elapsed time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a wall-clock time manager.
    pub fn new() -> Self {
        Self::with_clock(Clock::RealTime)
    }

    /// Create a time manager that advances `1 / hz` seconds per frame.
    pub fn stepped(hz: f64) -> Self {
        Self::with_clock(Clock::Stepped(Duration::from_secs_f64(1.0 / hz.max(f64::EPSILON))))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Update timing at the start of a new frame.
    pub fn update(&mut self) {
        self.delta = match self.clock {
            Clock::RealTime => {
                let now = Instant::now();
                let delta = now - self.last_frame;
                self.last_frame = now;
                delta
            }
            Clock::Stepped(step) => step,
        };
        self.elapsed += self.delta;
        self.frame_count += 1;
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepped_clock_advances_fixed_amount() {
        let mut time = Time::stepped(50.0);
        for _ in 0..10 {
            time.update();
        }
        assert_eq!(time.frame_count(), 10);
        assert!((time.elapsed_seconds() - 0.2).abs() < 1e-5);
        assert!((time.delta_seconds() - 0.02).abs() < 1e-6);
    }
}
