//! Frame timer producing the delta times fed to transform and camera helpers.

use std::time::{Duration, Instant};

/// High-resolution timer for measuring elapsed time.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
    frame_count: u64,
}

impl Timer {
    /// Create a new timer, starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
            frame_count: 0,
        }
    }

    /// Get the total elapsed time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get the elapsed time in seconds since the timer was created.
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed().as_secs_f32()
    }

    /// Get the time elapsed since the last call to `tick()`.
    /// Every tick counts as one frame.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        self.frame_count += 1;
        delta
    }

    /// Get the delta time in seconds since the last tick.
    pub fn delta_secs(&mut self) -> f32 {
        self.tick().as_secs_f32()
    }

    /// Number of ticks since creation or the last reset.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Reset the timer to the current time.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last_tick = now;
        self.frame_count = 0;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
