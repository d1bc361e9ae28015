//! Frame time source
//!
//! Every component reads the same `FrameTime` for a given frame: the
//! monotonic elapsed time since the controller started, and the delta since
//! the previous frame. Nothing below this module reads a wall clock.
//!
//! Elapsed time accumulates in `f64` so it keeps advancing over long uptimes;
//! deltas stay `f32`.

use std::time::{Duration, Instant};

/// Elapsed time and per-frame delta, both in seconds.
///
/// INVARIANT: `delta >= 0` and both values are finite.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    pub elapsed: f64,
    pub delta: f32,
}

impl FrameTime {
    /// Build a frame time, sanitising non-finite or negative inputs to zero.
    pub fn new(elapsed: f64, delta: f32) -> Self {
        let elapsed = if elapsed.is_finite() && elapsed >= 0.0 {
            elapsed
        } else {
            tracing::warn!("Invalid frame elapsed ({}), using 0", elapsed);
            0.0
        };
        Self {
            elapsed,
            delta: sanitize_delta(delta),
        }
    }
}

fn sanitize_delta(v: f32) -> f32 {
    if v.is_finite() && v >= 0.0 {
        v
    } else {
        tracing::warn!("Invalid frame delta ({}), using 0", v);
        0.0
    }
}

/// Monotonic frame clock.
///
/// `advance` drives it with a synthetic delta (simulation, tests);
/// `tick` drives it from the OS monotonic clock.
pub struct FrameClock {
    elapsed: f64,
    last_tick: Option<Instant>,
    /// Largest delta accepted by `tick` (e.g. after the host was suspended)
    max_delta: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            last_tick: None,
            max_delta: Duration::from_millis(100),
        }
    }

    /// Advance by an explicit delta in seconds.
    pub fn advance(&mut self, delta: f32) -> FrameTime {
        let delta = sanitize_delta(delta);
        self.elapsed += delta as f64;
        FrameTime {
            elapsed: self.elapsed,
            delta,
        }
    }

    /// Advance by the real time since the previous `tick`.
    /// The first call yields a zero delta.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let delta = match self.last_tick {
            Some(last) => now.duration_since(last).min(self.max_delta),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);
        self.advance(delta.as_secs_f32())
    }

    /// Current time without advancing.
    pub fn now(&self) -> FrameTime {
        FrameTime {
            elapsed: self.elapsed,
            delta: 0.0,
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
