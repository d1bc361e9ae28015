//! Idle pose selection
//!
//! While nothing else owns the body, a new target is drawn from the pose
//! table every few seconds. Interval and blend rate are redrawn each time so
//! consecutive transitions never share the same timing.

use rand::Rng;
use vera_core::{PoseConfig, PoseState, PoseVector};

#[derive(Debug, Clone)]
pub struct IdlePoseSelector {
    table: &'static [PoseVector],
    interval: (f32, f32),
    rate_range: (f32, f32),
}

impl IdlePoseSelector {
    pub fn new(config: &PoseConfig) -> Self {
        let [lo, hi] = config.transition_rate_range;
        Self {
            table: config.table.poses(),
            interval: config.change_interval(),
            rate_range: (lo, hi),
        }
    }

    pub fn table(&self) -> &'static [PoseVector] {
        self.table
    }

    /// Uniform draw from the table. Repeats are allowed.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> PoseVector {
        self.table[rng.gen_range(0..self.table.len())]
    }

    pub fn draw_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        rng.gen_range(self.interval.0..self.interval.1)
    }

    pub fn draw_rate<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        rng.gen_range(self.rate_range.0..self.rate_range.1)
    }

    /// Retarget to a fresh random pose and restart the idle countdown.
    pub fn choose<R: Rng + ?Sized>(&self, pose: &mut PoseState, rng: &mut R) {
        let target = self.pick(rng);
        let rate = self.draw_rate(rng);
        pose.retarget(target, rate);
        pose.reset_idle(self.draw_interval(rng));
        tracing::trace!(
            "Idle pose -> {:?} at rate {:.3}, next in {:.2}s",
            target,
            rate,
            pose.next_change_interval
        );
    }

    /// Count idle time; pick a new pose once the interval is exceeded.
    /// Returns true when a new pose was chosen.
    pub fn tick<R: Rng + ?Sized>(&self, pose: &mut PoseState, delta: f32, rng: &mut R) -> bool {
        pose.idle_elapsed += delta;
        if pose.idle_elapsed > pose.next_change_interval {
            self.choose(pose, rng);
            true
        } else {
            false
        }
    }
}
