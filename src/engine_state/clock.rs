//! Fixed-timestep clock.
//!
//! Wall-clock time is accumulated and spent in whole simulation steps. The
//! time added per frame is capped, so a long stall costs a bounded number of
//! catch-up steps.

use web_time::Duration;

#[derive(Debug)]
pub struct Clock {
    step: Duration,
    max_frame: Duration,
    accumulator: Duration,
    steps: u64,
}

impl Clock {
    /// A clock running `tick_rate` steps per second.
    pub fn new(tick_rate: u32, max_frame_secs: f32) -> Self {
        let step = Duration::from_secs_f64(1.0 / f64::from(tick_rate.max(1)));
        Clock {
            step,
            max_frame: Duration::from_secs_f32(max_frame_secs.max(0.0)).max(step),
            accumulator: Duration::ZERO,
            steps: 0,
        }
    }

    /// Length of one simulation step.
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Steps consumed since the clock was created.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Adds `elapsed`, capped to the maximum frame time.
    pub fn advance(&mut self, elapsed: Duration) {
        self.accumulator += elapsed.min(self.max_frame);
    }

    pub fn should_simulate(&self) -> bool {
        self.accumulator >= self.step
    }

    /// Spends one step of accumulated time.
    pub fn consume_step(&mut self) {
        self.accumulator = self.accumulator.saturating_sub(self.step);
        self.steps += 1;
    }

    /// Fraction of a step left in the accumulator, for interpolation.
    pub fn alpha(&self) -> f32 {
        self.accumulator.as_secs_f32() / self.step.as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spends_whole_steps() {
        let mut clock = Clock::new(50, 0.25);
        clock.advance(Duration::from_millis(45));
        let mut steps = 0;
        while clock.should_simulate() {
            clock.consume_step();
            steps += 1;
        }
        assert_eq!(steps, 2);
        assert_eq!(clock.steps(), 2);
        assert!((clock.alpha() - 0.25).abs() < 1e-3);
    }

    #[test]
    fn long_frames_are_capped() {
        let mut clock = Clock::new(50, 0.25);
        clock.advance(Duration::from_secs(10));
        let mut steps = 0;
        while clock.should_simulate() {
            clock.consume_step();
            steps += 1;
        }
        assert_eq!(steps, 12);
    }
}
