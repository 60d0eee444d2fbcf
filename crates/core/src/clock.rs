use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Source of the per-frame time delta, in seconds.
pub trait Clock {
    fn delta(&mut self) -> f32;
}

/// Wall clock. The first delta is zero; later deltas are clamped so a stall
/// does not feed one huge step into the simulation.
#[derive(Debug, Clone)]
pub struct SystemClock {
    last: Option<Instant>,
    max_delta: f32,
}

impl SystemClock {
    pub fn new(max_delta: f32) -> Self {
        Self {
            last: None,
            max_delta,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl Clock for SystemClock {
    fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let dt = self
            .last
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
        self.last = Some(now);
        dt.clamp(0.0, self.max_delta)
    }
}

/// Constant delta, for deterministic runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    dt: f32,
}

impl FixedClock {
    pub fn new(dt: f32) -> Self {
        Self { dt }
    }
}

impl Clock for FixedClock {
    fn delta(&mut self) -> f32 {
        self.dt
    }
}

/// Wall time spent inside `frame`, over a sliding window of recent frames,
/// plus a lifetime count of frames that overran the budget.
#[derive(Debug)]
pub struct FrameTimer {
    window: VecDeque<Duration>,
    capacity: usize,
    budget: Duration,
    total: u64,
    over_budget: u64,
}

impl FrameTimer {
    pub fn new(capacity: usize, budget: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            budget,
            total: 0,
            over_budget: 0,
        }
    }

    /// Record one frame. Returns `true` when it took longer than the budget.
    pub fn record(&mut self, elapsed: Duration) -> bool {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(elapsed);
        self.total += 1;
        let over = elapsed > self.budget;
        if over {
            self.over_budget += 1;
        }
        over
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn average(&self) -> Duration {
        match self.window.len() {
            0 => Duration::ZERO,
            n => self.window.iter().sum::<Duration>() / n as u32,
        }
    }

    pub fn max(&self) -> Duration {
        self.window.iter().copied().max().unwrap_or_default()
    }

    pub fn min(&self) -> Duration {
        self.window.iter().copied().min().unwrap_or_default()
    }

    /// Samples in the window.
    pub fn count(&self) -> usize {
        self.window.len()
    }

    /// Frames recorded since creation.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Frames since creation that overran the budget.
    pub fn over_budget(&self) -> u64 {
        self.over_budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_constant() {
        let mut clock = FixedClock::new(0.25);
        assert_eq!(clock.delta(), 0.25);
        assert_eq!(clock.delta(), 0.25);
    }

    #[test]
    fn system_clock_starts_at_zero_and_clamps() {
        let mut clock = SystemClock::new(0.0);
        assert_eq!(clock.delta(), 0.0);
        std::thread::sleep(Duration::from_millis(2));
        // Clamped to max_delta.
        assert_eq!(clock.delta(), 0.0);
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn frame_timer_flags_overruns() {
        let mut timer = FrameTimer::new(8, ms(16));
        assert!(!timer.record(ms(10)));
        assert!(!timer.record(ms(16)));
        assert!(timer.record(ms(40)));

        assert_eq!(timer.count(), 3);
        assert_eq!(timer.over_budget(), 1);
        assert_eq!(timer.average(), ms(22));
        assert_eq!(timer.min(), ms(10));
        assert_eq!(timer.max(), ms(40));
    }

    #[test]
    fn window_slides_but_counts_persist() {
        let mut timer = FrameTimer::new(2, ms(5));
        for n in [30, 1, 2] {
            timer.record(ms(n));
        }
        // The 30ms overrun left the window but stays counted.
        assert_eq!(timer.count(), 2);
        assert_eq!(timer.max(), ms(2));
        assert_eq!(timer.total(), 3);
        assert_eq!(timer.over_budget(), 1);
    }

    #[test]
    fn empty_timer_reports_zero() {
        let timer = FrameTimer::new(0, ms(16));
        assert_eq!(timer.count(), 0);
        assert_eq!(timer.average(), Duration::ZERO);
        assert_eq!(timer.max(), Duration::ZERO);
        assert_eq!(timer.total(), 0);
    }
}
