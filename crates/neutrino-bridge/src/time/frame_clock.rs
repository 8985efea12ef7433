use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time since the previous tick, in host time units. Zero on the first tick.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// The host measures time in its own unit (10 ms by default), so `dt` is
/// `elapsed / time_unit` rather than seconds. Elapsed time is clamped to
/// `max_delta` so a stall (debugger, minimized window) does not hand the
/// simulation one huge step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    frame_index: u64,
    time_unit: Duration,
    max_delta: Duration,
}

impl FrameClock {
    pub const DEFAULT_TIME_UNIT: Duration = Duration::from_millis(10);
    pub const DEFAULT_MAX_DELTA: Duration = Duration::from_millis(250);

    pub fn new() -> Self {
        Self::with_units(Self::DEFAULT_TIME_UNIT, Self::DEFAULT_MAX_DELTA)
    }

    /// Creates a clock with a custom host time unit and stall clamp.
    pub fn with_units(time_unit: Duration, max_delta: Duration) -> Self {
        debug_assert!(!time_unit.is_zero());
        Self {
            last: None,
            frame_index: 0,
            time_unit,
            max_delta,
        }
    }

    /// Forgets the previous tick; the next tick yields `dt = 0`.
    ///
    /// Useful after the loop was suspended.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Advances the clock using the current time.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let elapsed = match self.last {
            Some(last) => now.saturating_duration_since(last).min(self.max_delta),
            None => Duration::ZERO,
        };
        self.last = Some(now);

        let ft = FrameTime {
            dt: (elapsed.as_secs_f64() / self.time_unit.as_secs_f64()) as f32,
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_zero_delta() {
        let mut clock = FrameClock::new();
        let ft = clock.tick_at(Instant::now());
        assert_eq!(ft.dt, 0.0);
        assert_eq!(ft.frame_index, 0);
    }

    #[test]
    fn delta_is_in_host_units() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        clock.tick_at(start);

        let ft = clock.tick_at(start + Duration::from_millis(25));
        assert!((ft.dt - 2.5).abs() < 1e-4, "dt = {}", ft.dt);
        assert_eq!(ft.frame_index, 1);
    }

    #[test]
    fn stalls_are_clamped() {
        let mut clock = FrameClock::with_units(Duration::from_millis(10), Duration::from_millis(100));
        let start = Instant::now();
        clock.tick_at(start);

        let ft = clock.tick_at(start + Duration::from_secs(5));
        assert!((ft.dt - 10.0).abs() < 1e-4, "dt = {}", ft.dt);
    }

    #[test]
    fn time_going_backwards_is_zero() {
        let mut clock = FrameClock::new();
        let start = Instant::now() + Duration::from_secs(1);
        clock.tick_at(start);

        let ft = clock.tick_at(start - Duration::from_millis(5));
        assert_eq!(ft.dt, 0.0);
    }

    #[test]
    fn reset_restarts_delta() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        clock.tick_at(start);
        clock.reset();

        let ft = clock.tick_at(start + Duration::from_millis(50));
        assert_eq!(ft.dt, 0.0);
        assert_eq!(ft.frame_index, 1);
    }
}
