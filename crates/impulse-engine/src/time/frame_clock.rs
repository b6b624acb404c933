use std::time::{Duration, Instant};

use crate::render::ribbon::Clock;

/// Timing of one redraw.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    pub now: Instant,

    /// Milliseconds since the clock started. Feeds the ribbon's `iTime`.
    pub elapsed_ms: f64,

    pub frame_index: u64,
}

impl FrameTime {
    /// Frames per second implied by `dt`.
    pub fn fps(&self) -> f32 {
        if self.dt > 0.0 { 1.0 / self.dt } else { 0.0 }
    }
}

impl Clock for FrameTime {
    fn now_ms(&self) -> f64 {
        self.elapsed_ms
    }
}

/// Produces one `FrameTime` per redraw of a window.
///
/// `dt` is clamped so a debugger pause or a minimized window does not hand
/// consumers a multi-second step. `elapsed_ms` is not clamped.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Restarts the `dt` baseline. `elapsed_ms` keeps counting from the start.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            elapsed_ms: now.saturating_duration_since(self.start).as_secs_f64() * 1000.0,
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

    // ── dt clamping ──────────────────────────────────────────────────────

    #[test]
    fn dt_is_clamped_to_bounds() {
        let mut clock = FrameClock::new();
        let t0 = clock.start;

        let fast = clock.tick_at(t0);
        assert!((fast.dt - 0.0001).abs() < 1e-6);

        let slow = clock.tick_at(t0 + Duration::from_secs(3));
        assert!((slow.dt - 0.25).abs() < 1e-6);
    }

    // ── elapsed time ─────────────────────────────────────────────────────

    #[test]
    fn elapsed_is_measured_from_start_and_unclamped() {
        let mut clock = FrameClock::new();
        let t0 = clock.start;
        clock.tick_at(t0 + Duration::from_millis(16));
        let ft = clock.tick_at(t0 + Duration::from_secs(2));
        assert!((ft.elapsed_ms - 2000.0).abs() < 1e-6);
        assert!((ft.now_ms() - 2000.0).abs() < 1e-6);
    }

    #[test]
    fn reset_keeps_elapsed_running() {
        let mut clock = FrameClock::new();
        let t0 = clock.start;
        clock.tick_at(t0 + Duration::from_millis(500));
        clock.reset();
        let ft = clock.tick_at(t0 + Duration::from_secs(10));
        assert!(ft.elapsed_ms >= 10_000.0 - 1e-6);
    }

    #[test]
    fn frame_index_counts_ticks() {
        let mut clock = FrameClock::new();
        let t0 = clock.start;
        let a = clock.tick_at(t0 + Duration::from_millis(16));
        let b = clock.tick_at(t0 + Duration::from_millis(32));
        assert_eq!((a.frame_index, b.frame_index), (0, 1));
    }

    #[test]
    fn fps_from_dt() {
        let ft = FrameTime {
            dt: 0.02,
            now: Instant::now(),
            elapsed_ms: 0.0,
            frame_index: 0,
        };
        assert!((ft.fps() - 50.0).abs() < 1e-3);
    }
}
