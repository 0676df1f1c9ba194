use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Tick statistics over one reporting window of the headless loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub tps: f32,
    /// Simulated seconds stepped per wall-clock second.
    pub sim_speed: f32,
    pub tick_time_ms: f32,
    pub max_tick_time_ms: f32,
}

/// Latest closed window, readable from outside the loop.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<Mutex<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

#[derive(Debug)]
pub(crate) struct TickWindow {
    opened_at: Instant,
    interval: Duration,
    ticks: u32,
    simulated: Duration,
    busy: Duration,
    slowest: Duration,
}

impl TickWindow {
    pub(crate) fn open(interval: Duration, now: Instant) -> Self {
        Self {
            opened_at: now,
            interval,
            ticks: 0,
            simulated: Duration::ZERO,
            busy: Duration::ZERO,
            slowest: Duration::ZERO,
        }
    }

    pub(crate) fn record(&mut self, tick_time: Duration, fixed_dt: Duration) {
        self.ticks = self.ticks.saturating_add(1);
        self.simulated = self.simulated.saturating_add(fixed_dt);
        self.busy = self.busy.saturating_add(tick_time);
        self.slowest = self.slowest.max(tick_time);
    }

    /// Closes the window once its interval has passed.
    pub(crate) fn poll(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        if now.saturating_duration_since(self.opened_at) < self.interval {
            return None;
        }
        Some(self.close(now))
    }

    /// Closes a partial window at shutdown. Empty windows report nothing.
    pub(crate) fn flush(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        (self.ticks > 0).then(|| self.close(now))
    }

    fn close(&mut self, now: Instant) -> LoopMetricsSnapshot {
        let wall_seconds = now
            .saturating_duration_since(self.opened_at)
            .as_secs_f32()
            .max(f32::EPSILON);
        let tick_time_ms = if self.ticks == 0 {
            0.0
        } else {
            self.busy.as_secs_f32() * 1000.0 / self.ticks as f32
        };
        let snapshot = LoopMetricsSnapshot {
            tps: self.ticks as f32 / wall_seconds,
            sim_speed: self.simulated.as_secs_f32() / wall_seconds,
            tick_time_ms,
            max_tick_time_ms: self.slowest.as_secs_f32() * 1000.0,
        };
        *self = Self::open(self.interval, now);
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const DT: Duration = Duration::from_millis(100);

    #[test]
    fn window_reports_rate_speed_and_tick_times() {
        let base = Instant::now();
        let mut window = TickWindow::open(Duration::from_secs(1), base);
        window.record(Duration::from_millis(2), DT);
        window.record(Duration::from_millis(6), DT);
        window.record(Duration::from_millis(1), DT);
        window.record(Duration::from_millis(3), DT);

        let snapshot = window
            .poll(base + Duration::from_secs(2))
            .expect("window closed");

        assert!((snapshot.tps - 2.0).abs() < 1e-3);
        assert!((snapshot.sim_speed - 0.2).abs() < 1e-3);
        assert!((snapshot.tick_time_ms - 3.0).abs() < 1e-3);
        assert!((snapshot.max_tick_time_ms - 6.0).abs() < 1e-3);
    }

    #[test]
    fn window_stays_open_until_interval_passes() {
        let base = Instant::now();
        let mut window = TickWindow::open(Duration::from_secs(1), base);
        window.record(Duration::from_millis(1), DT);

        assert!(window.poll(base + Duration::from_millis(999)).is_none());
        assert!(window.poll(base + Duration::from_secs(1)).is_some());
    }

    #[test]
    fn closing_starts_a_fresh_window() {
        let base = Instant::now();
        let mut window = TickWindow::open(Duration::from_secs(1), base);
        window.record(Duration::from_millis(9), DT);
        let _ = window.poll(base + Duration::from_secs(1));

        let second = window
            .poll(base + Duration::from_secs(2))
            .expect("second window");
        assert_eq!(second.tps, 0.0);
        assert_eq!(second.max_tick_time_ms, 0.0);
    }

    #[test]
    fn flush_skips_empty_window_and_closes_partial_one() {
        let base = Instant::now();
        let mut window = TickWindow::open(Duration::from_secs(10), base);
        assert!(window.flush(base + Duration::from_secs(1)).is_none());

        window.record(Duration::from_millis(4), DT);
        let partial = window
            .flush(base + Duration::from_millis(500))
            .expect("partial window");
        assert!((partial.tps - 2.0).abs() < 1e-3);
        assert!(window.flush(base + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn handle_survives_a_poisoned_lock() {
        let handle = MetricsHandle::default();
        let poisoner = handle.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.latest.lock().expect("lock");
            panic!("poison metrics lock");
        })
        .join();

        let expected = LoopMetricsSnapshot {
            tps: 60.0,
            sim_speed: 1.0,
            tick_time_ms: 0.5,
            max_tick_time_ms: 2.0,
        };
        handle.publish(expected);
        assert_eq!(handle.snapshot(), expected);
    }
}
