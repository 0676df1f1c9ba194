use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::metrics::TickWindow;
use super::{LoopMetricsSnapshot, MetricsHandle, Scene, SceneCommand, SceneWorld};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Stop once this much simulated time has been stepped. `None` runs until
    /// the scene asks to quit.
    pub run_for: Option<Duration>,
    /// Pace ticks against the wall clock. When false every frame feeds exactly
    /// one fixed step, so the run is as fast as the host allows.
    pub realtime: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            run_for: None,
            realtime: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    DurationElapsed,
    QuitRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub simulated: Duration,
    pub dropped_backlog: Duration,
    pub hard_resets: u32,
    pub stop_reason: StopReason,
}

pub fn run_headless(
    config: &LoopConfig,
    scene: &mut dyn Scene,
    world: &mut SceneWorld,
    metrics_handle: &MetricsHandle,
) -> RunSummary {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    world.clear();
    scene.load(world);
    world.apply_pending();
    info!(
        scene = %scene.debug_title(world).unwrap_or_default(),
        entity_count = world.entity_count(),
        "scene_loaded"
    );
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        realtime = config.realtime,
        run_for_ms = config.run_for.map(|limit| limit.as_millis() as u64),
        "loop_config"
    );

    let mut ticks = 0u64;
    let mut hard_resets = 0u32;
    let mut simulated = Duration::ZERO;
    let mut dropped_total = Duration::ZERO;
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut tick_window = TickWindow::open(metrics_log_interval, Instant::now());

    let stop_reason = 'frames: loop {
        if config.run_for.is_some_and(|limit| simulated >= limit) {
            break 'frames StopReason::DurationElapsed;
        }

        let frame_started = Instant::now();
        let frame_dt = if config.realtime {
            let raw = frame_started.saturating_duration_since(last_frame_instant);
            clamp_frame_delta(raw, max_frame_delta)
        } else {
            fixed_dt
        };
        last_frame_instant = frame_started;

        accumulator = accumulator.saturating_add(frame_dt);
        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        accumulator = step_plan.remaining_accumulator;
        if !step_plan.dropped_backlog.is_zero() {
            dropped_total = dropped_total.saturating_add(step_plan.dropped_backlog);
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                "sim_backlog_dropped"
            );
        }

        for _ in 0..step_plan.ticks_to_run {
            let tick_started = Instant::now();
            let command = scene.update(fixed_dt_seconds, world);
            world.apply_pending();
            tick_window.record(tick_started.elapsed(), fixed_dt);
            ticks = ticks.saturating_add(1);
            simulated = simulated.saturating_add(fixed_dt);

            match command {
                SceneCommand::None => {}
                SceneCommand::HardReset => {
                    scene.unload(world);
                    world.clear();
                    scene.load(world);
                    world.apply_pending();
                    hard_resets = hard_resets.saturating_add(1);
                    info!(entity_count = world.entity_count(), "scene_hard_reset");
                }
                SceneCommand::Quit => {
                    info!(reason = "scene_quit", "shutdown_requested");
                    break 'frames StopReason::QuitRequested;
                }
            }

            if config.run_for.is_some_and(|limit| simulated >= limit) {
                break 'frames StopReason::DurationElapsed;
            }
        }

        if let Some(snapshot) = tick_window.poll(Instant::now()) {
            publish_metrics(metrics_handle, snapshot);
        }

        if config.realtime {
            let sleep_for = compute_cap_sleep(frame_started.elapsed(), Some(fixed_dt));
            if !sleep_for.is_zero() {
                thread::sleep(sleep_for);
            }
        }
    };

    if let Some(snapshot) = tick_window.flush(Instant::now()) {
        publish_metrics(metrics_handle, snapshot);
    }

    let summary = RunSummary {
        ticks,
        simulated,
        dropped_backlog: dropped_total,
        hard_resets,
        stop_reason,
    };
    info!(
        ticks = summary.ticks,
        simulated_seconds = summary.simulated.as_secs_f64(),
        dropped_backlog_ms = summary.dropped_backlog.as_millis() as u64,
        stop_reason = ?summary.stop_reason,
        "run_finished"
    );
    summary
}

fn publish_metrics(metrics_handle: &MetricsHandle, snapshot: LoopMetricsSnapshot) {
    metrics_handle.publish(snapshot);
    info!(
        tps = snapshot.tps,
        sim_speed = snapshot.sim_speed,
        tick_time_ms = snapshot.tick_time_ms,
        max_tick_time_ms = snapshot.max_tick_time_ms,
        "loop_metrics"
    );
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        let dropped_backlog = accumulator;
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}
