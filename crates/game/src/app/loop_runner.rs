use std::io::{self, Write};
use std::process::ExitCode;

use engine::{run_headless, MetricsHandle, Scene, SceneWorld};
use tracing::{error, info};

use super::bootstrap::{build_app, AppWiring, CliArgs};

pub(crate) fn run(cli: CliArgs) -> ExitCode {
    let app = match build_app(cli) {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };
    match run_app(app, &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "snapshot_dump_failed");
            ExitCode::FAILURE
        }
    }
}

/// Runs the wired scene to completion. Only the snapshot dump goes to `out`.
fn run_app(app: AppWiring, out: &mut dyn Write) -> io::Result<()> {
    let AppWiring {
        config,
        mut scene,
        dump_snapshot,
    } = app;
    let mut world = SceneWorld::default();
    let metrics = MetricsHandle::default();

    let summary = run_headless(&config, &mut scene, &mut world, &metrics);
    let snapshot = scene.snapshot(&world);
    let last_metrics = metrics.snapshot();
    info!(
        ticks = summary.ticks,
        hard_resets = summary.hard_resets,
        workers = snapshot.agents.len(),
        tps = last_metrics.tps,
        sim_speed = last_metrics.sim_speed,
        events_last_tick = snapshot.last_tick_events.total,
        "simulation_finished"
    );

    let dumped = if dump_snapshot {
        write_snapshot(&snapshot, out)
    } else {
        Ok(())
    };

    scene.unload(&mut world);
    dumped
}

fn write_snapshot<T: serde::Serialize>(snapshot: &T, out: &mut dyn Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, snapshot)?;
    writeln!(out)?;
    out.flush()
}
