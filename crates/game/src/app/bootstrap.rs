use std::io;
use std::path::PathBuf;

use engine::LoopConfig;
use tracing::{info, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use super::config::{is_valid_run_seconds, ConfigError, SimConfig, CONFIG_ENV_VAR};
use super::gameplay::{GameplayScene, GAMEPLAY_SYSTEM_ORDER_TEXT};

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CliArgs {
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) run_seconds: Option<f64>,
    pub(crate) seed: Option<u64>,
    pub(crate) realtime: bool,
    pub(crate) dump_snapshot: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CliCommand {
    Run(CliArgs),
    Help,
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: GameplayScene,
    pub(crate) dump_snapshot: bool,
}

pub(crate) fn parse_cli_args(args: &[String]) -> Result<CliCommand, String> {
    let mut cli = CliArgs::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(CliCommand::Help),
            "--config" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --config".to_string())?;
                cli.config_path = Some(PathBuf::from(value));
                index += 2;
            }
            "--seconds" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --seconds".to_string())?;
                let seconds = value
                    .parse::<f64>()
                    .ok()
                    .filter(|seconds| is_valid_run_seconds(*seconds))
                    .ok_or_else(|| {
                        format!("invalid --seconds value '{value}' (expected a positive number)")
                    })?;
                cli.run_seconds = Some(seconds);
                index += 2;
            }
            "--seed" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --seed".to_string())?;
                cli.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("invalid --seed value '{value}' (expected u64)"))?,
                );
                index += 2;
            }
            "--realtime" => {
                cli.realtime = true;
                index += 1;
            }
            "--dump-snapshot" => {
                cli.dump_snapshot = true;
                index += 1;
            }
            other => return Err(format!("unknown argument '{other}'\n\n{}", usage_text())),
        }
    }
    Ok(CliCommand::Run(cli))
}

pub(crate) fn usage_text() -> String {
    [
        "Usage:",
        "  whisperfield [--config <path>] [--seconds <f64>] [--seed <u64>] [--realtime]",
        "               [--dump-snapshot]",
        "",
        "Options:",
        "  --config <path>   JSON config file (falls back to $WHISPERFIELD_CONFIG)",
        "  --seconds <f64>   simulated seconds to run",
        "  --seed <u64>      RNG seed for a reproducible run",
        "  --realtime        pace ticks against the wall clock",
        "  --dump-snapshot   print the final world snapshot as JSON on stdout (logs go to stderr)",
    ]
    .join("\n")
}

pub(crate) fn build_app(cli: CliArgs) -> Result<AppWiring, ConfigError> {
    init_tracing();
    info!("=== Whisperfield Startup ===");

    let mut config = SimConfig::resolve(cli.config_path.as_deref())?;
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;
    info!(
        config_path = ?cli
            .config_path
            .as_deref()
            .map(|path| path.display().to_string())
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok()),
        seed = config.seed,
        houses = config.world.house_count,
        wheat_fields = config.world.wheat_columns * config.world.wheat_rows,
        scripted_casts = config.casts.len(),
        sys = GAMEPLAY_SYSTEM_ORDER_TEXT,
        "config_resolved"
    );

    Ok(AppWiring {
        config: config.loop_config(),
        scene: GameplayScene::new(config.gameplay_settings()),
        dump_snapshot: cli.dump_snapshot,
    })
}

fn apply_cli_overrides(config: &mut SimConfig, cli: &CliArgs) {
    if let Some(seconds) = cli.run_seconds {
        config.run_seconds = Some(seconds);
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if cli.realtime {
        config.realtime = true;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    log_subscriber(filter, io::stderr).init();
}

/// Logs never share stdout with `--dump-snapshot` output.
pub(crate) fn log_subscriber<W>(
    filter: EnvFilter,
    writer: W,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .finish()
}
