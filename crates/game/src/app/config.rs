use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine::LoopConfig;
use serde::Deserialize;
use thiserror::Error;

use super::gameplay::{
    GameplaySettings, ScriptedCast, SkillTuning, WorldLayout, MAX_HOUSES, MAX_WHEAT_COLUMNS,
    MAX_WHEAT_ROWS,
};

pub(crate) const CONFIG_ENV_VAR: &str = "WHISPERFIELD_CONFIG";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config {path} failed to parse at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value at {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SimConfig {
    /// Omitted seeds come from the OS.
    pub(crate) seed: Option<u64>,
    pub(crate) target_tps: u32,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) max_frame_delta_ms: u64,
    pub(crate) metrics_log_interval_ms: u64,
    /// `null` runs until the process is stopped.
    pub(crate) run_seconds: Option<f64>,
    pub(crate) realtime: bool,
    pub(crate) world: WorldConfig,
    pub(crate) whisper: WhisperConfig,
    pub(crate) debuff: DebuffConfig,
    pub(crate) casts: Vec<ScriptedCast>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WorldConfig {
    pub(crate) house_count: u32,
    pub(crate) wheat_columns: u32,
    pub(crate) wheat_rows: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WhisperConfig {
    pub(crate) radius: f32,
    pub(crate) duration_ms: u64,
    pub(crate) damage_min: f32,
    pub(crate) damage_max: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DebuffConfig {
    pub(crate) duration_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        let loop_defaults = LoopConfig::default();
        Self {
            seed: None,
            target_tps: loop_defaults.target_tps,
            max_ticks_per_frame: loop_defaults.max_ticks_per_frame,
            max_frame_delta_ms: loop_defaults.max_frame_delta.as_millis() as u64,
            metrics_log_interval_ms: loop_defaults.metrics_log_interval.as_millis() as u64,
            run_seconds: Some(30.0),
            realtime: false,
            world: WorldConfig::default(),
            whisper: WhisperConfig::default(),
            debuff: DebuffConfig::default(),
            casts: Vec::new(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        let layout = WorldLayout::default();
        Self {
            house_count: layout.house_count,
            wheat_columns: layout.wheat_columns,
            wheat_rows: layout.wheat_rows,
        }
    }
}

impl Default for WhisperConfig {
    fn default() -> Self {
        let tuning = SkillTuning::default();
        Self {
            radius: tuning.whisper_radius,
            duration_ms: seconds_to_ms(tuning.whisper_duration_seconds),
            damage_min: tuning.whisper_damage_min,
            damage_max: tuning.whisper_damage_max,
        }
    }
}

impl Default for DebuffConfig {
    fn default() -> Self {
        Self {
            duration_ms: seconds_to_ms(SkillTuning::default().debuff_duration_seconds),
        }
    }
}

impl SimConfig {
    /// Reads `explicit`, or the file named by `WHISPERFIELD_CONFIG`, or falls
    /// back to built-in defaults when neither is given.
    pub(crate) fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(raw) if !raw.is_empty() => Self::load(Path::new(&raw)),
            _ => Ok(Self::default()),
        }
    }

    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    pub(crate) fn parse(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, SimConfig>(&mut deserializer).map_err(|error| {
            let field = error.path().to_string();
            ConfigError::Parse {
                path: origin.to_path_buf(),
                field: if field.is_empty() { ".".to_string() } else { field },
                source: error.into_inner(),
            }
        })
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=1000).contains(&self.target_tps) {
            return Err(invalid(
                "target_tps",
                format!("expected 1..=1000, got {}", self.target_tps),
            ));
        }
        if self.max_ticks_per_frame == 0 {
            return Err(invalid("max_ticks_per_frame", "must be at least 1"));
        }
        if self.max_frame_delta_ms == 0 {
            return Err(invalid("max_frame_delta_ms", "must be positive"));
        }
        if self.metrics_log_interval_ms == 0 {
            return Err(invalid("metrics_log_interval_ms", "must be positive"));
        }
        if let Some(seconds) = self.run_seconds {
            if !is_valid_run_seconds(seconds) {
                return Err(invalid(
                    "run_seconds",
                    format!("expected a positive duration in range, got {seconds}"),
                ));
            }
        }

        let world = self.world;
        if !(1..=MAX_HOUSES).contains(&world.house_count) {
            return Err(invalid(
                "world.house_count",
                format!("expected 1..={MAX_HOUSES}, got {}", world.house_count),
            ));
        }
        if !(1..=MAX_WHEAT_COLUMNS).contains(&world.wheat_columns) {
            return Err(invalid(
                "world.wheat_columns",
                format!("expected 1..={MAX_WHEAT_COLUMNS}, got {}", world.wheat_columns),
            ));
        }
        if !(1..=MAX_WHEAT_ROWS).contains(&world.wheat_rows) {
            return Err(invalid(
                "world.wheat_rows",
                format!("expected 1..={MAX_WHEAT_ROWS}, got {}", world.wheat_rows),
            ));
        }

        let whisper = self.whisper;
        if !whisper.radius.is_finite() || whisper.radius <= 0.0 {
            return Err(invalid("whisper.radius", "must be a positive number"));
        }
        if whisper.duration_ms == 0 {
            return Err(invalid("whisper.duration_ms", "must be positive"));
        }
        if !whisper.damage_min.is_finite()
            || !whisper.damage_max.is_finite()
            || whisper.damage_min < 0.0
            || whisper.damage_min > whisper.damage_max
        {
            return Err(invalid(
                "whisper.damage_min",
                format!(
                    "expected 0 <= damage_min <= damage_max, got {}..{}",
                    whisper.damage_min, whisper.damage_max
                ),
            ));
        }
        if self.debuff.duration_ms == 0 {
            return Err(invalid("debuff.duration_ms", "must be positive"));
        }

        if let Some(cast) = self
            .casts
            .iter()
            .find(|cast| !cast.at_seconds().is_finite() || cast.at_seconds() < 0.0)
        {
            return Err(invalid(
                "casts",
                format!("cast time must be a non-negative number, got {}", cast.at_seconds()),
            ));
        }
        Ok(())
    }

    pub(crate) fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            target_tps: self.target_tps,
            max_frame_delta: Duration::from_millis(self.max_frame_delta_ms),
            max_ticks_per_frame: self.max_ticks_per_frame,
            metrics_log_interval: Duration::from_millis(self.metrics_log_interval_ms),
            run_for: self
                .run_seconds
                .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok()),
            realtime: self.realtime,
        }
    }

    pub(crate) fn gameplay_settings(&self) -> GameplaySettings {
        GameplaySettings {
            seed: self.seed,
            layout: WorldLayout {
                house_count: self.world.house_count,
                wheat_columns: self.world.wheat_columns,
                wheat_rows: self.world.wheat_rows,
            },
            tuning: SkillTuning {
                whisper_radius: self.whisper.radius,
                whisper_duration_seconds: ms_to_seconds(self.whisper.duration_ms),
                whisper_damage_min: self.whisper.damage_min,
                whisper_damage_max: self.whisper.damage_max,
                debuff_duration_seconds: ms_to_seconds(self.debuff.duration_ms),
            },
            casts: self.casts.clone(),
        }
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

/// A run length must be positive and representable as a `Duration`.
pub(crate) fn is_valid_run_seconds(seconds: f64) -> bool {
    seconds > 0.0 && Duration::try_from_secs_f64(seconds).is_ok()
}

fn ms_to_seconds(ms: u64) -> f32 {
    Duration::from_millis(ms).as_secs_f32()
}

fn seconds_to_ms(seconds: f32) -> u64 {
    Duration::from_secs_f32(seconds).as_millis() as u64
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn parse_value(value: serde_json::Value) -> Result<SimConfig, ConfigError> {
        SimConfig::parse(&value.to_string(), Path::new("inline.json"))
    }

    #[test]
    fn empty_object_yields_defaults() {
        let config = parse_value(json!({})).expect("parse");
        assert_eq!(config, SimConfig::default());
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = parse_value(json!({
            "seed": 42,
            "world": { "house_count": 6 },
            "whisper": { "duration_ms": 1500 }
        }))
        .expect("parse");

        assert_eq!(config.seed, Some(42));
        assert_eq!(config.world.house_count, 6);
        assert_eq!(config.world.wheat_columns, WorldConfig::default().wheat_columns);
        assert_eq!(config.whisper.radius, WhisperConfig::default().radius);

        let settings = config.gameplay_settings();
        assert_eq!(settings.seed, Some(42));
        assert!((settings.tuning.whisper_duration_seconds - 1.5).abs() < 1e-6);
        assert!((settings.tuning.debuff_duration_seconds - 10.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_field_reports_its_path() {
        let error = parse_value(json!({ "world": { "houses": 3 } })).expect_err("unknown field");
        match error {
            ConfigError::Parse { field, .. } => assert!(field.starts_with("world")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_type_reports_nested_path() {
        let error =
            parse_value(json!({ "whisper": { "damage_max": "lots" } })).expect_err("wrong type");
        match error {
            ConfigError::Parse { field, .. } => assert_eq!(field, "whisper.damage_max"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn scripted_casts_parse_by_skill_tag() {
        let config = parse_value(json!({
            "casts": [
                { "skill": "whisper", "at_seconds": 2.0, "x": 32.0, "y": 48.0 },
                { "skill": "debuff", "at_seconds": 1.0, "worker": 0, "kind": "fatigue" }
            ]
        }))
        .expect("parse");

        assert_eq!(config.casts.len(), 2);
        assert_eq!(
            config.casts[0],
            ScriptedCast::Whisper {
                at_seconds: 2.0,
                x: 32.0,
                y: 48.0
            }
        );
        assert!(matches!(config.casts[1], ScriptedCast::Debuff { worker: 0, .. }));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut config = SimConfig::default();
        config.world.house_count = MAX_HOUSES + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "world.house_count",
                ..
            })
        ));

        let mut config = SimConfig::default();
        config.whisper.damage_min = 8.0;
        config.whisper.damage_max = 2.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "whisper.damage_min",
                ..
            })
        ));

        let mut config = SimConfig::default();
        config.run_seconds = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn run_seconds_beyond_duration_range_is_rejected() {
        let mut config = SimConfig::default();
        config.run_seconds = Some(1e300);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "run_seconds",
                ..
            })
        ));
        assert_eq!(config.loop_config().run_for, None);

        config.run_seconds = Some(f64::INFINITY);
        assert!(config.validate().is_err());
        config.run_seconds = Some(86_400.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loop_config_converts_milliseconds() {
        let config = parse_value(json!({
            "target_tps": 30,
            "max_frame_delta_ms": 100,
            "run_seconds": 2.5,
            "realtime": true
        }))
        .expect("parse");
        let loop_config = config.loop_config();

        assert_eq!(loop_config.target_tps, 30);
        assert_eq!(loop_config.max_frame_delta, Duration::from_millis(100));
        assert_eq!(loop_config.run_for, Some(Duration::from_millis(2500)));
        assert!(loop_config.realtime);
    }

    #[test]
    fn load_reads_file_and_reports_missing_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("whisperfield.json");
        fs::write(&path, json!({ "seed": 9, "run_seconds": null }).to_string()).expect("write");

        let config = SimConfig::load(&path).expect("load");
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.run_seconds, None);

        let missing = temp.path().join("missing.json");
        assert!(matches!(
            SimConfig::resolve(Some(missing.as_path())),
            Err(ConfigError::Read { .. })
        ));
    }
}
