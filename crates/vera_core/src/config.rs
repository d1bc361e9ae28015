use crate::error::ConfigError;
use crate::pose::PoseTableKind;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VeraConfig {
    pub bored: BoredConfig,
    pub sneeze: SneezeConfig,
    pub pose: PoseConfig,
    pub gaze: GazeConfig,
    pub lipsync: LipSyncConfig,
    pub wind: WindConfig,
    pub avatar: AvatarConfig,
}

impl VeraConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied and the result validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: VeraConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Try to load from path; if the file is missing or invalid, return
    /// defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                if let Err(e) = cfg.validate() {
                    tracing::warn!("Ignoring env overrides: {}", e);
                    cfg = Self::default();
                }
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VERA_SEED") {
            match v.parse() {
                Ok(seed) => self.avatar.seed = Some(seed),
                Err(_) => tracing::warn!("VERA_SEED is not a u64: {}", v),
            }
        }
        if let Ok(v) = std::env::var("VERA_BORED_TRIGGER_SECS") {
            if let Ok(n) = v.parse() {
                self.bored.trigger_threshold_secs = n;
            }
        }
        if let Ok(v) = std::env::var("VERA_WARMUP_FRAMES") {
            if let Ok(n) = v.parse() {
                self.avatar.warmup_frames = n;
            }
        }
        if let Ok(v) = std::env::var("VERA_LIPSYNC_DECAY_MODE") {
            match v.as_str() {
                "per_frame" => self.lipsync.decay_mode = DecayMode::PerFrame,
                "time_scaled" => self.lipsync.decay_mode = DecayMode::TimeScaled,
                other => tracing::warn!("Unknown VERA_LIPSYNC_DECAY_MODE: {}", other),
            }
        }
    }

    /// Check every tunable the engine divides by, samples from or blends with.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let b = &self.bored;
        positive("bored.trigger_threshold_secs", b.trigger_threshold_secs)?;
        positive("bored.duration_secs", b.duration_secs)?;
        positive("bored.fade_duration_secs", b.fade_duration_secs)?;
        rate("bored.entry_transition_rate", b.entry_transition_rate)?;
        rate("bored.recovery_transition_rate", b.recovery_transition_rate)?;

        let s = &self.sneeze;
        for d in s.phase_durations {
            positive("sneeze.phase_durations", d)?;
        }
        rate("sneeze.build_up_rate", s.build_up_rate)?;
        rate("sneeze.release_rate", s.release_rate)?;
        rate("sneeze.recovery_rate", s.recovery_rate)?;
        rate("sneeze.shy_rate", s.shy_rate)?;

        let p = &self.pose;
        let (lo, hi) = p.change_interval();
        range("pose.change_interval_secs", lo, hi)?;
        let [lo, hi] = p.transition_rate_range;
        range("pose.transition_rate_range", lo, hi)?;
        rate("pose.transition_rate_range", hi)?;

        let g = &self.gaze;
        range("gaze.glance_secs", g.glance_secs[0], g.glance_secs[1])?;
        range("gaze.hold_secs", g.hold_secs[0], g.hold_secs[1])?;
        rate("gaze.smoothing", g.smoothing)?;
        positive("gaze.limit", g.limit)?;
        probability("gaze.up_probability", g.up_probability)?;
        probability("gaze.down_probability", g.down_probability)?;
        if g.up_probability + g.down_probability > 1.0 {
            return Err(ConfigError::GlanceProbabilitiesExceedOne(
                g.up_probability + g.down_probability,
            ));
        }

        let l = &self.lipsync;
        rate("lipsync.attack", l.attack)?;
        probability("lipsync.decay", l.decay)?;
        probability("lipsync.deadzone", l.deadzone)?;
        positive("lipsync.gain", l.gain)?;
        positive("lipsync.reference_fps", l.reference_fps)?;

        positive("wind.gravity_power", self.wind.gravity_power)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn rate(field: &'static str, value: f32) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::RateOutOfRange { field, value })
    }
}

fn range(field: &'static str, min: f32, max: f32) -> std::result::Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min >= 0.0 && min < max {
        Ok(())
    } else {
        Err(ConfigError::InvalidRange { field, min, max })
    }
}

fn probability(field: &'static str, value: f32) -> std::result::Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { field, value })
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

/// Bored/dance episode.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoredConfig {
    /// Seconds without interaction before the dance starts
    pub trigger_threshold_secs: f32,
    pub duration_secs: f32,
    /// Dance rhythm in rad/s
    pub rhythm_speed: f32,
    pub fade_duration_secs: f32,
    /// Blend rate toward neutral when the dance starts
    pub entry_transition_rate: f32,
    /// Blend rate toward neutral when an interaction cancels the dance
    pub recovery_transition_rate: f32,
}

impl Default for BoredConfig {
    fn default() -> Self {
        Self {
            trigger_threshold_secs: 120.0,
            duration_secs: 8.0,
            rhythm_speed: 4.0,
            fade_duration_secs: 2.0,
            entry_transition_rate: 0.04,
            recovery_transition_rate: 0.03,
        }
    }
}

/// Four-phase sneeze: build-up, release, recovery, shy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SneezeConfig {
    pub phase_durations: [f32; 4],
    /// Head pitch at the end of the build-up
    pub build_up_pitch: f32,
    pub build_up_rate: f32,
    pub release_pitch: f32,
    pub release_rate: f32,
    pub recovery_rate: f32,
    pub shy_yaw: f32,
    pub shy_pitch: f32,
    pub shy_rate: f32,
}

impl Default for SneezeConfig {
    fn default() -> Self {
        Self {
            phase_durations: [1.5, 0.2, 0.5, 2.5],
            build_up_pitch: -0.3,
            build_up_rate: 0.1,
            release_pitch: 0.6,
            release_rate: 0.4,
            recovery_rate: 0.05,
            shy_yaw: 0.15,
            shy_pitch: 0.15,
            shy_rate: 0.03,
        }
    }
}

impl SneezeConfig {
    pub fn total_duration(&self) -> f32 {
        self.phase_durations.iter().sum()
    }
}

/// Idle pose selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub table: PoseTableKind,
    /// `[min, max)` seconds between idle pose changes; defaults per table
    pub change_interval_secs: Option<[f32; 2]>,
    /// `[min, max)` band the per-transition blend rate is drawn from
    pub transition_rate_range: [f32; 2],
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            table: PoseTableKind::Full,
            change_interval_secs: None,
            transition_rate_range: [0.012, 0.027],
        }
    }
}

impl PoseConfig {
    pub fn change_interval(&self) -> (f32, f32) {
        match self.change_interval_secs {
            Some([lo, hi]) => (lo, hi),
            None => self.table.default_interval(),
        }
    }
}

/// Eye saccades.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// `[min, max)` duration of a glance excursion
    pub glance_secs: [f32; 2],
    /// `[min, max)` duration of a centered hold
    pub hold_secs: [f32; 2],
    pub smoothing: f32,
    /// Symmetric clamp on both gaze components, radians
    pub limit: f32,
    /// Eye-contact bias factor applied to head yaw
    pub head_yaw_bias: f32,
    pub up_probability: f32,
    pub down_probability: f32,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            glance_secs: [0.5, 1.5],
            hold_secs: [2.0, 5.0],
            smoothing: 0.08,
            limit: 0.08,
            head_yaw_bias: 0.3,
            up_probability: 0.45,
            down_probability: 0.45,
        }
    }
}

/// How mouth openness decays below the amplitude deadzone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayMode {
    /// Constant factor once per frame (frame-rate dependent)
    PerFrame,
    /// Factor raised to `delta * reference_fps` (frame-rate independent)
    #[default]
    TimeScaled,
}

/// Audio-driven mouth.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LipSyncConfig {
    pub deadzone: f32,
    pub gain: f32,
    pub attack: f32,
    pub decay: f32,
    pub joy_weight: f32,
    pub decay_mode: DecayMode,
    pub reference_fps: f32,
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        Self {
            deadzone: 0.02,
            gain: 1.5,
            attack: 0.4,
            decay: 0.8,
            joy_weight: 0.3,
            decay_mode: DecayMode::TimeScaled,
            reference_fps: 60.0,
        }
    }
}

/// Spring-bone forcing and the joint settings written at load.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    pub gravity_power: f32,
    pub stiffness: f32,
    pub drag_force: f32,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            gravity_power: 0.4,
            stiffness: 1.2,
            drag_force: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Frames after load during which only the rig's own update runs
    pub warmup_frames: u32,
    /// Fixed RNG seed; entropy when absent
    pub seed: Option<u64>,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            warmup_frames: 30,
            seed: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = VeraConfig::default();
        assert_eq!(cfg.bored.trigger_threshold_secs, 120.0);
        assert_eq!(cfg.sneeze.phase_durations, [1.5, 0.2, 0.5, 2.5]);
        assert!((cfg.sneeze.total_duration() - 4.7).abs() < 1e-6);
        assert_eq!(cfg.pose.change_interval(), (2.5, 6.5));
        assert_eq!(cfg.lipsync.decay_mode, DecayMode::TimeScaled);
        assert_eq!(cfg.avatar.warmup_frames, 30);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[bored]
trigger_threshold_secs = 30.0

[pose]
table = "head_only"
"#;
        let cfg: VeraConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.bored.trigger_threshold_secs, 30.0);
        // Defaults for unspecified fields
        assert_eq!(cfg.bored.duration_secs, 8.0);
        assert_eq!(cfg.pose.table, PoseTableKind::HeadOnly);
        assert_eq!(cfg.pose.change_interval(), (2.0, 6.0));
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[bored]
trigger_threshold_secs = 60.0
duration_secs = 10.0
rhythm_speed = 5.0
fade_duration_secs = 1.5

[sneeze]
phase_durations = [1.0, 0.3, 0.5, 2.0]
release_pitch = 0.5

[pose]
table = "full"
change_interval_secs = [1.0, 2.0]
transition_rate_range = [0.02, 0.05]

[gaze]
glance_secs = [0.4, 1.0]
hold_secs = [1.5, 4.0]
smoothing = 0.1

[lipsync]
decay_mode = "per_frame"
deadzone = 0.05

[wind]
gravity_power = 0.6

[avatar]
warmup_frames = 10
seed = 42
"#;
        let cfg: VeraConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.bored.rhythm_speed, 5.0);
        assert!((cfg.sneeze.total_duration() - 3.8).abs() < 1e-6);
        assert_eq!(cfg.pose.change_interval(), (1.0, 2.0));
        assert_eq!(cfg.gaze.smoothing, 0.1);
        assert_eq!(cfg.lipsync.decay_mode, DecayMode::PerFrame);
        assert_eq!(cfg.wind.gravity_power, 0.6);
        assert_eq!(cfg.avatar.seed, Some(42));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = VeraConfig::default();
        cfg.bored.fade_duration_secs = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositive {
                field: "bored.fade_duration_secs",
                ..
            })
        ));

        let mut cfg = VeraConfig::default();
        cfg.sneeze.release_rate = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RateOutOfRange { .. })
        ));

        let mut cfg = VeraConfig::default();
        cfg.gaze.hold_secs = [5.0, 2.0];
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidRange { .. })));

        let mut cfg = VeraConfig::default();
        cfg.gaze.up_probability = 0.7;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::GlanceProbabilitiesExceedOne(_))
        ));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = std::env::temp_dir().join(format!("vera_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "[bored]\nduration_secs = -1.0\n").unwrap();

        let err = VeraConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("bored.duration_secs"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_env_overrides_and_defaults() {
        // Part 1: env overrides
        std::env::set_var("VERA_SEED", "7");
        std::env::set_var("VERA_LIPSYNC_DECAY_MODE", "per_frame");

        let mut cfg = VeraConfig::default();
        cfg.apply_env_overrides();

        assert_eq!(cfg.avatar.seed, Some(7));
        assert_eq!(cfg.lipsync.decay_mode, DecayMode::PerFrame);

        // Clean up env vars before testing defaults
        std::env::remove_var("VERA_SEED");
        std::env::remove_var("VERA_LIPSYNC_DECAY_MODE");

        // Part 2: nonexistent path returns defaults (no env interference)
        let cfg = VeraConfig::load_or_default("/nonexistent/path.toml");
        assert_eq!(cfg.avatar.seed, None);
        assert_eq!(cfg.bored.trigger_threshold_secs, 120.0);
    }
}
