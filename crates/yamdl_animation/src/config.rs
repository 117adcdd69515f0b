//! Motion configuration (motion.toml)
//!
//! Every field is optional in the file. Keys may sit at the top level or under
//! a `[motion]` table, so the same document can be embedded in a larger app
//! configuration:
//!
//! ```toml
//! [motion]
//! keyframe_horizon = 1.0
//! animation_speed = 0.5
//!
//! [motion.spring]
//! damping_ratio = 1.0
//! period = 0.3
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use yamdl_core::FALLBACK_FRAME_INTERVAL;

use crate::spring::{SpringConfig, DEFAULT_TOLERANCE};

/// File looked up when loading from a directory
pub const CONFIG_FILE_NAME: &str = "motion.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid TOML or has fields of the wrong type
    #[error("Failed to parse motion config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize motion config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("Invalid motion config: `{field}` {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Tunables shared by the scheduler, springs, and keyframe bridges
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MotionConfig {
    /// How far ahead the bridge samples, in seconds
    #[serde(default = "default_keyframe_horizon")]
    pub keyframe_horizon: f64,
    /// Time between bridge samples, in seconds
    #[serde(default = "default_keyframe_step")]
    pub keyframe_step: f64,
    /// Rest threshold for new springs
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Multiplier applied to every frame's delta time
    #[serde(default = "default_animation_speed")]
    pub animation_speed: f64,
    /// Frame interval when the host has no refresh callback
    #[serde(default = "default_fallback_frame_interval_ms")]
    pub fallback_frame_interval_ms: u64,
    #[serde(default)]
    pub spring: SpringConfig,
}

fn default_keyframe_horizon() -> f64 {
    1.0
}

fn default_keyframe_step() -> f64 {
    1.0 / 60.0
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_animation_speed() -> f64 {
    1.0
}

fn default_fallback_frame_interval_ms() -> u64 {
    FALLBACK_FRAME_INTERVAL.as_millis() as u64
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            keyframe_horizon: default_keyframe_horizon(),
            keyframe_step: default_keyframe_step(),
            tolerance: default_tolerance(),
            animation_speed: default_animation_speed(),
            fallback_frame_interval_ms: default_fallback_frame_interval_ms(),
            spring: SpringConfig::default(),
        }
    }
}

impl MotionConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut table: toml::Table = content.parse()?;
        let table = match table.remove("motion") {
            Some(toml::Value::Table(motion)) => motion,
            Some(other) => {
                table.insert("motion".to_string(), other);
                table
            }
            None => table,
        };

        let config: MotionConfig = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, or from `motion.toml` inside a directory
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_path = if path.is_dir() {
            path.join(CONFIG_FILE_NAME)
        } else {
            path.to_path_buf()
        };

        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
            path: config_path.clone(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %config_path.display(), "MotionConfig: loaded");
        Ok(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.keyframe_horizon.is_finite() && self.keyframe_horizon > 0.0) {
            return Err(invalid("keyframe_horizon", "must be a positive number of seconds"));
        }
        if !(self.keyframe_step > 0.0 && self.keyframe_step <= self.keyframe_horizon) {
            return Err(invalid(
                "keyframe_step",
                format!("must be in (0, {}]", self.keyframe_horizon),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(invalid("tolerance", "must be non-negative"));
        }
        if !(self.animation_speed.is_finite() && self.animation_speed >= 0.0) {
            return Err(invalid("animation_speed", "must be non-negative"));
        }
        if self.fallback_frame_interval_ms == 0 {
            return Err(invalid("fallback_frame_interval_ms", "must be at least 1"));
        }
        if !(self.spring.period.is_finite() && self.spring.period > 0.0) {
            return Err(invalid("spring.period", "must be a positive number of seconds"));
        }
        if !(self.spring.damping_ratio.is_finite() && self.spring.damping_ratio >= 0.0) {
            return Err(invalid("spring.damping_ratio", "must be non-negative"));
        }
        Ok(())
    }

    pub fn fallback_frame_interval(&self) -> Duration {
        Duration::from_millis(self.fallback_frame_interval_ms)
    }

    /// Number of samples a bridge takes per resolve at most
    pub fn samples_per_resolve(&self) -> usize {
        sample_count(self.keyframe_horizon, self.keyframe_step)
    }
}

/// Number of samples covering `horizon` at `step` spacing, at least one
pub(crate) fn sample_count(horizon: f64, step: f64) -> usize {
    if !(horizon > 0.0 && step > 0.0) {
        tracing::warn!(horizon, step, "empty keyframe horizon, sampling once");
        return 1;
    }
    // Guard against 1.0 / (1/60) landing a hair above an integer
    ((horizon / step) - 1e-9).ceil().max(1.0) as usize
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = MotionConfig::from_toml_str("").unwrap();
        assert_eq!(config, MotionConfig::default());
        assert_eq!(config.samples_per_resolve(), 60);
        assert_eq!(config.fallback_frame_interval(), FALLBACK_FRAME_INTERVAL);
        assert_eq!(config.fallback_frame_interval_ms, 16);
        assert_eq!(config.spring, SpringConfig::presence());
    }

    #[test]
    fn test_top_level_keys() {
        let config = MotionConfig::from_toml_str(
            r#"
            keyframe_horizon = 2.0
            animation_speed = 0.5

            [spring]
            period = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.keyframe_horizon, 2.0);
        assert_eq!(config.animation_speed, 0.5);
        assert_eq!(config.spring, SpringConfig::new(1.0, 0.5));
        assert_eq!(config.keyframe_step, 1.0 / 60.0);
    }

    #[test]
    fn test_motion_table() {
        let config = MotionConfig::from_toml_str(
            r#"
            [app]
            name = "demo"

            [motion]
            tolerance = 0.01

            [motion.spring]
            damping_ratio = 0.7
            "#,
        )
        .unwrap();
        assert_eq!(config.tolerance, 0.01);
        assert_eq!(config.spring.damping_ratio, 0.7);
        assert_eq!(config.spring.period, 0.3);
    }

    #[test]
    fn test_rejects_non_positive_step() {
        let err = MotionConfig::from_toml_str("keyframe_step = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "keyframe_step", .. }));

        let err = MotionConfig::from_toml_str("keyframe_step = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "keyframe_step", .. }));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let cases = [
            ("keyframe_horizon = 0.0", "keyframe_horizon"),
            ("keyframe_step = 2.0", "keyframe_step"),
            ("tolerance = -0.1", "tolerance"),
            ("animation_speed = -1.0", "animation_speed"),
            ("fallback_frame_interval_ms = 0", "fallback_frame_interval_ms"),
            ("[spring]\nperiod = 0.0", "spring.period"),
            ("[spring]\ndamping_ratio = -0.5", "spring.damping_ratio"),
        ];
        for (doc, expected) in cases {
            match MotionConfig::from_toml_str(doc) {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected, "{}", doc),
                other => panic!("{}: expected Invalid, got {:?}", doc, other),
            }
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            MotionConfig::from_toml_str("keyframe_step = "),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            MotionConfig::from_toml_str("tolerance = \"small\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_to_toml_reloads() {
        let config = MotionConfig {
            animation_speed: 0.25,
            spring: SpringConfig::ripple_hold(),
            ..MotionConfig::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(MotionConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = std::env::temp_dir().join(format!("yamdl-motion-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CONFIG_FILE_NAME), "[motion]\nanimation_speed = 2.0\n").unwrap();

        let from_dir = MotionConfig::load(&dir).unwrap();
        let from_file = MotionConfig::load(dir.join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(from_dir.animation_speed, 2.0);
        assert_eq!(from_dir, from_file);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = MotionConfig::load("/nonexistent/yamdl/motion.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("motion.toml"));
    }
}
