//! Application settings with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! The pipeline never reads these directly; front ends load them, derive an
//! [`EnhanceConfig`](super::EnhanceConfig) snapshot, and pass that in.

use serde::{Deserialize, Serialize};

use super::enhance::{ConcurrencyPolicy, EnhanceConfig};
use crate::models::{InterpolationFactor, ScaleFactor};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Model tooling settings.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Enhancement defaults.
    #[serde(default)]
    pub enhance: EnhanceSettings,
}

/// Path configuration for output, scratch, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Output folder for enhanced files.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for scratch storage.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_folder() -> String {
    "enhanced".to_string()
}

fn default_temp_root() -> String {
    ".forge_temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Locations of the external tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Directory the model executables are installed under. Empty means
    /// resolve from PATH.
    #[serde(default)]
    pub install_dir: String,

    /// ffmpeg executable override. Empty means "ffmpeg" from PATH.
    #[serde(default)]
    pub ffmpeg: String,

    /// ffprobe executable override. Empty means "ffprobe" from PATH.
    #[serde(default)]
    pub ffprobe: String,
}

/// Enhancement defaults applied when the caller does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceSettings {
    /// Default spatial model id.
    #[serde(default = "default_spatial_model")]
    pub spatial_model: String,

    /// Default temporal model id.
    #[serde(default = "default_temporal_model")]
    pub temporal_model: String,

    /// Default spatial scale factor.
    #[serde(default)]
    pub scale: ScaleFactor,

    /// Default interpolation factor.
    #[serde(default)]
    pub factor: InterpolationFactor,

    /// Maximum frames per video segment.
    #[serde(default = "default_max_frames")]
    pub max_frames_per_segment: usize,

    /// Whether jobs may run concurrently.
    #[serde(default = "default_true")]
    pub concurrency: bool,

    /// Worker cap when concurrency is enabled (0 = auto).
    #[serde(default)]
    pub workers: usize,

    /// Keep scratch in the OS temp dir.
    #[serde(default)]
    pub memory_only: bool,
}

fn default_spatial_model() -> String {
    "realesrgan".to_string()
}

fn default_temporal_model() -> String {
    "rife".to_string()
}

fn default_max_frames() -> usize {
    2000
}

fn default_true() -> bool {
    true
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            spatial_model: default_spatial_model(),
            temporal_model: default_temporal_model(),
            scale: ScaleFactor::default(),
            factor: InterpolationFactor::default(),
            max_frames_per_segment: default_max_frames(),
            concurrency: true,
            workers: 0,
            memory_only: false,
        }
    }
}

impl Settings {
    /// Derive an immutable run snapshot from these settings.
    pub fn to_enhance_config(&self) -> EnhanceConfig {
        let mut policy = ConcurrencyPolicy {
            enabled: self.enhance.concurrency,
            ..ConcurrencyPolicy::default()
        };
        if self.enhance.workers > 0 {
            policy.workers = self.enhance.workers;
        }

        let mut config = EnhanceConfig::new(
            self.enhance.spatial_model.clone(),
            self.enhance.temporal_model.clone(),
        )
        .with_max_frames_per_segment(self.enhance.max_frames_per_segment)
        .with_concurrency(policy)
        .with_memory_only(self.enhance.memory_only)
        .with_temp_root(&self.paths.temp_root);

        let spatial = config.spatial_model.clone();
        let temporal = config.temporal_model.clone();
        config = config.with_spatial_settings(
            spatial,
            super::enhance::SpatialModelSettings {
                scale: self.enhance.scale,
                tta: false,
            },
        );
        config.with_temporal_settings(
            temporal,
            super::enhance::TemporalModelSettings {
                factor: self.enhance.factor,
                tta: false,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[enhance]"));
        assert!(toml.contains("output_folder"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.paths.temp_root, settings.paths.temp_root);
        assert_eq!(parsed.enhance.spatial_model, settings.enhance.spatial_model);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[enhance]\nspatial_model = \"waifu2x\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.enhance.spatial_model, "waifu2x");
        assert_eq!(parsed.enhance.max_frames_per_segment, 2000);
        assert!(parsed.enhance.concurrency);
    }

    #[test]
    fn enhance_config_inherits_defaults() {
        let mut settings = Settings::default();
        settings.enhance.scale = ScaleFactor::X4;
        settings.enhance.concurrency = false;

        let config = settings.to_enhance_config();
        assert_eq!(config.spatial().scale, ScaleFactor::X4);
        assert_eq!(config.concurrency.cap(), 1);
        assert_eq!(config.max_frames_per_segment, 2000);
    }
}
