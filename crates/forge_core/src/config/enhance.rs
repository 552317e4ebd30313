//! Immutable per-run configuration snapshot.
//!
//! A pipeline invocation receives one `EnhanceConfig` value and never
//! mutates it; there is no process-wide configuration state. Each model
//! keeps its own settings struct, so switching the chosen model never
//! disturbs another model's stored parameters.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::{InterpolationFactor, ScaleFactor};

/// Per-model spatial settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialModelSettings {
    /// Enlargement factor (power of two).
    #[serde(default)]
    pub scale: ScaleFactor,
    /// Test-time augmentation (slower, slightly better output).
    #[serde(default)]
    pub tta: bool,
}

/// Per-model temporal settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalModelSettings {
    /// Interpolation factor.
    #[serde(default)]
    pub factor: InterpolationFactor,
    /// Test-time augmentation.
    #[serde(default)]
    pub tta: bool,
}

/// Concurrency policy for the shared job budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyPolicy {
    /// Whether jobs may run concurrently at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Worker cap when concurrency is enabled.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for ConcurrencyPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: default_workers(),
        }
    }
}

impl ConcurrencyPolicy {
    /// Effective budget capacity: `workers` when enabled, one in-flight job
    /// when disabled.
    pub fn cap(&self) -> usize {
        if self.enabled {
            self.workers.max(1)
        } else {
            1
        }
    }
}

fn default_max_frames() -> usize {
    2000
}

fn default_temp_root() -> PathBuf {
    PathBuf::from(".forge_temp")
}

/// Immutable snapshot of everything one batch run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceConfig {
    /// Chosen spatial model id (catalog name).
    pub spatial_model: String,
    /// Chosen temporal model id (catalog name).
    pub temporal_model: String,
    /// Stored spatial settings, keyed by model id.
    #[serde(default)]
    pub spatial_settings: HashMap<String, SpatialModelSettings>,
    /// Stored temporal settings, keyed by model id.
    #[serde(default)]
    pub temporal_settings: HashMap<String, TemporalModelSettings>,
    /// Frame cap per video segment; bounds scratch usage per segment.
    #[serde(default = "default_max_frames")]
    pub max_frames_per_segment: usize,
    /// Shared job concurrency policy.
    #[serde(default)]
    pub concurrency: ConcurrencyPolicy,
    /// Route scratch storage to the OS temp dir instead of `temp_root`.
    #[serde(default)]
    pub memory_only: bool,
    /// Root directory for scratch storage.
    #[serde(default = "default_temp_root")]
    pub temp_root: PathBuf,
}

impl EnhanceConfig {
    /// Create a config with the given model selections and defaults for
    /// everything else.
    pub fn new(spatial_model: impl Into<String>, temporal_model: impl Into<String>) -> Self {
        Self {
            spatial_model: spatial_model.into(),
            temporal_model: temporal_model.into(),
            spatial_settings: HashMap::new(),
            temporal_settings: HashMap::new(),
            max_frames_per_segment: default_max_frames(),
            concurrency: ConcurrencyPolicy::default(),
            memory_only: false,
            temp_root: default_temp_root(),
        }
    }

    /// Settings of the chosen spatial model (defaults if never stored).
    pub fn spatial(&self) -> SpatialModelSettings {
        self.spatial_settings
            .get(&self.spatial_model)
            .copied()
            .unwrap_or_default()
    }

    /// Settings of the chosen temporal model (defaults if never stored).
    pub fn temporal(&self) -> TemporalModelSettings {
        self.temporal_settings
            .get(&self.temporal_model)
            .copied()
            .unwrap_or_default()
    }

    /// Store settings for a spatial model without selecting it.
    pub fn with_spatial_settings(
        mut self,
        model: impl Into<String>,
        settings: SpatialModelSettings,
    ) -> Self {
        self.spatial_settings.insert(model.into(), settings);
        self
    }

    /// Store settings for a temporal model without selecting it.
    pub fn with_temporal_settings(
        mut self,
        model: impl Into<String>,
        settings: TemporalModelSettings,
    ) -> Self {
        self.temporal_settings.insert(model.into(), settings);
        self
    }

    /// Change the spatial selection. Stored settings of other models are
    /// untouched.
    pub fn select_spatial(mut self, model: impl Into<String>) -> Self {
        self.spatial_model = model.into();
        self
    }

    /// Change the temporal selection. Stored settings of other models are
    /// untouched.
    pub fn select_temporal(mut self, model: impl Into<String>) -> Self {
        self.temporal_model = model.into();
        self
    }

    /// Set the segment frame cap.
    pub fn with_max_frames_per_segment(mut self, max: usize) -> Self {
        self.max_frames_per_segment = max.max(1);
        self
    }

    /// Set the concurrency policy.
    pub fn with_concurrency(mut self, policy: ConcurrencyPolicy) -> Self {
        self.concurrency = policy;
        self
    }

    /// Set the scratch root.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    /// Enable or disable memory-only scratch.
    pub fn with_memory_only(mut self, memory_only: bool) -> Self {
        self.memory_only = memory_only;
        self
    }

    /// Effective scratch root for this run.
    pub fn scratch_root(&self) -> PathBuf {
        if self.memory_only {
            std::env::temp_dir().join("frameforge")
        } else {
            self.temp_root.clone()
        }
    }
}
