//! Configuration: persisted settings plus the immutable run snapshot.

mod enhance;
mod manager;
mod settings;

pub use enhance::{
    ConcurrencyPolicy, EnhanceConfig, SpatialModelSettings, TemporalModelSettings,
};
pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{EnhanceSettings, PathSettings, Settings, ToolSettings};
