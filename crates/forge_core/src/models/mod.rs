//! Data model shared across the pipeline.

mod enums;
mod job;
mod media;

pub use enums::{InterpolationFactor, ItemPhase, MediaKind, ModelFamily, ScaleFactor};
pub use job::{remove_partial_output, Job, JobOutcome};
pub use media::{MediaItem, MediaSource};
