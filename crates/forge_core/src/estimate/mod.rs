//! Advisory cost estimation.
//!
//! Wraps opaque regression predictors to produce a human-readable time and
//! size estimate for a batch before it runs. Estimates never gate
//! execution; an item whose frames cannot be probed simply contributes
//! nothing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::codec::FrameCodec;
use crate::config::EnhanceConfig;
use crate::models::{MediaItem, MediaKind, MediaSource};

/// Opaque regression predictor over named numeric features.
///
/// Training and loading are entirely the collaborator's concern; `None`
/// means the model has no usable prediction for these inputs.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &HashMap<String, f64>) -> Option<f64>;
}

/// Build the feature map predictors receive.
fn features(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

/// Batch-level advisory estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostSummary {
    /// Estimated output size of the largest item, in bytes.
    pub output_bytes: Option<u64>,
    /// Estimated wall-clock time of the slowest item.
    pub wall_time: Option<Duration>,
}

impl std::fmt::Display for CostSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size = self
            .output_bytes
            .map(format_bytes)
            .unwrap_or_else(|| "unknown".to_string());
        let time = self
            .wall_time
            .map(format_duration)
            .unwrap_or_else(|| "unknown".to_string());
        write!(f, "output ~ {}, time ~ {}", size, time)
    }
}

/// Estimator over the black-box size and time predictors.
pub struct CostEstimator {
    codec: Arc<dyn FrameCodec>,
    size_model: Option<Arc<dyn Predictor>>,
    time_model: Option<Arc<dyn Predictor>>,
}

impl CostEstimator {
    /// Estimator with no predictors (always reports unknown).
    pub fn new(codec: Arc<dyn FrameCodec>) -> Self {
        Self {
            codec,
            size_model: None,
            time_model: None,
        }
    }

    /// Attach a per-frame output-size predictor.
    pub fn with_size_model(mut self, model: Arc<dyn Predictor>) -> Self {
        self.size_model = Some(model);
        self
    }

    /// Attach a per-item duration predictor.
    pub fn with_time_model(mut self, model: Arc<dyn Predictor>) -> Self {
        self.time_model = Some(model);
        self
    }

    /// Estimate a whole batch under the given configuration.
    pub fn estimate(&self, config: &EnhanceConfig, items: &[MediaItem]) -> CostSummary {
        let scale = config.spatial().scale.multiplier();
        let frame_budget = config.max_frames_per_segment as u64;
        let concurrency = config.concurrency.cap();

        let mut summary = CostSummary {
            output_bytes: self.estimate_size(items, frame_budget, scale),
            wall_time: None,
        };

        for item in items {
            let Some((width, height)) = self.dimensions(item) else {
                continue;
            };
            if let Some(time) = self.estimate_time(width, height, concurrency) {
                summary.wall_time = Some(summary.wall_time.map_or(time, |t| t.max(time)));
            }
        }

        summary
    }

    /// Estimated output size in bytes: per-frame prediction at output
    /// dimensions, multiplied by `min(frame_rate x duration, frame_budget)`
    /// frames, maximum across items. `None` when no item yields a usable
    /// prediction.
    pub fn estimate_size(
        &self,
        items: &[MediaItem],
        frame_budget: u64,
        scale: u32,
    ) -> Option<u64> {
        let size_model = self.size_model.as_ref()?;
        let mut best: Option<u64> = None;

        for item in items {
            let Some((width, height)) = self.dimensions(item) else {
                tracing::debug!("Skipping size estimate for {}", item.display_name());
                continue;
            };

            let frames = match (item.kind, self.probe_item(item)) {
                (MediaKind::Image, _) => 1,
                (MediaKind::Video, Some(info)) => {
                    let projected = (info.frame_rate * info.duration_secs).round() as u64;
                    projected.clamp(1, frame_budget)
                }
                (MediaKind::Video, None) => continue,
            };

            let per_frame = size_model.predict(&features(&[
                ("width", f64::from(width * scale)),
                ("height", f64::from(height * scale)),
            ]));
            let Some(per_frame) = per_frame.filter(|v| v.is_finite() && *v > 0.0) else {
                continue;
            };

            let total = (per_frame * frames as f64).round() as u64;
            best = Some(best.map_or(total, |b| b.max(total)));
        }

        best
    }

    /// Estimated wall-clock duration for one item's dimensions under the
    /// given concurrency.
    pub fn estimate_time(&self, width: u32, height: u32, concurrency: usize) -> Option<Duration> {
        let time_model = self.time_model.as_ref()?;
        let secs = time_model.predict(&features(&[
            ("width", f64::from(width)),
            ("height", f64::from(height)),
            ("concurrency", concurrency as f64),
        ]))?;
        (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
    }

    fn probe_item(&self, item: &MediaItem) -> Option<crate::codec::VideoInfo> {
        match (&item.source, item.kind) {
            (MediaSource::Path(path), MediaKind::Video) => self.codec.probe(path).ok(),
            _ => None,
        }
    }

    fn dimensions(&self, item: &MediaItem) -> Option<(u32, u32)> {
        match (&item.source, item.kind) {
            (MediaSource::Path(path), MediaKind::Image) => image_dimensions(path),
            (MediaSource::Path(path), MediaKind::Video) => {
                self.codec.probe(path).ok().map(|info| (info.width, info.height))
            }
            (MediaSource::Memory { data, .. }, MediaKind::Image) => {
                use image::GenericImageView;
                image::load_from_memory(data).ok().map(|img| img.dimensions())
            }
            (MediaSource::Memory { .. }, MediaKind::Video) => None,
        }
    }
}

fn image_dimensions(path: &Path) -> Option<(u32, u32)> {
    image::image_dimensions(path).ok()
}

/// Render a byte count with a binary-unit suffix.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Render a duration as hours/minutes/seconds.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, CodecResult, VideoInfo};
    use std::path::PathBuf;

    struct FixedPredictor(f64);

    impl Predictor for FixedPredictor {
        fn predict(&self, _features: &HashMap<String, f64>) -> Option<f64> {
            Some(self.0)
        }
    }

    struct NoPredictor;

    impl Predictor for NoPredictor {
        fn predict(&self, _features: &HashMap<String, f64>) -> Option<f64> {
            None
        }
    }

    /// Codec that probes a fixed video regardless of path.
    struct FixedCodec {
        info: Option<VideoInfo>,
    }

    impl FrameCodec for FixedCodec {
        fn probe(&self, video: &Path) -> CodecResult<VideoInfo> {
            self.info
                .clone()
                .ok_or_else(|| CodecError::probe(video, "undecodable"))
        }
        fn extract_frame(&self, _: &Path, _: u64, _: &Path) -> CodecResult<()> {
            unreachable!("estimator never extracts")
        }
        fn compose_video(&self, _: &[PathBuf], _: f64, _: &Path) -> CodecResult<()> {
            unreachable!("estimator never composes")
        }
        fn concat(&self, _: &[PathBuf], _: &Path) -> CodecResult<()> {
            unreachable!("estimator never concatenates")
        }
    }

    fn video_codec(frames: u64, rate: f64, secs: f64) -> Arc<dyn FrameCodec> {
        Arc::new(FixedCodec {
            info: Some(VideoInfo {
                frames,
                frame_rate: rate,
                width: 640,
                height: 360,
                duration_secs: secs,
            }),
        })
    }

    #[test]
    fn size_is_bounded_by_frame_budget() {
        // 24 fps x 100 s = 2400 projected frames, capped at 2000.
        let estimator =
            CostEstimator::new(video_codec(2400, 24.0, 100.0)).with_size_model(Arc::new(FixedPredictor(10.0)));

        let items = vec![MediaItem::video("/in/clip.mkv", "/out/clip.mkv")];
        let size = estimator.estimate_size(&items, 2000, 2);
        assert_eq!(size, Some(20_000));
    }

    #[test]
    fn size_uses_projection_when_under_budget() {
        let estimator =
            CostEstimator::new(video_codec(240, 24.0, 10.0)).with_size_model(Arc::new(FixedPredictor(10.0)));

        let items = vec![MediaItem::video("/in/clip.mkv", "/out/clip.mkv")];
        let size = estimator.estimate_size(&items, 2000, 2);
        assert_eq!(size, Some(2_400));
    }

    #[test]
    fn undecodable_items_yield_none() {
        let estimator = CostEstimator::new(Arc::new(FixedCodec { info: None }))
            .with_size_model(Arc::new(FixedPredictor(10.0)));

        let items = vec![MediaItem::video("/in/broken.mkv", "/out/broken.mkv")];
        assert_eq!(estimator.estimate_size(&items, 2000, 2), None);

        let config = crate::config::EnhanceConfig::new("realesrgan", "rife");
        let summary = estimator.estimate(&config, &items);
        assert_eq!(summary.output_bytes, None);
        assert_eq!(summary.wall_time, None);
    }

    #[test]
    fn predictor_without_output_yields_none() {
        let estimator =
            CostEstimator::new(video_codec(240, 24.0, 10.0)).with_size_model(Arc::new(NoPredictor));
        let items = vec![MediaItem::video("/in/clip.mkv", "/out/clip.mkv")];
        assert_eq!(estimator.estimate_size(&items, 2000, 2), None);
    }

    #[test]
    fn time_converts_seconds() {
        let estimator =
            CostEstimator::new(video_codec(1, 1.0, 1.0)).with_time_model(Arc::new(FixedPredictor(90.0)));
        let time = estimator.estimate_time(1920, 1080, 4).unwrap();
        assert_eq!(time, Duration::from_secs(90));
        assert_eq!(format_duration(time), "1m 30s");
    }

    #[test]
    fn summary_formats_unknowns() {
        let summary = CostSummary::default();
        assert_eq!(summary.to_string(), "output ~ unknown, time ~ unknown");

        let summary = CostSummary {
            output_bytes: Some(3 * 1024 * 1024),
            wall_time: Some(Duration::from_secs(4000)),
        };
        assert_eq!(summary.to_string(), "output ~ 3.0 MiB, time ~ 1h 06m");
    }

    #[test]
    fn byte_formatting_picks_unit() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GiB");
    }
}
