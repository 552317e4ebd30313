//! Batch coordinator.
//!
//! Wires segmentation, the optional interpolation stage, the upscale
//! stage, and re-assembly; owns scratch-directory lifecycle and the shared
//! concurrency budget; and resolves every submitted item to exactly one
//! report, delivered as the item finishes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use thiserror::Error;

use crate::catalog::{CatalogError, ModelBackend, ModelCatalog, ModelParams};
use crate::codec::{CodecError, FrameCodec};
use crate::config::EnhanceConfig;
use crate::estimate::{CostEstimator, CostSummary};
use crate::logging::RunLog;
use crate::models::{ItemPhase, MediaItem, MediaKind, MediaSource, ModelFamily};
use crate::runner::{CancelToken, ConcurrencyBudget, ProcessRunner, RunJob};
use crate::segment::{plan_segments, ScratchDir, Segment};
use crate::stages::{self, StageContext};

use super::errors::ItemError;
use super::handle::BatchHandle;
use super::types::{ItemReport, ProgressCallback};

static NEXT_BATCH: AtomicU64 = AtomicU64::new(0);

/// Errors rejecting a batch before any item is processed.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The configured model selection could not be resolved.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The scratch root could not be created.
    #[error("Failed to create scratch root {path}: {source}")]
    ScratchRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The run log could not be created.
    #[error("Failed to create run log: {0}")]
    RunLog(io::Error),

    /// The batch driver thread could not be spawned.
    #[error("Failed to spawn batch driver: {0}")]
    Spawn(io::Error),
}

/// Pipeline coordinator: the caller-facing surface of the core.
pub struct Coordinator {
    config: EnhanceConfig,
    catalog: Arc<ModelCatalog>,
    codec: Arc<dyn FrameCodec>,
    runner: Arc<dyn RunJob>,
    /// One budget for every batch this coordinator runs; jobs from
    /// overlapping batches contend for the same slots.
    budget: Arc<ConcurrencyBudget>,
    estimator: Option<Arc<CostEstimator>>,
    progress: Option<Arc<ProgressCallback>>,
    log_dir: Option<PathBuf>,
}

impl Coordinator {
    /// Coordinator over the given configuration snapshot, model catalog,
    /// and frame codec, executing jobs with the process runner.
    pub fn new(
        config: EnhanceConfig,
        catalog: Arc<ModelCatalog>,
        codec: Arc<dyn FrameCodec>,
    ) -> Self {
        let budget = Arc::new(ConcurrencyBudget::new(config.concurrency.cap()));
        Self {
            config,
            catalog,
            codec,
            runner: Arc::new(ProcessRunner::new()),
            budget,
            estimator: None,
            progress: None,
            log_dir: None,
        }
    }

    /// Substitute the job executor (tests use scripted runners).
    pub fn with_runner(mut self, runner: Arc<dyn RunJob>) -> Self {
        self.runner = runner;
        self
    }

    /// Attach an advisory cost estimator.
    pub fn with_estimator(mut self, estimator: Arc<CostEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Attach a per-item phase progress callback.
    pub fn with_progress(
        mut self,
        callback: impl Fn(usize, ItemPhase) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Write a per-batch run log under this directory.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Advisory cost estimate for a batch; never gates execution.
    pub fn estimate(&self, items: &[MediaItem]) -> CostSummary {
        match &self.estimator {
            Some(estimator) => estimator.estimate(&self.config, items),
            None => CostSummary::default(),
        }
    }

    /// Submit a batch. Returns a handle yielding one report per item in
    /// completion order.
    ///
    /// Model resolution and scratch-root creation happen up front; item
    /// processing runs on background threads sharing one job budget.
    pub fn submit(&self, items: Vec<MediaItem>) -> Result<BatchHandle, SubmitError> {
        let spatial = self
            .catalog
            .resolve(&self.config.spatial_model, ModelFamily::Spatial)?;

        let wants_interpolation = !self.config.temporal().factor.is_identity()
            && items.iter().any(|item| item.kind == MediaKind::Video);
        let temporal = if wants_interpolation {
            Some(
                self.catalog
                    .resolve(&self.config.temporal_model, ModelFamily::Temporal)?,
            )
        } else {
            None
        };

        let scratch_root = self.config.scratch_root();
        fs::create_dir_all(&scratch_root).map_err(|source| SubmitError::ScratchRoot {
            path: scratch_root.clone(),
            source,
        })?;

        let batch_name = format!(
            "batch_p{}_{:04}",
            std::process::id(),
            NEXT_BATCH.fetch_add(1, Ordering::SeqCst)
        );

        let run_log = match &self.log_dir {
            Some(dir) => Some(Arc::new(
                RunLog::new(&batch_name, dir).map_err(SubmitError::RunLog)?,
            )),
            None => None,
        };

        let cancel = CancelToken::new();
        let worker = BatchWorker {
            config: self.config.clone(),
            spatial,
            temporal,
            codec: Arc::clone(&self.codec),
            runner: Arc::clone(&self.runner),
            budget: Arc::clone(&self.budget),
            progress: self.progress.clone(),
            run_log,
            cancel: cancel.clone(),
            scratch_root,
            batch_name: batch_name.clone(),
        };

        let (tx, rx) = mpsc::channel();
        let driver = thread::Builder::new()
            .name(batch_name)
            .spawn(move || worker.run(items, tx))
            .map_err(SubmitError::Spawn)?;

        Ok(BatchHandle::new(rx, cancel, driver))
    }
}

/// Everything one batch run owns.
struct BatchWorker {
    config: EnhanceConfig,
    spatial: Arc<dyn ModelBackend>,
    temporal: Option<Arc<dyn ModelBackend>>,
    codec: Arc<dyn FrameCodec>,
    runner: Arc<dyn RunJob>,
    budget: Arc<ConcurrencyBudget>,
    progress: Option<Arc<ProgressCallback>>,
    run_log: Option<Arc<RunLog>>,
    cancel: CancelToken,
    scratch_root: PathBuf,
    batch_name: String,
}

impl BatchWorker {
    fn run(self, items: Vec<MediaItem>, tx: mpsc::Sender<ItemReport>) {
        self.log(&format!(
            "Starting {}: {} item(s), budget {}",
            self.batch_name,
            items.len(),
            self.budget.capacity()
        ));

        thread::scope(|scope| {
            for (index, item) in items.into_iter().enumerate() {
                let tx = tx.clone();
                let worker = &self;
                scope.spawn(move || {
                    let report = worker.process_item(index, item);
                    match &report.outcome {
                        super::ItemOutcome::Completed {
                            output,
                            degraded_frames,
                        } => worker.log(&format!(
                            "Item {} completed: {} ({} degraded frame(s))",
                            index,
                            output.display(),
                            degraded_frames
                        )),
                        super::ItemOutcome::Failed(e) => {
                            worker.log(&format!("Item {} failed: {}", index, e))
                        }
                    }
                    // The receiver may already be gone; processing still ran.
                    let _ = tx.send(report);
                });
            }
        });

        self.log("Batch finished");
        if let Some(log) = &self.run_log {
            log.flush();
        }
    }

    fn process_item(&self, index: usize, item: MediaItem) -> ItemReport {
        let name = item.display_name();
        self.set_phase(index, ItemPhase::Queued);

        if self.cancel.is_cancelled() {
            self.set_phase(index, ItemPhase::Failed);
            return ItemReport::failed(index, name, ItemError::Cancelled);
        }

        let scratch = match ScratchDir::create(
            &self.scratch_root,
            &format!("{}_item{:03}", self.batch_name, index),
        ) {
            Ok(scratch) => scratch,
            Err(e) => {
                self.set_phase(index, ItemPhase::Failed);
                return ItemReport::failed(
                    index,
                    name,
                    ItemError::storage("creating item scratch", e),
                );
            }
        };

        let result = match item.kind {
            MediaKind::Image => self.process_image(index, &item, &scratch),
            MediaKind::Video => self.process_video(index, &item, &scratch),
        };

        // Scratch is removed here on every path, success or not.
        drop(scratch);

        match result {
            Ok((output, degraded_frames)) => {
                self.set_phase(index, ItemPhase::Completed);
                ItemReport::completed(index, name, output, degraded_frames)
            }
            Err(e) => {
                self.set_phase(index, ItemPhase::Failed);
                ItemReport::failed(index, name, e)
            }
        }
    }

    /// Still image: straight to the upscale stage, then into place.
    fn process_image(
        &self,
        index: usize,
        item: &MediaItem,
        scratch: &ScratchDir,
    ) -> Result<(PathBuf, usize), ItemError> {
        let source = self.materialize_source(item, scratch)?;

        self.set_phase(index, ItemPhase::Upscaling);
        let settings = self.config.spatial();
        let ctx = StageContext {
            runner: self.runner.as_ref(),
            budget: self.budget.as_ref(),
            cancel: &self.cancel,
        };
        let output = stages::upscale(
            &ctx,
            std::slice::from_ref(&source),
            settings.scale,
            self.spatial.as_ref(),
            &ModelParams { tta: settings.tta },
            scratch.path(),
        )
        .map_err(|_| ItemError::Cancelled)?;

        let enhanced = output
            .frames
            .first()
            .ok_or_else(|| ItemError::external_process("image", "stage produced no output"))?;

        self.place_output(enhanced, &item.target)?;
        Ok((item.target.clone(), output.jobs_failed))
    }

    /// Video: segment, optionally interpolate, upscale, reassemble, concat.
    fn process_video(
        &self,
        index: usize,
        item: &MediaItem,
        scratch: &ScratchDir,
    ) -> Result<(PathBuf, usize), ItemError> {
        let source = self.materialize_source(item, scratch)?;

        self.set_phase(index, ItemPhase::Segmenting);
        let info = self.codec.probe(&source).map_err(|e| decode_error(&source, e))?;
        let ranges = plan_segments(info.frames, self.config.max_frames_per_segment as u64);
        if ranges.is_empty() {
            return Err(ItemError::input_unreadable(
                source.display().to_string(),
                "no decodable frames",
            ));
        }

        let temporal_settings = self.config.temporal();
        let factor = temporal_settings.factor;
        let output_fps = info.frame_rate * f64::from(factor.multiplier());
        let spatial_settings = self.config.spatial();
        let target_ext = item
            .target
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "mkv".to_string());

        let ctx = StageContext {
            runner: self.runner.as_ref(),
            budget: self.budget.as_ref(),
            cancel: &self.cancel,
        };

        let mut segment_files = Vec::with_capacity(ranges.len());
        let mut degraded_frames = 0;

        for (segment_index, range) in ranges.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(ItemError::Cancelled);
            }

            let segment = Segment {
                index: segment_index,
                range: *range,
                source: source.clone(),
            };

            // Frames are extracted lazily, only for the segment in flight,
            // and removed when its scratch drops at the end of this loop.
            let segment_scratch =
                ScratchDir::create(scratch.path(), &format!("seg_{:04}", segment_index))
                    .map_err(|e| ItemError::storage("creating segment scratch", e))?;

            let frames = segment
                .extract_frames(self.codec.as_ref(), segment_scratch.path())
                .map_err(|e| decode_error(&source, e))?;

            let frames = match &self.temporal {
                Some(temporal) => {
                    self.set_phase(index, ItemPhase::Interpolating);
                    let output = stages::interpolate(
                        &ctx,
                        &frames,
                        factor,
                        temporal.as_ref(),
                        &ModelParams {
                            tta: temporal_settings.tta,
                        },
                        segment_scratch.path(),
                    )
                    .map_err(|_| ItemError::Cancelled)?;
                    degraded_frames += output.jobs_failed;
                    output.frames
                }
                None => frames,
            };

            self.set_phase(index, ItemPhase::Upscaling);
            let output = stages::upscale(
                &ctx,
                &frames,
                spatial_settings.scale,
                self.spatial.as_ref(),
                &ModelParams {
                    tta: spatial_settings.tta,
                },
                segment_scratch.path(),
            )
            .map_err(|_| ItemError::Cancelled)?;
            degraded_frames += output.jobs_failed;

            if output.frames.is_empty() {
                return Err(ItemError::external_process(
                    format!("segment {}", segment_index),
                    "no usable frames",
                ));
            }

            self.set_phase(index, ItemPhase::Reassembling);
            let segment_file = scratch
                .path()
                .join(format!("seg_{:04}.{}", segment_index, target_ext));
            self.codec
                .compose_video(&output.frames, output_fps, &segment_file)
                .map_err(|e| {
                    assemble_error(format!("segment {} reassembly", segment_index), e)
                })?;
            segment_files.push(segment_file);
        }

        if self.cancel.is_cancelled() {
            return Err(ItemError::Cancelled);
        }

        self.set_phase(index, ItemPhase::Reassembling);
        if segment_files.len() == 1 {
            self.place_output(&segment_files[0], &item.target)?;
        } else {
            if let Some(parent) = item.target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| ItemError::storage("creating output directory", e))?;
            }
            self.codec
                .concat(&segment_files, &item.target)
                .map_err(|e| assemble_error("segment concatenation", e))?;
        }

        Ok((item.target.clone(), degraded_frames))
    }

    /// Resolve the item's source to a readable path, spilling in-memory
    /// bytes to scratch.
    fn materialize_source(
        &self,
        item: &MediaItem,
        scratch: &ScratchDir,
    ) -> Result<PathBuf, ItemError> {
        match &item.source {
            MediaSource::Path(path) => {
                if !path.exists() {
                    return Err(ItemError::input_unreadable(
                        path.display().to_string(),
                        "file does not exist",
                    ));
                }
                Ok(path.clone())
            }
            MediaSource::Memory { data, ext } => {
                let path = scratch.path().join(format!("input.{}", ext));
                fs::write(&path, data)
                    .map_err(|e| ItemError::storage("spilling in-memory input", e))?;
                Ok(path)
            }
        }
    }

    /// Move a finished artifact into the item's target location.
    fn place_output(&self, artifact: &Path, target: &Path) -> Result<(), ItemError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ItemError::storage("creating output directory", e))?;
        }
        // Rename when possible; copy across filesystems.
        if fs::rename(artifact, target).is_err() {
            fs::copy(artifact, target)
                .map_err(|e| ItemError::storage("writing output", e))?;
        }
        Ok(())
    }

    fn set_phase(&self, index: usize, phase: ItemPhase) {
        tracing::debug!("{} item {} -> {}", self.batch_name, index, phase);
        if let Some(log) = &self.run_log {
            log.phase(&format!("item {} {}", index, phase));
        }
        if let Some(progress) = &self.progress {
            progress(index, phase);
        }
    }

    fn log(&self, message: &str) {
        tracing::info!("{}", message);
        if let Some(log) = &self.run_log {
            log.info(message);
        }
    }
}

/// Codec failure while decoding input: unreadable input, unless it was
/// plain storage I/O.
fn decode_error(path: &Path, error: CodecError) -> ItemError {
    match error {
        CodecError::Io { operation, source } => ItemError::storage(operation, source),
        other => ItemError::input_unreadable(path.display().to_string(), other.to_string()),
    }
}

/// Codec failure while producing output: failed assembly, unless it was
/// plain storage I/O.
fn assemble_error(unit: impl Into<String>, error: CodecError) -> ItemError {
    match error {
        CodecError::Io { operation, source } => ItemError::storage(operation, source),
        other => ItemError::external_process(unit, other.to_string()),
    }
}
