//! Spatial upscale stage.

use std::path::{Path, PathBuf};

use crate::catalog::{ModelBackend, ModelParams, ModelRequest};
use crate::models::{Job, ScaleFactor};

use super::{dispatch_ordered, StageCancelled, StageContext, StageOutput};

/// Upscale every frame by the given factor.
///
/// One job per frame under the shared budget; output length and order
/// always equal the input. A failed frame is substituted with the original
/// (non-upscaled) frame and counted as degraded; a single frame failure
/// never aborts an item.
pub fn upscale(
    ctx: &StageContext<'_>,
    frames: &[PathBuf],
    scale: ScaleFactor,
    model: &dyn ModelBackend,
    params: &ModelParams,
    scratch: &Path,
) -> Result<StageOutput, StageCancelled> {
    if scale.is_identity() || frames.is_empty() {
        return Ok(StageOutput::identity(frames));
    }

    let jobs: Vec<Job> = frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let output = scratch.join(format!("up_{:08}.png", i));
            let args = model.command_args(
                &ModelRequest::Upscale {
                    input: frame,
                    output: &output,
                    scale: scale.multiplier(),
                },
                params,
            );
            Job::new(model.name(), model.executable(), &output)
                .with_args(args)
                .with_input(frame)
        })
        .collect();

    let outcomes = dispatch_ordered(ctx, &jobs)?;

    let mut result = Vec::with_capacity(frames.len());
    let mut jobs_failed = 0;
    for (i, outcome) in outcomes.iter().enumerate() {
        if outcome.is_success() {
            result.push(jobs[i].output.clone());
        } else {
            jobs_failed += 1;
            tracing::warn!("Upscale of frame {} failed, keeping original", i);
            result.push(frames[i].clone());
        }
    }

    Ok(StageOutput {
        frames: result,
        jobs_run: frames.len(),
        jobs_failed,
    })
}
