//! Frame interpolation stage.

use std::path::{Path, PathBuf};

use crate::catalog::{ModelBackend, ModelParams, ModelRequest};
use crate::models::{InterpolationFactor, Job};

use super::{dispatch_ordered, StageCancelled, StageContext, StageOutput};

/// Interpolate an ordered frame sequence by the given factor.
///
/// Factor 1 is a pass-through that creates no jobs. Factor 2 dispatches one
/// job per consecutive pair and interleaves the synthesized frames between
/// the originals. Factor 4 runs the factor-2 pass twice over its own output
/// rather than asking the model for a single 4x step, so for N input frames
/// the output always holds `(N - 1) * factor + 1` frames.
///
/// A failed pair is filled by duplicating the earlier frame so the sequence
/// never has a hole; the failure is counted in the output, not escalated.
pub fn interpolate(
    ctx: &StageContext<'_>,
    frames: &[PathBuf],
    factor: InterpolationFactor,
    model: &dyn ModelBackend,
    params: &ModelParams,
    scratch: &Path,
) -> Result<StageOutput, StageCancelled> {
    if factor.is_identity() || frames.len() < 2 {
        return Ok(StageOutput::identity(frames));
    }

    let mut current = frames.to_vec();
    let mut jobs_run = 0;
    let mut jobs_failed = 0;

    for pass in 0..factor.passes() {
        let output = interpolate_pass(ctx, &current, model, params, scratch, pass)?;
        current = output.frames;
        jobs_run += output.jobs_run;
        jobs_failed += output.jobs_failed;
    }

    Ok(StageOutput {
        frames: current,
        jobs_run,
        jobs_failed,
    })
}

/// One 2x pass: a job per consecutive pair, output interleaved in order.
fn interpolate_pass(
    ctx: &StageContext<'_>,
    frames: &[PathBuf],
    model: &dyn ModelBackend,
    params: &ModelParams,
    scratch: &Path,
    pass: u32,
) -> Result<StageOutput, StageCancelled> {
    let pairs = frames.len() - 1;
    let jobs: Vec<Job> = (0..pairs)
        .map(|i| {
            let output = scratch.join(format!("mid_p{}_{:08}.png", pass, i));
            let args = model.command_args(
                &ModelRequest::Interpolate {
                    first: &frames[i],
                    second: &frames[i + 1],
                    output: &output,
                },
                params,
            );
            Job::new(model.name(), model.executable(), &output)
                .with_args(args)
                .with_input(&frames[i])
                .with_input(&frames[i + 1])
        })
        .collect();

    let outcomes = dispatch_ordered(ctx, &jobs)?;

    let mut result = Vec::with_capacity(frames.len() * 2 - 1);
    let mut jobs_failed = 0;
    for i in 0..pairs {
        result.push(frames[i].clone());
        if outcomes[i].is_success() {
            result.push(jobs[i].output.clone());
        } else {
            // Fill the gap with the earlier frame; order is intact.
            jobs_failed += 1;
            tracing::warn!(
                "Interpolation of pair {}..{} failed, duplicating earlier frame",
                i,
                i + 1
            );
            result.push(frames[i].clone());
        }
    }
    result.push(frames[pairs].clone());

    Ok(StageOutput {
        frames: result,
        jobs_run: pairs,
        jobs_failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NcnnInterpolator;
    use crate::runner::{CancelToken, ConcurrencyBudget};
    use crate::stages::tests::ScriptedRunner;
    use std::fs;

    fn seed_frames(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("frame_{:08}.png", i));
                fs::write(&path, format!("frame{}", i)).unwrap();
                path
            })
            .collect()
    }

    fn run(
        frames: &[PathBuf],
        factor: InterpolationFactor,
        scratch: &Path,
        fail_when: impl Fn(&Job) -> bool + Send + Sync,
    ) -> StageOutput {
        let runner = ScriptedRunner::new(fail_when);
        let budget = ConcurrencyBudget::new(4);
        let cancel = CancelToken::new();
        let ctx = StageContext {
            runner: &runner,
            budget: &budget,
            cancel: &cancel,
        };
        let model = NcnnInterpolator::rife(None);
        interpolate(&ctx, frames, factor, &model, &ModelParams::default(), scratch).unwrap()
    }

    #[test]
    fn factor_one_is_identity_with_no_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let frames = seed_frames(dir.path(), 5);
        let output = run(&frames, InterpolationFactor::X1, dir.path(), |_| false);
        assert_eq!(output.frames, frames);
        assert_eq!(output.jobs_run, 0);
    }

    #[test]
    fn factor_two_interleaves_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let frames = seed_frames(dir.path(), 3);
        let output = run(&frames, InterpolationFactor::X2, dir.path(), |_| false);

        // f0, m(0,1), f1, m(1,2), f2
        assert_eq!(output.frames.len(), 5);
        assert_eq!(output.frames[0], frames[0]);
        assert_eq!(output.frames[2], frames[1]);
        assert_eq!(output.frames[4], frames[2]);
        assert!(output.frames[1].to_string_lossy().contains("mid_p0_00000000"));
        assert!(output.frames[3].to_string_lossy().contains("mid_p0_00000001"));
        assert_eq!(output.jobs_run, 2);
        assert_eq!(output.jobs_failed, 0);
    }

    #[test]
    fn interpolated_length_follows_formula() {
        let dir = tempfile::tempdir().unwrap();
        for n in [2usize, 3, 7, 12] {
            for factor in [InterpolationFactor::X2, InterpolationFactor::X4] {
                let sub = dir.path().join(format!("n{}_{}", n, factor.multiplier()));
                fs::create_dir_all(&sub).unwrap();
                let frames = seed_frames(&sub, n);
                let output = run(&frames, factor, &sub, |_| false);
                assert_eq!(
                    output.frames.len(),
                    (n - 1) * factor.multiplier() as usize + 1,
                    "n={} factor={}",
                    n,
                    factor
                );
            }
        }
    }

    #[test]
    fn factor_four_is_two_passes() {
        let dir = tempfile::tempdir().unwrap();
        let frames = seed_frames(dir.path(), 4);
        let output = run(&frames, InterpolationFactor::X4, dir.path(), |_| false);

        // Pass one creates 3 jobs over 4 frames; pass two creates 6 jobs
        // over the 7-frame intermediate sequence.
        assert_eq!(output.jobs_run, 3 + 6);
        assert_eq!(output.frames.len(), 13);
        // Originals keep their positions every factor-th slot.
        assert_eq!(output.frames[0], frames[0]);
        assert_eq!(output.frames[4], frames[1]);
        assert_eq!(output.frames[8], frames[2]);
        assert_eq!(output.frames[12], frames[3]);
    }

    #[test]
    fn failed_pair_duplicates_earlier_frame() {
        let dir = tempfile::tempdir().unwrap();
        let frames = seed_frames(dir.path(), 3);
        let output = run(&frames, InterpolationFactor::X2, dir.path(), |job: &Job| {
            job.output.to_string_lossy().contains("mid_p0_00000000")
        });

        assert_eq!(output.frames.len(), 5);
        // The failed gap holds the earlier original, not a hole.
        assert_eq!(output.frames[1], frames[0]);
        assert!(output.frames[3].to_string_lossy().contains("mid_p0_00000001"));
        assert_eq!(output.jobs_failed, 1);
    }

    #[test]
    fn single_frame_needs_no_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let frames = seed_frames(dir.path(), 1);
        let output = run(&frames, InterpolationFactor::X4, dir.path(), |_| false);
        assert_eq!(output.frames, frames);
        assert_eq!(output.jobs_run, 0);
    }
}
