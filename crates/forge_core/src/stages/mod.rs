//! Enhancement stages.
//!
//! Each stage turns an ordered frame sequence into another ordered frame
//! sequence by fanning per-unit jobs out under the shared concurrency
//! budget. Per-unit failures are absorbed by substitution and surface only
//! as a degradation count; the sole stage-level failure is cancellation.

mod interpolate;
mod upscale;

pub use interpolate::interpolate;
pub use upscale::upscale;

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{Job, JobOutcome};
use crate::runner::{CancelToken, ConcurrencyBudget, RunJob};

/// Shared execution environment for one stage invocation.
pub struct StageContext<'a> {
    /// Job executor.
    pub runner: &'a dyn RunJob,
    /// Process-wide job budget.
    pub budget: &'a ConcurrencyBudget,
    /// Batch cancellation flag.
    pub cancel: &'a CancelToken,
}

/// Result of one stage invocation.
#[derive(Debug, Clone)]
pub struct StageOutput {
    /// Output frames, in order.
    pub frames: Vec<PathBuf>,
    /// Jobs dispatched.
    pub jobs_run: usize,
    /// Jobs that failed and were substituted.
    pub jobs_failed: usize,
}

impl StageOutput {
    /// Pass-through output with no jobs.
    pub fn identity(frames: &[PathBuf]) -> Self {
        Self {
            frames: frames.to_vec(),
            jobs_run: 0,
            jobs_failed: 0,
        }
    }
}

/// The stage was interrupted by batch cancellation.
#[derive(Debug, Error)]
#[error("stage cancelled")]
pub struct StageCancelled;

/// Dispatch jobs under the budget and collect outcomes in submission order.
///
/// The submitter blocks on a budget slot before spawning each worker, so at
/// most `budget.capacity()` jobs run at once regardless of how many are
/// queued here or in sibling stages. Outcomes are indexed by job position,
/// never by completion time.
pub(crate) fn dispatch_ordered(
    ctx: &StageContext<'_>,
    jobs: &[Job],
) -> Result<Vec<JobOutcome>, StageCancelled> {
    let mut outcomes = Vec::with_capacity(jobs.len());

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            if ctx.cancel.is_cancelled() {
                break;
            }
            let permit = ctx.budget.acquire();
            handles.push(scope.spawn(move || {
                let _permit = permit;
                ctx.runner.run(job, ctx.cancel)
            }));
        }
        for handle in handles {
            outcomes.push(
                handle
                    .join()
                    .unwrap_or_else(|_| JobOutcome::failed(None, "job worker panicked")),
            );
        }
    });

    if ctx.cancel.is_cancelled() || outcomes.len() < jobs.len() {
        return Err(StageCancelled);
    }
    Ok(outcomes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Runner that writes the declared output, failing where scripted.
    pub(crate) struct ScriptedRunner<F: Fn(&Job) -> bool + Send + Sync> {
        pub fail_when: F,
        pub runs: AtomicUsize,
    }

    impl<F: Fn(&Job) -> bool + Send + Sync> ScriptedRunner<F> {
        pub fn new(fail_when: F) -> Self {
            Self {
                fail_when,
                runs: AtomicUsize::new(0),
            }
        }
    }

    impl<F: Fn(&Job) -> bool + Send + Sync> RunJob for ScriptedRunner<F> {
        fn run(&self, job: &Job, cancel: &CancelToken) -> JobOutcome {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if cancel.is_cancelled() {
                return JobOutcome::Cancelled;
            }
            if (self.fail_when)(job) {
                return JobOutcome::failed(Some(1), "scripted failure");
            }
            std::fs::write(&job.output, b"frame").expect("scripted output write");
            JobOutcome::Succeeded
        }
    }

    #[test]
    fn dispatch_preserves_submission_order() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(|job: &Job| job.tool == "fail");
        let budget = ConcurrencyBudget::new(4);
        let cancel = CancelToken::new();
        let ctx = StageContext {
            runner: &runner,
            budget: &budget,
            cancel: &cancel,
        };

        let jobs: Vec<Job> = (0..8)
            .map(|i| {
                let tool = if i == 3 { "fail" } else { "ok" };
                Job::new(tool, "unused", dir.path().join(format!("out_{}.png", i)))
            })
            .collect();

        let outcomes = dispatch_ordered(&ctx, &jobs).unwrap();
        assert_eq!(outcomes.len(), 8);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.is_success(), i != 3, "job {}", i);
        }
    }

    #[test]
    fn dispatch_reports_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let runner = ScriptedRunner::new(|_: &Job| false);
        let budget = ConcurrencyBudget::new(1);
        let ctx = StageContext {
            runner: &runner,
            budget: &budget,
            cancel: &cancel,
        };

        let jobs = vec![Job::new("ok", "unused", dir.path().join("out.png"))];
        assert!(dispatch_ordered(&ctx, &jobs).is_err());
        assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
    }
}
