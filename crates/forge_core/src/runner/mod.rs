//! External job execution.
//!
//! One [`Job`] is one external process. The runner owns the child's
//! lifetime: it polls rather than blocking in `wait` so a concurrent
//! [`CancelToken::cancel`] can terminate an in-flight job, and it removes
//! any partial output on the failure and cancellation paths so callers
//! never observe a half-written artifact.

mod budget;

pub use budget::{BudgetPermit, ConcurrencyBudget};

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::models::{remove_partial_output, Job, JobOutcome};

/// Shared cancellation flag.
///
/// Cloning yields a handle to the same flag. Safe to trip from any thread
/// while jobs are in flight.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Fresh, untripped token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. In-flight jobs are terminated at their next
    /// poll; queued work observes the flag before submission.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Job execution seam.
///
/// The production implementation spawns real processes; tests substitute
/// scripted fakes to exercise failure and ordering policy.
pub trait RunJob: Send + Sync {
    /// Run one job to a terminal outcome.
    fn run(&self, job: &Job, cancel: &CancelToken) -> JobOutcome;
}

/// Process-spawning runner.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// How often to poll the child for exit and the token for cancellation.
    poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(25),
        }
    }
}

impl ProcessRunner {
    /// Runner with the default poll interval.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunJob for ProcessRunner {
    fn run(&self, job: &Job, cancel: &CancelToken) -> JobOutcome {
        if cancel.is_cancelled() {
            remove_partial_output(&job.output);
            return JobOutcome::Cancelled;
        }

        let mut cmd = Command::new(&job.executable);
        cmd.args(&job.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = &job.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!("Running {}: {}", job.tool, job.command_line());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                remove_partial_output(&job.output);
                return JobOutcome::failed(None, format!("failed to spawn {}: {}", job.tool, e));
            }
        };

        // Drain stderr on its own thread so a chatty tool cannot fill the
        // pipe and stall before we ever see its exit.
        let mut stderr_thread = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        let join_stderr = |handle: Option<thread::JoinHandle<String>>| {
            handle
                .and_then(|h| h.join().ok())
                .unwrap_or_default()
        };

        let status = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                let _ = join_stderr(stderr_thread.take());
                remove_partial_output(&job.output);
                tracing::debug!("{} cancelled", job.tool);
                return JobOutcome::Cancelled;
            }

            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(self.poll_interval),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = join_stderr(stderr_thread.take());
                    remove_partial_output(&job.output);
                    return JobOutcome::failed(None, format!("wait on {} failed: {}", job.tool, e));
                }
            }
        };

        let stderr = join_stderr(stderr_thread.take());

        if !status.success() {
            remove_partial_output(&job.output);
            return JobOutcome::failed(status.code(), stderr_tail(&stderr));
        }

        if !job.output.exists() {
            return JobOutcome::failed(
                status.code(),
                format!("{} exited zero but produced no output", job.tool),
            );
        }

        JobOutcome::Succeeded
    }
}

/// Last few lines of a captured stderr stream, bounded for error messages.
fn stderr_tail(stderr: &str) -> String {
    const MAX_LINES: usize = 8;
    const MAX_BYTES: usize = 2048;

    let lines: Vec<&str> = stderr.lines().rev().take(MAX_LINES).collect();
    let mut tail = lines
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    if tail.len() > MAX_BYTES {
        let start = tail.len() - MAX_BYTES;
        let start = (start..tail.len())
            .find(|&i| tail.is_char_boundary(i))
            .unwrap_or(start);
        tail = format!("...{}", &tail[start..]);
    }
    if tail.is_empty() {
        "no diagnostic output".to_string()
    } else {
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Job;

    fn job_with_output(dir: &std::path::Path, exe: &str, args: &[&str]) -> Job {
        let mut job = Job::new("test-tool", exe, dir.join("out.txt"));
        for arg in args {
            job = job.arg(*arg);
        }
        job
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn missing_executable_fails_without_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_with_output(dir.path(), "/nonexistent/forge-test-tool", &[]);

        let outcome = ProcessRunner::new().run(&job, &CancelToken::new());
        match outcome {
            JobOutcome::Failed { exit_code, message } => {
                assert_eq!(exit_code, None);
                assert!(message.contains("failed to spawn"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn successful_job_requires_declared_output() {
        let dir = tempfile::tempdir().unwrap();
        // `true` exits zero but writes nothing.
        let job = job_with_output(dir.path(), "true", &[]);

        let outcome = ProcessRunner::new().run(&job, &CancelToken::new());
        match outcome {
            JobOutcome::Failed { exit_code, message } => {
                assert_eq!(exit_code, Some(0));
                assert!(message.contains("no output"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn shell_written_output_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let job = Job::new("sh", "sh", &out)
            .arg("-c")
            .arg(format!("echo done > {}", out.display()));

        let outcome = ProcessRunner::new().run(&job, &CancelToken::new());
        assert!(outcome.is_success());
        assert!(out.exists());
    }

    #[test]
    fn failing_job_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let job = Job::new("sh", "sh", &out)
            .arg("-c")
            .arg(format!("echo partial > {} && exit 3", out.display()));

        let outcome = ProcessRunner::new().run(&job, &CancelToken::new());
        match outcome {
            JobOutcome::Failed { exit_code, .. } => assert_eq!(exit_code, Some(3)),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!out.exists());
    }

    #[test]
    fn cancellation_kills_inflight_job() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let job = Job::new("sh", "sh", &out)
            .arg("-c")
            .arg(format!("echo partial > {} && sleep 30", out.display()));

        let token = CancelToken::new();
        let runner = ProcessRunner::new();

        let outcome = std::thread::scope(|scope| {
            let handle = scope.spawn(|| runner.run(&job, &token));
            std::thread::sleep(Duration::from_millis(200));
            token.cancel();
            handle.join().unwrap()
        });

        assert!(outcome.is_cancelled());
        assert!(!out.exists());
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let stderr = (0..20).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let tail = stderr_tail(&stderr);
        assert!(tail.contains("line 19"));
        assert!(!tail.contains("line 0\n"));
    }
}
