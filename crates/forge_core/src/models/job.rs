//! External-process job descriptions and outcomes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// One external-process invocation: one unit of model work.
///
/// Arguments are a typed list, never a concatenated shell string, so paths
/// with spaces or shell metacharacters cannot break the invocation.
#[derive(Debug, Clone)]
pub struct Job {
    /// Tool name for logs and error context (e.g. "realesrgan-ncnn-vulkan").
    pub tool: String,
    /// Executable to spawn.
    pub executable: PathBuf,
    /// Argument list passed verbatim.
    pub args: Vec<OsString>,
    /// Working directory for the child, if any.
    pub working_dir: Option<PathBuf>,
    /// Declared input files (for diagnostics).
    pub inputs: Vec<PathBuf>,
    /// Declared output file; must exist after a successful run.
    pub output: PathBuf,
}

impl Job {
    /// Create a job with empty arguments.
    pub fn new(
        tool: impl Into<String>,
        executable: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool: tool.into(),
            executable: executable.into(),
            args: Vec::new(),
            working_dir: None,
            inputs: Vec::new(),
            output: output.into(),
        }
    }

    /// Replace the argument list.
    pub fn with_args(mut self, args: Vec<OsString>) -> Self {
        self.args = args;
        self
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Declare an input file.
    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.inputs.push(input.into());
        self
    }

    /// Lossy single-line rendering of the invocation, for logging only.
    pub fn command_line(&self) -> String {
        let mut line = self.executable.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Terminal state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Process exited zero and the declared output exists.
    Succeeded,
    /// Process failed, exited non-zero, died to a signal, or produced no
    /// output. Any partial output has been removed before this is returned.
    Failed {
        /// Exit code, if the process ran and exited normally.
        exit_code: Option<i32>,
        /// Tail of the captured stderr (or a spawn/IO message).
        message: String,
    },
    /// The job was cancelled; any partial output has been removed.
    Cancelled,
}

impl JobOutcome {
    /// Create a failed outcome.
    pub fn failed(exit_code: Option<i32>, message: impl Into<String>) -> Self {
        Self::Failed {
            exit_code,
            message: message.into(),
        }
    }

    /// Whether the job succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }

    /// Whether the job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobOutcome::Cancelled)
    }
}

/// Remove a job's declared output if present.
///
/// Used by runners on the failure and cancellation paths so callers never
/// observe a half-written artifact.
pub fn remove_partial_output(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => {
            tracing::debug!("Removed partial output {}", output.display());
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!("Failed to remove partial output {}: {}", output.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_builder_accumulates() {
        let job = Job::new("rife", "/opt/rife/rife-ncnn-vulkan", "/tmp/out.png")
            .arg("-0")
            .arg("/tmp/a.png")
            .arg("-1")
            .arg("/tmp/b.png")
            .with_input("/tmp/a.png")
            .with_input("/tmp/b.png");

        assert_eq!(job.args.len(), 4);
        assert_eq!(job.inputs.len(), 2);
        assert!(job.command_line().contains("rife-ncnn-vulkan -0 /tmp/a.png"));
    }

    #[test]
    fn outcome_predicates() {
        assert!(JobOutcome::Succeeded.is_success());
        assert!(!JobOutcome::failed(Some(1), "boom").is_success());
        assert!(JobOutcome::Cancelled.is_cancelled());
    }

    #[test]
    fn remove_partial_output_tolerates_missing() {
        // Must not panic for a path that does not exist.
        remove_partial_output(Path::new("/nonexistent/partial.png"));
    }
}
