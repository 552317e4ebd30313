//! Model capability interface.
//!
//! The pipeline never switches on a model enum; it holds trait objects and
//! asks each backend for installation status, its executable, and a typed
//! argument list for one unit of work.

use std::env;
use std::ffi::OsString;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::models::ModelFamily;

/// Runtime parameters that apply to any model invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelParams {
    /// Test-time augmentation.
    pub tta: bool,
}

/// One unit of model work, described by its file endpoints.
#[derive(Debug, Clone, Copy)]
pub enum ModelRequest<'a> {
    /// Enlarge one image by an integer factor.
    Upscale {
        input: &'a Path,
        output: &'a Path,
        scale: u32,
    },
    /// Synthesize the frame between two consecutive frames.
    Interpolate {
        first: &'a Path,
        second: &'a Path,
        output: &'a Path,
    },
}

impl ModelRequest<'_> {
    /// Family of backend this request is addressed to.
    pub fn family(&self) -> ModelFamily {
        match self {
            ModelRequest::Upscale { .. } => ModelFamily::Spatial,
            ModelRequest::Interpolate { .. } => ModelFamily::Temporal,
        }
    }

    /// The declared output path.
    pub fn output(&self) -> &Path {
        match self {
            ModelRequest::Upscale { output, .. } => output,
            ModelRequest::Interpolate { output, .. } => output,
        }
    }
}

/// Capability interface implemented once per model family.
///
/// `command_args` is the argument template: it turns a request into the
/// argument list for the backend's executable. Requests must match the
/// backend's family; a mismatched request yields an empty argument list and
/// is a caller bug.
pub trait ModelBackend: Send + Sync {
    /// Catalog id of this model (e.g. "realesrgan").
    fn name(&self) -> &str;

    /// Spatial or temporal.
    fn family(&self) -> ModelFamily;

    /// Executable path or bare name to resolve from PATH.
    fn executable(&self) -> &Path;

    /// Supported scale factors (spatial) or interpolation factors (temporal).
    fn range(&self) -> RangeInclusive<u32>;

    /// Build the argument list for one request.
    fn command_args(&self, request: &ModelRequest<'_>, params: &ModelParams) -> Vec<OsString>;

    /// Whether the executable is present on this machine.
    fn is_installed(&self) -> bool {
        resolve_executable(self.executable()).is_some()
    }

    /// Whether a factor is within this model's supported range.
    fn supports(&self, value: u32) -> bool {
        self.range().contains(&value)
    }
}

/// Resolve an executable reference to an existing file.
///
/// Absolute or multi-component paths are checked directly; bare names are
/// searched on PATH.
pub fn resolve_executable(executable: &Path) -> Option<PathBuf> {
    if executable.components().count() > 1 {
        return executable.is_file().then(|| executable.to_path_buf());
    }

    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(executable))
        .find(|candidate| candidate.is_file())
}
