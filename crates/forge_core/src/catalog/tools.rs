//! ncnn-vulkan tool backends.
//!
//! All supported models ship as self-contained ncnn-vulkan command-line
//! tools with near-identical CLIs, so one implementation per family covers
//! the whole catalog. Upscalers take `-i/-o/-s`; interpolators take a frame
//! pair via `-0/-1`. Both accept `-x` for test-time augmentation.

use std::ffi::OsString;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use super::backend::{ModelBackend, ModelParams, ModelRequest};
use crate::models::ModelFamily;

/// Spatial family backend wrapping an ncnn-vulkan upscaler executable.
#[derive(Debug, Clone)]
pub struct NcnnUpscaler {
    name: String,
    executable: PathBuf,
    /// Value for `-n` (model variant within the tool), when the tool wants one.
    model_name: Option<String>,
    scales: RangeInclusive<u32>,
}

impl NcnnUpscaler {
    /// Generic constructor; prefer the named presets below.
    pub fn new(
        name: impl Into<String>,
        executable: impl Into<PathBuf>,
        scales: RangeInclusive<u32>,
    ) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            model_name: None,
            scales,
        }
    }

    /// Set the `-n` model variant.
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Real-ESRGAN preset.
    pub fn real_esrgan(install_dir: Option<&Path>) -> Self {
        Self::new(
            "realesrgan",
            tool_path(install_dir, "realesrgan-ncnn-vulkan"),
            1..=4,
        )
        .with_model_name("realesrgan-x4plus")
    }

    /// Real-CUGAN preset.
    pub fn real_cugan(install_dir: Option<&Path>) -> Self {
        Self::new(
            "realcugan",
            tool_path(install_dir, "realcugan-ncnn-vulkan"),
            1..=4,
        )
    }

    /// waifu2x preset.
    pub fn waifu2x(install_dir: Option<&Path>) -> Self {
        Self::new(
            "waifu2x",
            tool_path(install_dir, "waifu2x-ncnn-vulkan"),
            1..=2,
        )
    }
}

impl ModelBackend for NcnnUpscaler {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::Spatial
    }

    fn executable(&self) -> &Path {
        &self.executable
    }

    fn range(&self) -> RangeInclusive<u32> {
        self.scales.clone()
    }

    fn command_args(&self, request: &ModelRequest<'_>, params: &ModelParams) -> Vec<OsString> {
        let ModelRequest::Upscale {
            input,
            output,
            scale,
        } = request
        else {
            debug_assert!(false, "temporal request sent to spatial backend");
            return Vec::new();
        };

        let mut args: Vec<OsString> = vec![
            "-i".into(),
            input.as_os_str().to_owned(),
            "-o".into(),
            output.as_os_str().to_owned(),
            "-s".into(),
            scale.to_string().into(),
        ];
        if let Some(model_name) = &self.model_name {
            args.push("-n".into());
            args.push(model_name.into());
        }
        if params.tta {
            args.push("-x".into());
        }
        args
    }
}

/// Temporal family backend wrapping an ncnn-vulkan interpolator executable.
#[derive(Debug, Clone)]
pub struct NcnnInterpolator {
    name: String,
    executable: PathBuf,
    /// Value for `-m` (model directory), when the tool wants one.
    model_dir: Option<String>,
}

impl NcnnInterpolator {
    /// Generic constructor; prefer the named presets below.
    pub fn new(name: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            model_dir: None,
        }
    }

    /// Set the `-m` model directory.
    pub fn with_model_dir(mut self, model_dir: impl Into<String>) -> Self {
        self.model_dir = Some(model_dir.into());
        self
    }

    /// RIFE preset.
    pub fn rife(install_dir: Option<&Path>) -> Self {
        Self::new("rife", tool_path(install_dir, "rife-ncnn-vulkan")).with_model_dir("rife-v4.6")
    }

    /// CAIN preset.
    pub fn cain(install_dir: Option<&Path>) -> Self {
        Self::new("cain", tool_path(install_dir, "cain-ncnn-vulkan"))
    }
}

impl ModelBackend for NcnnInterpolator {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::Temporal
    }

    fn executable(&self) -> &Path {
        &self.executable
    }

    fn range(&self) -> RangeInclusive<u32> {
        // One intermediate frame per invocation; 4x is two chained 2x passes.
        1..=4
    }

    fn command_args(&self, request: &ModelRequest<'_>, params: &ModelParams) -> Vec<OsString> {
        let ModelRequest::Interpolate {
            first,
            second,
            output,
        } = request
        else {
            debug_assert!(false, "spatial request sent to temporal backend");
            return Vec::new();
        };

        let mut args: Vec<OsString> = vec![
            "-0".into(),
            first.as_os_str().to_owned(),
            "-1".into(),
            second.as_os_str().to_owned(),
            "-o".into(),
            output.as_os_str().to_owned(),
        ];
        if let Some(model_dir) = &self.model_dir {
            args.push("-m".into());
            args.push(model_dir.into());
        }
        if params.tta {
            args.push("-x".into());
        }
        args
    }
}

fn tool_path(install_dir: Option<&Path>, tool: &str) -> PathBuf {
    match install_dir {
        Some(dir) => dir.join(tool),
        None => PathBuf::from(tool),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lossy(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn upscaler_args_follow_tool_cli() {
        let backend = NcnnUpscaler::real_esrgan(Some(Path::new("/opt/models")));
        let args = backend.command_args(
            &ModelRequest::Upscale {
                input: Path::new("/t/in.png"),
                output: Path::new("/t/out.png"),
                scale: 4,
            },
            &ModelParams { tta: true },
        );

        assert_eq!(
            lossy(&args),
            vec![
                "-i", "/t/in.png", "-o", "/t/out.png", "-s", "4", "-n", "realesrgan-x4plus", "-x"
            ]
        );
        assert_eq!(
            backend.executable(),
            Path::new("/opt/models/realesrgan-ncnn-vulkan")
        );
    }

    #[test]
    fn interpolator_args_take_frame_pair() {
        let backend = NcnnInterpolator::rife(None);
        let args = backend.command_args(
            &ModelRequest::Interpolate {
                first: Path::new("/t/f0.png"),
                second: Path::new("/t/f1.png"),
                output: Path::new("/t/mid.png"),
            },
            &ModelParams::default(),
        );

        assert_eq!(
            lossy(&args),
            vec!["-0", "/t/f0.png", "-1", "/t/f1.png", "-o", "/t/mid.png", "-m", "rife-v4.6"]
        );
        assert_eq!(backend.family(), ModelFamily::Temporal);
    }

    #[test]
    fn waifu2x_scale_range_is_narrower() {
        let backend = NcnnUpscaler::waifu2x(None);
        assert!(backend.supports(2));
        assert!(!backend.supports(4));
    }
}
