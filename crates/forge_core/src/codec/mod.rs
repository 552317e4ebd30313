//! Frame codec collaborator interface.
//!
//! The pipeline treats frame extraction and video composition as atomic,
//! blocking primitives with a single guarantee: the output file exists iff
//! the call succeeded. The production implementation shells out to
//! ffmpeg/ffprobe; tests substitute fakes.

mod ffmpeg;

pub use ffmpeg::FfmpegCodec;

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Probe result for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Total frame count.
    pub frames: u64,
    /// Average frame rate (frames per second).
    pub frame_rate: f64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Duration in seconds.
    pub duration_secs: f64,
}

/// Errors from codec operations.
#[derive(Error, Debug)]
pub enum CodecError {
    /// File I/O around an operation failed.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// The input could not be probed or decoded.
    #[error("Failed to probe {path}: {message}")]
    Probe { path: PathBuf, message: String },

    /// The input has no video stream.
    #[error("No video stream in {0}")]
    NoVideoStream(PathBuf),

    /// An external codec tool failed.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    Tool {
        tool: String,
        exit_code: i32,
        message: String,
    },
}

impl CodecError {
    /// Create an I/O error with operation context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a probe error.
    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a tool failure error.
    pub fn tool(tool: impl Into<String>, exit_code: i32, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Frame-level access to video containers.
pub trait FrameCodec: Send + Sync {
    /// Probe a video for frame count, rate, dimensions, and duration.
    fn probe(&self, video: &Path) -> CodecResult<VideoInfo>;

    /// Extract frame `index` (0-based) as an image file at `output`.
    fn extract_frame(&self, video: &Path, index: u64, output: &Path) -> CodecResult<()>;

    /// Compose ordered image files into a video at the given frame rate.
    ///
    /// Entries may repeat (a duplicated frame is a legitimate output of the
    /// interpolation failure policy).
    fn compose_video(&self, frames: &[PathBuf], frame_rate: f64, output: &Path) -> CodecResult<()>;

    /// Concatenate video segments, in order, into a single output.
    fn concat(&self, segments: &[PathBuf], output: &Path) -> CodecResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_error_displays_context() {
        let err = CodecError::tool("ffmpeg", 187, "Invalid data found");
        let msg = err.to_string();
        assert!(msg.contains("ffmpeg"));
        assert!(msg.contains("187"));
        assert!(msg.contains("Invalid data found"));
    }

    #[test]
    fn video_info_serializes() {
        let info = VideoInfo {
            frames: 240,
            frame_rate: 23.976,
            width: 1920,
            height: 1080,
            duration_secs: 10.01,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"frames\":240"));
    }
}
