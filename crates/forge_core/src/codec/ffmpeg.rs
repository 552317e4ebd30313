//! ffmpeg/ffprobe-backed frame codec.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{CodecError, CodecResult, FrameCodec, VideoInfo};

/// Production codec shelling out to ffmpeg and ffprobe.
#[derive(Debug, Clone)]
pub struct FfmpegCodec {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegCodec {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegCodec {
    /// Codec using `ffmpeg`/`ffprobe` from PATH.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the executable locations.
    pub fn with_executables(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Run ffmpeg with the given arguments, mapping failure to `CodecError`.
    fn run_ffmpeg(&self, args: &[&str], output: &Path) -> CodecResult<()> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-y").args(args).stdout(Stdio::null()).stderr(Stdio::piped());

        tracing::debug!("Running ffmpeg {}", args.join(" "));

        let result = cmd
            .output()
            .map_err(|e| CodecError::io("spawning ffmpeg", e))?;

        if !result.status.success() {
            return Err(CodecError::tool(
                "ffmpeg",
                result.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&result.stderr).trim().to_string(),
            ));
        }

        if !output.exists() {
            return Err(CodecError::tool(
                "ffmpeg",
                0,
                format!("exited zero but produced no output at {}", output.display()),
            ));
        }

        Ok(())
    }
}

impl FrameCodec for FfmpegCodec {
    fn probe(&self, video: &Path) -> CodecResult<VideoInfo> {
        if !video.exists() {
            return Err(CodecError::probe(video, "file does not exist"));
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,duration",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(video)
            .output()
            .map_err(|e| CodecError::io("spawning ffprobe", e))?;

        if !output.status.success() {
            return Err(CodecError::probe(
                video,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| CodecError::probe(video, format!("unparseable ffprobe output: {}", e)))?;

        let stream = json["streams"]
            .as_array()
            .and_then(|s| s.first())
            .ok_or_else(|| CodecError::NoVideoStream(video.to_path_buf()))?;

        let width = stream["width"].as_u64().unwrap_or(0) as u32;
        let height = stream["height"].as_u64().unwrap_or(0) as u32;
        if width == 0 || height == 0 {
            return Err(CodecError::probe(video, "stream has no dimensions"));
        }

        let frame_rate = stream["r_frame_rate"]
            .as_str()
            .or_else(|| stream["avg_frame_rate"].as_str())
            .and_then(parse_frame_rate)
            .ok_or_else(|| CodecError::probe(video, "no usable frame rate"))?;

        let duration_secs = stream["duration"]
            .as_str()
            .or_else(|| json["format"]["duration"].as_str())
            .and_then(|d| d.trim().parse::<f64>().ok())
            .unwrap_or(0.0);

        // nb_frames is often absent; fall back to duration x rate.
        let frames = stream["nb_frames"]
            .as_str()
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or_else(|| (duration_secs * frame_rate).round() as u64);

        if frames == 0 {
            return Err(CodecError::probe(video, "no decodable frames"));
        }

        Ok(VideoInfo {
            frames,
            frame_rate,
            width,
            height,
            duration_secs,
        })
    }

    fn extract_frame(&self, video: &Path, index: u64, output: &Path) -> CodecResult<()> {
        let filter = format!("select=eq(n\\,{})", index);
        self.run_ffmpeg(
            &[
                "-i",
                &video.display().to_string(),
                "-vf",
                &filter,
                "-vsync",
                "0",
                "-frames:v",
                "1",
                &output.display().to_string(),
            ],
            output,
        )
    }

    fn compose_video(&self, frames: &[PathBuf], frame_rate: f64, output: &Path) -> CodecResult<()> {
        if frames.is_empty() {
            return Err(CodecError::tool("ffmpeg", -1, "no frames to compose"));
        }

        let frame_duration = 1.0 / frame_rate.max(f64::EPSILON);
        let mut list = String::new();
        for frame in frames {
            list.push_str(&format!(
                "file '{}'\nduration {:.6}\n",
                escape_concat_path(frame),
                frame_duration
            ));
        }
        // The concat demuxer drops the last duration unless the final entry
        // is repeated.
        if let Some(last) = frames.last() {
            list.push_str(&format!("file '{}'\n", escape_concat_path(last)));
        }

        let list_path = list_file_path(output, "frames");
        fs::write(&list_path, list).map_err(|e| CodecError::io("writing frame list", e))?;

        let rate = format!("{:.6}", frame_rate);
        let result = self.run_ffmpeg(
            &[
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                &list_path.display().to_string(),
                "-fps_mode",
                "cfr",
                "-r",
                &rate,
                "-pix_fmt",
                "yuv420p",
                &output.display().to_string(),
            ],
            output,
        );

        let _ = fs::remove_file(&list_path);
        result
    }

    fn concat(&self, segments: &[PathBuf], output: &Path) -> CodecResult<()> {
        if segments.is_empty() {
            return Err(CodecError::tool("ffmpeg", -1, "no segments to concatenate"));
        }

        let mut list = String::new();
        for segment in segments {
            list.push_str(&format!("file '{}'\n", escape_concat_path(segment)));
        }

        let list_path = list_file_path(output, "segments");
        fs::write(&list_path, list).map_err(|e| CodecError::io("writing segment list", e))?;

        let result = self.run_ffmpeg(
            &[
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                &list_path.display().to_string(),
                "-c",
                "copy",
                &output.display().to_string(),
            ],
            output,
        );

        let _ = fs::remove_file(&list_path);
        result
    }
}

/// Parse an ffprobe frame rate ("num/den" or plain number).
fn parse_frame_rate(value: &str) -> Option<f64> {
    let rate = if let Some((num, den)) = value.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        value.trim().parse().ok()?
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Escape a path for a concat demuxer list entry.
fn escape_concat_path(path: &Path) -> String {
    path.display().to_string().replace('\'', "'\\''")
}

fn list_file_path(output: &Path, label: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    output
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{}_{}.txt", stem, label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rate_parses_fractions() {
        assert_eq!(parse_frame_rate("24000/1001"), Some(24000.0 / 1001.0));
        assert_eq!(parse_frame_rate("30"), Some(30.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("nonsense"), None);
    }

    #[test]
    fn concat_paths_escape_quotes() {
        assert_eq!(
            escape_concat_path(Path::new("/tmp/it's.png")),
            "/tmp/it'\\''s.png"
        );
    }

    #[test]
    fn probe_rejects_missing_file() {
        let codec = FfmpegCodec::new();
        let result = codec.probe(Path::new("/nonexistent/clip.mkv"));
        assert!(matches!(result, Err(CodecError::Probe { .. })));
    }

    #[test]
    fn list_file_sits_next_to_output() {
        let path = list_file_path(Path::new("/out/final.mp4"), "segments");
        assert_eq!(path, Path::new("/out/.final_segments.txt"));
    }
}
