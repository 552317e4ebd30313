//! Input media references consumed by the pipeline.

use std::path::{Path, PathBuf};

use super::enums::MediaKind;

/// Where an input's pixel data lives.
///
/// Most callers hand over file paths; drag-and-drop front ends can pass
/// decoded bytes that the pipeline spills to scratch storage before
/// processing.
#[derive(Debug, Clone)]
pub enum MediaSource {
    /// Input file on disk.
    Path(PathBuf),
    /// In-memory encoded image plus its format extension (e.g. "png").
    Memory { data: Vec<u8>, ext: String },
}

impl MediaSource {
    /// The on-disk path, if this source is a file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            MediaSource::Path(p) => Some(p),
            MediaSource::Memory { .. } => None,
        }
    }

    /// Short description for logs and reports.
    pub fn describe(&self) -> String {
        match self {
            MediaSource::Path(p) => p.display().to_string(),
            MediaSource::Memory { data, ext } => {
                format!("<memory {} bytes, .{}>", data.len(), ext)
            }
        }
    }
}

/// One unit of caller input: a source, a target location, and a kind tag.
///
/// Items are created by the caller and consumed read-only by the pipeline;
/// every submitted item resolves to exactly one report.
#[derive(Debug, Clone)]
pub struct MediaItem {
    /// Input reference.
    pub source: MediaSource,
    /// Where the enhanced output should be written.
    pub target: PathBuf,
    /// Still image or video.
    pub kind: MediaKind,
}

impl MediaItem {
    /// Create an image item from a file path.
    pub fn image(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: MediaSource::Path(source.into()),
            target: target.into(),
            kind: MediaKind::Image,
        }
    }

    /// Create an image item from in-memory encoded bytes.
    pub fn image_bytes(data: Vec<u8>, ext: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: MediaSource::Memory {
                data,
                ext: ext.into(),
            },
            target: target.into(),
            kind: MediaKind::Image,
        }
    }

    /// Create a video item from a file path.
    pub fn video(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: MediaSource::Path(source.into()),
            target: target.into(),
            kind: MediaKind::Video,
        }
    }

    /// Display string used in logs and reports.
    pub fn display_name(&self) -> String {
        match &self.source {
            MediaSource::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| p.display().to_string()),
            MediaSource::Memory { .. } => self.source.describe(),
        }
    }
}
