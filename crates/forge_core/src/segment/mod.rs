//! Video segmentation and scratch-directory lifecycle.
//!
//! A video is split into bounded, contiguous frame ranges so intermediate
//! storage stays capped at roughly one segment's worth of frames. Planning
//! is pure arithmetic over the frame count; extracting a segment's frames
//! to scratch happens lazily, only when the segment is about to be
//! processed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::{CodecResult, FrameCodec};

/// Half-open frame index range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: u64,
    pub end: u64,
}

impl FrameRange {
    /// Number of frames in the range.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the range is empty.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Iterate the frame indices in order.
    pub fn indices(&self) -> impl Iterator<Item = u64> {
        self.start..self.end
    }
}

/// Split `total_frames` into `ceil(total / max_per_segment)` contiguous
/// ranges partitioning `[0, total)`; every range holds `max_per_segment`
/// frames except the last, which absorbs the remainder.
pub fn plan_segments(total_frames: u64, max_per_segment: u64) -> Vec<FrameRange> {
    let max_per_segment = max_per_segment.max(1);
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < total_frames {
        let end = (start + max_per_segment).min(total_frames);
        ranges.push(FrameRange { start, end });
        start = end;
    }
    ranges
}

/// One plannable unit of a video: a frame range plus its source.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Position within the video's segment sequence.
    pub index: usize,
    /// Frames covered by this segment.
    pub range: FrameRange,
    /// Source video file.
    pub source: PathBuf,
}

impl Segment {
    /// Extract this segment's frames into `scratch`, one image file per
    /// frame, named so lexical order equals frame order.
    pub fn extract_frames(
        &self,
        codec: &dyn FrameCodec,
        scratch: &Path,
    ) -> CodecResult<Vec<PathBuf>> {
        let mut frames = Vec::with_capacity(self.range.len() as usize);
        for frame_index in self.range.indices() {
            let out = scratch.join(format!("frame_{:08}.png", frame_index));
            codec.extract_frame(&self.source, frame_index, &out)?;
            frames.push(out);
        }
        Ok(frames)
    }
}

/// Exclusively-owned scratch directory, removed on drop.
///
/// Every exit path of segment and item processing runs the drop, so scratch
/// from this process cannot outlive its owner. Directories left behind by a
/// previous crashed process are the embedding application's startup concern.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `root/name` (and parents).
    ///
    /// Uniqueness of `name` among concurrent siblings is the caller's
    /// responsibility; the coordinator derives names from batch, item, and
    /// segment indices.
    pub fn create(root: &Path, name: &str) -> io::Result<Self> {
        let path = root.join(name);
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove scratch {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_partitions_exactly() {
        for (total, budget) in [(10u64, 4u64), (2000, 2000), (2001, 2000), (7, 1), (100, 33)] {
            let ranges = plan_segments(total, budget);
            let expected = total.div_ceil(budget);
            assert_eq!(ranges.len() as u64, expected, "total={} budget={}", total, budget);

            // No overlap, no gap, full coverage.
            let mut cursor = 0;
            for range in &ranges {
                assert_eq!(range.start, cursor);
                assert!(range.len() <= budget);
                assert!(!range.is_empty());
                cursor = range.end;
            }
            assert_eq!(cursor, total);
        }
    }

    #[test]
    fn ten_frames_budget_four_gives_4_4_2() {
        let ranges = plan_segments(10, 4);
        let sizes: Vec<u64> = ranges.iter().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn empty_video_plans_no_segments() {
        assert!(plan_segments(0, 100).is_empty());
    }

    #[test]
    fn zero_budget_is_treated_as_one() {
        let ranges = plan_segments(3, 0);
        assert_eq!(ranges.len(), 3);
    }

    #[test]
    fn extract_writes_one_file_per_frame_in_order() {
        use crate::codec::{CodecError, CodecResult, VideoInfo};

        struct StubCodec;

        impl FrameCodec for StubCodec {
            fn probe(&self, video: &Path) -> CodecResult<VideoInfo> {
                Err(CodecError::probe(video, "unused"))
            }
            fn extract_frame(&self, _video: &Path, index: u64, output: &Path) -> CodecResult<()> {
                fs::write(output, index.to_string())
                    .map_err(|e| CodecError::io("writing frame", e))
            }
            fn compose_video(&self, _: &[PathBuf], _: f64, _: &Path) -> CodecResult<()> {
                unreachable!("extraction never composes")
            }
            fn concat(&self, _: &[PathBuf], _: &Path) -> CodecResult<()> {
                unreachable!("extraction never concatenates")
            }
        }

        let scratch = tempfile::tempdir().unwrap();
        let segment = Segment {
            index: 1,
            range: FrameRange { start: 4, end: 8 },
            source: PathBuf::from("/in/clip.mkv"),
        };

        let frames = segment.extract_frames(&StubCodec, scratch.path()).unwrap();
        assert_eq!(frames.len(), 4);
        // Lexical name order equals frame order, and contents match indices.
        let mut sorted = frames.clone();
        sorted.sort();
        assert_eq!(sorted, frames);
        for (offset, frame) in frames.iter().enumerate() {
            assert_eq!(fs::read_to_string(frame).unwrap(), (4 + offset).to_string());
        }
    }

    #[test]
    fn scratch_dir_removes_itself() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchDir::create(root.path(), "item-0").unwrap();
            fs::write(scratch.path().join("frame.png"), b"x").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
