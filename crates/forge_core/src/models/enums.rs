//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Kind of input media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Family of external model tool.
///
/// Spatial models enlarge a single image; temporal models synthesize an
/// intermediate frame between two existing frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Spatial,
    Temporal,
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelFamily::Spatial => write!(f, "spatial"),
            ModelFamily::Temporal => write!(f, "temporal"),
        }
    }
}

/// Spatial enlargement factor (power of two).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScaleFactor {
    #[serde(rename = "1x")]
    X1,
    #[default]
    #[serde(rename = "2x")]
    X2,
    #[serde(rename = "4x")]
    X4,
}

impl ScaleFactor {
    /// Numeric multiplier for this factor.
    pub fn multiplier(&self) -> u32 {
        match self {
            ScaleFactor::X1 => 1,
            ScaleFactor::X2 => 2,
            ScaleFactor::X4 => 4,
        }
    }

    /// Parse from a numeric multiplier.
    pub fn from_multiplier(value: u32) -> Option<Self> {
        match value {
            1 => Some(ScaleFactor::X1),
            2 => Some(ScaleFactor::X2),
            4 => Some(ScaleFactor::X4),
            _ => None,
        }
    }

    /// Whether this factor leaves frames untouched.
    pub fn is_identity(&self) -> bool {
        matches!(self, ScaleFactor::X1)
    }
}

impl std::fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

/// Frame interpolation factor.
///
/// 4x is produced by running the 2x pass twice, never by a single 4x model
/// invocation, so the interpolated frame count for N originals is always
/// `(N - 1) * factor + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InterpolationFactor {
    #[serde(rename = "1x")]
    X1,
    #[default]
    #[serde(rename = "2x")]
    X2,
    #[serde(rename = "4x")]
    X4,
}

impl InterpolationFactor {
    /// Numeric multiplier for this factor.
    pub fn multiplier(&self) -> u32 {
        match self {
            InterpolationFactor::X1 => 1,
            InterpolationFactor::X2 => 2,
            InterpolationFactor::X4 => 4,
        }
    }

    /// Parse from a numeric multiplier.
    pub fn from_multiplier(value: u32) -> Option<Self> {
        match value {
            1 => Some(InterpolationFactor::X1),
            2 => Some(InterpolationFactor::X2),
            4 => Some(InterpolationFactor::X4),
            _ => None,
        }
    }

    /// Number of 2x passes needed to reach this factor.
    pub fn passes(&self) -> u32 {
        match self {
            InterpolationFactor::X1 => 0,
            InterpolationFactor::X2 => 1,
            InterpolationFactor::X4 => 2,
        }
    }

    /// Whether this factor is a pass-through.
    pub fn is_identity(&self) -> bool {
        matches!(self, InterpolationFactor::X1)
    }
}

impl std::fmt::Display for InterpolationFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

/// Processing phase of one media item.
///
/// Transitions are strictly forward; a failed phase is terminal for the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemPhase {
    Queued,
    Segmenting,
    Interpolating,
    Upscaling,
    Reassembling,
    Completed,
    Failed,
}

impl ItemPhase {
    /// Whether the item has reached a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemPhase::Completed | ItemPhase::Failed)
    }
}

impl std::fmt::Display for ItemPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ItemPhase::Queued => "queued",
            ItemPhase::Segmenting => "segmenting",
            ItemPhase::Interpolating => "interpolating",
            ItemPhase::Upscaling => "upscaling",
            ItemPhase::Reassembling => "reassembling",
            ItemPhase::Completed => "completed",
            ItemPhase::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_factor_multipliers() {
        assert_eq!(ScaleFactor::X1.multiplier(), 1);
        assert_eq!(ScaleFactor::X2.multiplier(), 2);
        assert_eq!(ScaleFactor::X4.multiplier(), 4);
        assert_eq!(ScaleFactor::from_multiplier(4), Some(ScaleFactor::X4));
        assert_eq!(ScaleFactor::from_multiplier(3), None);
    }

    #[test]
    fn interpolation_factor_passes() {
        assert_eq!(InterpolationFactor::X1.passes(), 0);
        assert_eq!(InterpolationFactor::X2.passes(), 1);
        assert_eq!(InterpolationFactor::X4.passes(), 2);
        assert!(InterpolationFactor::X1.is_identity());
    }

    #[test]
    fn factors_serialize_as_suffix_strings() {
        let json = serde_json::to_string(&ScaleFactor::X2).unwrap();
        assert_eq!(json, "\"2x\"");
        let parsed: InterpolationFactor = serde_json::from_str("\"4x\"").unwrap();
        assert_eq!(parsed, InterpolationFactor::X4);
    }

    #[test]
    fn terminal_phases() {
        assert!(ItemPhase::Completed.is_terminal());
        assert!(ItemPhase::Failed.is_terminal());
        assert!(!ItemPhase::Upscaling.is_terminal());
    }
}
