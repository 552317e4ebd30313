//! Result types for batch processing.

use std::path::PathBuf;

use crate::models::ItemPhase;

use super::errors::ItemError;

/// Progress callback type: (item index, phase just entered).
pub type ProgressCallback = dyn Fn(usize, ItemPhase) + Send + Sync;

/// Terminal outcome of one item.
#[derive(Debug)]
pub enum ItemOutcome {
    /// The item produced an output. `degraded_frames` counts frames or
    /// pairs that fell back to their original because a job failed.
    Completed {
        output: PathBuf,
        degraded_frames: usize,
    },
    /// The item failed; no output was produced.
    Failed(ItemError),
}

impl ItemOutcome {
    /// Whether the item completed.
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Completed { .. })
    }

    /// Whether the item completed but with substituted frames.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            ItemOutcome::Completed {
                degraded_frames, ..
            } if *degraded_frames > 0
        )
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&ItemError> {
        match self {
            ItemOutcome::Failed(e) => Some(e),
            ItemOutcome::Completed { .. } => None,
        }
    }
}

/// One result per submitted item, delivered in completion order.
#[derive(Debug)]
pub struct ItemReport {
    /// Submission index of the item.
    pub index: usize,
    /// Display name of the input.
    pub input: String,
    /// Terminal outcome.
    pub outcome: ItemOutcome,
}

impl ItemReport {
    /// Create a completed report.
    pub fn completed(
        index: usize,
        input: impl Into<String>,
        output: PathBuf,
        degraded_frames: usize,
    ) -> Self {
        Self {
            index,
            input: input.into(),
            outcome: ItemOutcome::Completed {
                output,
                degraded_frames,
            },
        }
    }

    /// Create a failed report.
    pub fn failed(index: usize, input: impl Into<String>, error: ItemError) -> Self {
        Self {
            index,
            input: input.into(),
            outcome: ItemOutcome::Failed(error),
        }
    }

    /// Whether the item completed.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Aggregate counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub degraded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    /// Tally reports into a summary.
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a ItemReport>) -> Self {
        let mut summary = Self::default();
        for report in reports {
            match &report.outcome {
                ItemOutcome::Completed { .. } => {
                    summary.completed += 1;
                    if report.outcome.is_degraded() {
                        summary.degraded += 1;
                    }
                }
                ItemOutcome::Failed(e) if e.is_cancelled() => summary.cancelled += 1,
                ItemOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Total items accounted for.
    pub fn total(&self) -> usize {
        self.completed + self.failed + self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_requires_substitutions() {
        let clean = ItemReport::completed(0, "a.png", PathBuf::from("/out/a.png"), 0);
        let degraded = ItemReport::completed(1, "b.png", PathBuf::from("/out/b.png"), 3);
        assert!(!clean.outcome.is_degraded());
        assert!(degraded.outcome.is_degraded());
        assert!(degraded.is_success());
    }

    #[test]
    fn summary_tallies_by_outcome() {
        let reports = vec![
            ItemReport::completed(0, "a", PathBuf::from("/a"), 0),
            ItemReport::completed(1, "b", PathBuf::from("/b"), 2),
            ItemReport::failed(2, "c", ItemError::Cancelled),
            ItemReport::failed(3, "d", ItemError::input_unreadable("d", "gone")),
        ];
        let summary = BatchSummary::from_reports(&reports);
        assert_eq!(
            summary,
            BatchSummary {
                completed: 2,
                degraded: 1,
                failed: 1,
                cancelled: 1,
            }
        );
        assert_eq!(summary.total(), 4);
    }
}
