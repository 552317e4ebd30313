//! Batch pipeline: coordinator, results, and the caller-facing handle.
//!
//! A caller builds a [`Coordinator`] over an immutable configuration
//! snapshot, a model catalog, and a frame codec, then submits media items:
//!
//! ```ignore
//! use forge_core::pipeline::Coordinator;
//!
//! let coordinator = Coordinator::new(config, catalog, codec);
//! let handle = coordinator.submit(items)?;
//! for report in handle.iter() {
//!     println!("{}: {:?}", report.input, report.outcome);
//! }
//! ```
//!
//! Per-item state machine: `Queued -> Segmenting (video) -> Interpolating
//! (optional) -> Upscaling -> Reassembling -> {Completed | Failed}`, strictly
//! forward. Frame-level job failures are absorbed inside stages; a batch
//! always resolves every submitted item to exactly one report.

mod coordinator;
mod errors;
mod handle;
mod types;

pub use coordinator::{Coordinator, SubmitError};
pub use errors::ItemError;
pub use handle::BatchHandle;
pub use types::{BatchSummary, ItemOutcome, ItemReport, ProgressCallback};
