//! forge_core - enhancement pipeline for frameforge
//!
//! This crate contains all business logic with zero UI dependencies: it
//! drives external model executables (spatial upscalers and temporal
//! interpolators) over images and segmented videos under a shared
//! concurrency budget, with guaranteed scratch cleanup and one result per
//! submitted item. Front ends supply configuration and consume reports.

pub mod catalog;
pub mod codec;
pub mod config;
pub mod estimate;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod runner;
pub mod segment;
pub mod stages;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
