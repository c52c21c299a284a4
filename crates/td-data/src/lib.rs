//! Route data for the telemetry dashboard
//!
//! Samples, the per-load sample index, route segmentation and the
//! read-only overlay configuration consumed by the views.

pub mod config;
pub mod index;
pub mod schema;
pub mod segments;

use thiserror::Error;

// Re-exports
pub use config::{OverlayConfig, OverlayRecipe};
pub use index::SampleIndex;
pub use schema::{InterpolatedSample, LatLng, ResolvedSample, Sample};
pub use segments::{build_segments, RouteData, RouteSegment};

/// Errors that can occur while loading route data
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("sample at position {position} has index {index}, not above previous index {previous}")]
    IndexNotAscending {
        position: usize,
        previous: u64,
        index: u64,
    },

    #[error("sample at position {position} has timestamp {timestamp}, before previous timestamp {previous}")]
    TimestampDecreasing {
        position: usize,
        previous: i64,
        timestamp: i64,
    },

    #[error("unknown overlay: {0}")]
    UnknownOverlay(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RouteError>;
