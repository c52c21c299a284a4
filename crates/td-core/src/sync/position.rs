use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use td_data::ResolvedSample;

/// Stable identifier of a registered view
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewId(String);

impl ViewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ViewId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ViewId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for ViewId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A hovered data position, addressed by index and optionally by time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoverPosition {
    /// Sample index; fractional for interpolated positions
    pub index: f64,
    /// Epoch milliseconds, preferred by views that support it
    pub timestamp: Option<i64>,
}

impl HoverPosition {
    pub fn at_index(index: f64) -> Self {
        Self {
            index,
            timestamp: None,
        }
    }

    pub fn at(index: f64, timestamp: i64) -> Self {
        Self {
            index,
            timestamp: Some(timestamp),
        }
    }
}

impl From<u64> for HoverPosition {
    fn from(index: u64) -> Self {
        Self::at_index(index as f64)
    }
}

impl From<f64> for HoverPosition {
    fn from(index: f64) -> Self {
        Self::at_index(index)
    }
}

impl From<(f64, i64)> for HoverPosition {
    fn from((index, timestamp): (f64, i64)) -> Self {
        Self::at(index, timestamp)
    }
}

impl From<&ResolvedSample> for HoverPosition {
    fn from(sample: &ResolvedSample) -> Self {
        Self::at(sample.index(), sample.timestamp())
    }
}

/// The last message the hub fanned out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncEvent {
    HoverIn {
        source: ViewId,
        position: HoverPosition,
    },
    HoverOut {
        source: ViewId,
    },
    OverlayChanged {
        overlay_id: String,
        visible: bool,
    },
}
