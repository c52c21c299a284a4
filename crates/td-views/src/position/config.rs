//! Position controller configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{EdgeMargins, PopupFootprint};

/// Timing and layout settings of a position controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionControllerConfig {
    /// Minimum spacing between pointer resolutions
    #[serde(with = "millis")]
    pub pointer_throttle: Duration,

    /// Delay before hiding the hover after the pointer leaves the route
    #[serde(with = "millis")]
    pub hide_delay: Duration,

    /// Duration handed to the map for pan animations
    #[serde(with = "millis")]
    pub pan_duration: Duration,

    /// Minimum spacing between automatic pans
    #[serde(with = "millis")]
    pub min_pan_interval: Duration,

    pub margins: EdgeMargins,

    pub popup: PopupFootprint,
}

impl Default for PositionControllerConfig {
    fn default() -> Self {
        Self {
            pointer_throttle: Duration::from_millis(50),
            hide_delay: Duration::from_millis(150),
            pan_duration: Duration::from_millis(150),
            min_pan_interval: Duration::from_millis(300),
            margins: EdgeMargins::default(),
            popup: PopupFootprint::default(),
        }
    }
}

impl PositionControllerConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// Durations as whole milliseconds
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// How a programmatic position update behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Show the detail popup for the new position
    pub show_popup: bool,
    /// Pan when the popup would come too close to the viewport border
    pub center_if_near_edge: bool,
    /// Always pan to the new position
    pub center: bool,
    /// Do not broadcast the update to other views
    pub no_sync: bool,
    /// On a missing position, also hide the indicator
    pub hide_indicator: bool,
    /// On a missing position, drop the held position
    pub unpin: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            show_popup: true,
            center_if_near_edge: false,
            center: false,
            no_sync: false,
            hide_indicator: false,
            unpin: false,
        }
    }
}

impl PositionOptions {
    pub fn without_popup(mut self) -> Self {
        self.show_popup = false;
        self
    }

    pub fn center_if_near_edge(mut self) -> Self {
        self.center_if_near_edge = true;
        self
    }

    pub fn center(mut self) -> Self {
        self.center = true;
        self
    }

    pub fn no_sync(mut self) -> Self {
        self.no_sync = true;
        self
    }

    pub fn hide_indicator(mut self) -> Self {
        self.hide_indicator = true;
        self
    }

    pub fn unpin(mut self) -> Self {
        self.unpin = true;
        self
    }
}
