//! View roles the hub dispatches to

use super::{HoverPosition, ViewId};

/// Entry points a chart view implements, read once at registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartCapabilities {
    pub hover_index: bool,
    pub hover_timestamp: bool,
    pub hover_out: bool,
    pub overlays: bool,
    pub destroy: bool,
}

impl ChartCapabilities {
    /// Index hover and hover-out, the minimum a time-series chart offers
    pub fn basic() -> Self {
        Self {
            hover_index: true,
            hover_out: true,
            ..Self::default()
        }
    }

    pub fn with_timestamp(mut self) -> Self {
        self.hover_timestamp = true;
        self
    }

    pub fn with_overlays(mut self) -> Self {
        self.overlays = true;
        self
    }

    pub fn with_destroy(mut self) -> Self {
        self.destroy = true;
        self
    }
}

/// A time-series chart taking part in hover synchronization.
///
/// Inbound handlers update visuals only; they must never call back into
/// the hub.
pub trait ChartView: Send + Sync {
    fn capabilities(&self) -> ChartCapabilities;

    /// Highlight the sample at `index`
    fn sync_hover(&self, _index: f64) {}

    /// Highlight the sample closest to `timestamp`
    fn sync_hover_ts(&self, _timestamp: i64) {}

    /// Clear the transient highlight
    fn sync_hover_out(&self) {}

    fn update_overlay_visibility(&self, _overlay_id: &str, _visible: bool) {}

    fn destroy(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// The single map view, which pans and shows a popup when synced
pub trait GeoView: Send + Sync {
    /// Id the view registers and broadcasts under
    fn view_id(&self) -> &ViewId;

    /// Move the position indicator to `position` and show it
    fn show_position(&self, position: &HoverPosition);

    /// Reset to "no position" with the popup hidden
    fn clear_position(&self);

    fn destroy(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
