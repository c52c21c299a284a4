//! Viewport containment - decides when the map should follow the indicator

use std::time::{Duration, Instant};

use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Distance kept between the popup and the viewport border
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeMargins {
    /// Left, right and top
    pub sides: f32,
    /// Bottom, larger to leave room for the bottom panel
    pub bottom: f32,
}

impl Default for EdgeMargins {
    fn default() -> Self {
        Self {
            sides: 40.0,
            bottom: 160.0,
        }
    }
}

/// Size of the detail popup and its lift above the indicator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopupFootprint {
    pub width: f32,
    pub height: f32,
    pub offset: f32,
}

impl Default for PopupFootprint {
    fn default() -> Self {
        Self {
            width: 240.0,
            height: 150.0,
            offset: 24.0,
        }
    }
}

impl PopupFootprint {
    /// Screen rectangle of the popup when anchored at `anchor`
    pub fn rect_at(&self, anchor: Pos2) -> Rect {
        Rect::from_min_size(
            Pos2::new(anchor.x - self.width / 2.0, anchor.y - self.offset - self.height),
            Vec2::new(self.width, self.height),
        )
    }
}

/// Whether `rect` comes closer to any viewport border than the margins allow
pub fn is_near_edge(rect: Rect, size: Vec2, margins: &EdgeMargins) -> bool {
    rect.left() < margins.sides
        || rect.right() > size.x - margins.sides
        || rect.top() < margins.sides
        || rect.bottom() > size.y - margins.bottom
}

pub fn should_pan(rect: Rect, size: Vec2, margins: &EdgeMargins, force_center: bool) -> bool {
    force_center || is_near_edge(rect, size, margins)
}

/// Edge check plus a minimum spacing between automatic pans, so the map
/// does not keep yanking the viewport while the user drags it
#[derive(Debug, Clone)]
pub struct ViewportPolicy {
    margins: EdgeMargins,
    min_pan_interval: Duration,
    last_pan: Option<Instant>,
}

impl ViewportPolicy {
    pub fn new(margins: EdgeMargins, min_pan_interval: Duration) -> Self {
        Self {
            margins,
            min_pan_interval,
            last_pan: None,
        }
    }

    /// Decide whether to pan now, recording the pan if so.
    ///
    /// Forced centering ignores both the margins and the spacing.
    pub fn should_pan(&mut self, rect: Rect, size: Vec2, force_center: bool, now: Instant) -> bool {
        if !should_pan(rect, size, &self.margins, force_center) {
            return false;
        }
        if !force_center {
            if let Some(last) = self.last_pan {
                if now.saturating_duration_since(last) < self.min_pan_interval {
                    return false;
                }
            }
        }
        self.last_pan = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.last_pan = None;
    }
}
