//! Map widget seam

use std::time::Duration;

use egui::{Pos2, Vec2};
use parking_lot::RwLock;
use td_data::LatLng;

/// The capabilities the position logic needs from a map widget
pub trait MapSurface: Send + Sync {
    /// Viewport size in pixels
    fn size(&self) -> Vec2;

    /// Viewport pixel position of a coordinate
    fn lat_lng_to_screen(&self, position: LatLng) -> Pos2;

    /// Animate the viewport center to `center` over `duration`
    fn pan_to(&self, center: LatLng, duration: Duration);
}

/// Headless Web Mercator viewport.
///
/// Pans take effect immediately; the requested duration is recorded but
/// not animated.
pub struct MercatorSurface {
    size: Vec2,
    zoom: f64,
    center: RwLock<LatLng>,
    pans: RwLock<Vec<(LatLng, Duration)>>,
}

impl MercatorSurface {
    pub fn new(size: Vec2, center: LatLng, zoom: f64) -> Self {
        Self {
            size,
            zoom,
            center: RwLock::new(center),
            pans: RwLock::new(Vec::new()),
        }
    }

    pub fn center(&self) -> LatLng {
        *self.center.read()
    }

    /// Pans requested so far, oldest first
    pub fn pans(&self) -> Vec<(LatLng, Duration)> {
        self.pans.read().clone()
    }

    fn world_size(&self) -> f64 {
        256.0 * 2f64.powf(self.zoom)
    }

    fn project_world(&self, position: LatLng) -> (f64, f64) {
        let world = self.world_size();
        let x = (position.lng + 180.0) / 360.0;
        let lat_rad = position.lat.to_radians();
        let y = 0.5 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / (2.0 * std::f64::consts::PI);
        (x * world, y * world)
    }
}

impl MapSurface for MercatorSurface {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn lat_lng_to_screen(&self, position: LatLng) -> Pos2 {
        let (x, y) = self.project_world(position);
        let (cx, cy) = self.project_world(self.center());
        Pos2::new(
            (x - cx) as f32 + self.size.x / 2.0,
            (y - cy) as f32 + self.size.y / 2.0,
        )
    }

    fn pan_to(&self, center: LatLng, duration: Duration) {
        *self.center.write() = center;
        self.pans.write().push((center, duration));
    }
}
