//! View-side logic for the telemetry dashboard
//!
//! Resolves pointer positions on the route map to samples, decides when
//! the map viewport should follow the position indicator, and drives the
//! map's hover state machine.

pub mod geometry;
mod map;
pub mod position;
mod viewport;

pub use geometry::{closest_point_on_segment, GeometryResolver, RouteMatch};
pub use map::{MapSurface, MercatorSurface};
pub use position::{
    ControllerStats, GeoVisual, PopupContent, PositionController, PositionControllerConfig,
    PositionOptions, PositionState,
};
pub use viewport::{is_near_edge, should_pan, EdgeMargins, PopupFootprint, ViewportPolicy};
