//! Position indicator state machine for the route map

mod config;
mod controller;
mod popup;

pub use config::{PositionControllerConfig, PositionOptions};
pub use controller::{ControllerStats, GeoVisual, PositionController, PositionState};
pub use popup::PopupContent;
