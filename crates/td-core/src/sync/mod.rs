//! Cross-view hover synchronization

mod hub;
mod position;
mod view;

pub use hub::{HubStats, SyncHub};
pub use position::{HoverPosition, SyncEvent, ViewId};
pub use view::{ChartCapabilities, ChartView, GeoView};
