//! Core functionality for the telemetry dashboard
//!
//! This crate provides the cross-view hover synchronization hub, the view
//! role traits it dispatches to, and the timing primitives the views use
//! for throttling and deferred actions.

pub mod clock;
pub mod sync;
pub mod timer;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use sync::{
    ChartCapabilities, ChartView, GeoView, HoverPosition, HubStats, SyncEvent, SyncHub, ViewId,
};
pub use timer::{DeferredAction, Throttle};
