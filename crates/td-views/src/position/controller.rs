//! Position controller implementation

use std::sync::Arc;
use std::time::Instant;

use egui::Pos2;
use parking_lot::Mutex;
use td_core::{Clock, DeferredAction, GeoView, HoverPosition, SyncHub, Throttle, ViewId};
use td_data::{LatLng, ResolvedSample, RouteData};
use tracing::{debug, info};

use super::{PopupContent, PositionControllerConfig, PositionOptions};
use crate::{GeometryResolver, MapSurface, ViewportPolicy};

/// Hover state of the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionState {
    /// No active position
    #[default]
    Idle,
    /// The pointer is over the route
    Hovering,
    /// A position is held programmatically, e.g. by another view
    Pinned,
}

/// What the map should currently draw
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoVisual {
    pub indicator: Option<LatLng>,
    pub indicator_visible: bool,
    pub popup: Option<PopupContent>,
}

/// Counters describing controller work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Pointer moves resolved against the route geometry
    pub resolutions: u64,
    /// Pointer moves dropped by the throttle
    pub throttled: u64,
    pub pans: u64,
    pub broadcasts: u64,
}

struct ControllerState {
    route: RouteData,
    state: PositionState,
    current: Option<ResolvedSample>,
    visual: GeoVisual,
    pointer_throttle: Throttle,
    hide_timer: DeferredAction,
    viewport: ViewportPolicy,
    stats: ControllerStats,
}

impl ControllerState {
    fn reset(&mut self) {
        self.state = PositionState::Idle;
        self.current = None;
        self.visual = GeoVisual::default();
        self.pointer_throttle.reset();
        self.hide_timer.cancel();
        self.viewport.reset();
    }
}

/// Side effects run after the state lock is released
#[derive(Default)]
struct Effects {
    pan_to: Option<LatLng>,
    broadcast: Option<HoverPosition>,
    hover_out: bool,
}

/// Drives the position indicator and popup of one route map.
///
/// Pointer moves are snapped onto the route and broadcast through the hub;
/// positions arriving from the hub update the map without broadcasting.
pub struct PositionController {
    view_id: ViewId,
    map: Arc<dyn MapSurface>,
    resolver: GeometryResolver,
    hub: Arc<SyncHub>,
    clock: Arc<dyn Clock>,
    config: PositionControllerConfig,
    state: Mutex<ControllerState>,
}

impl PositionController {
    pub fn new(
        view_id: impl Into<ViewId>,
        map: Arc<dyn MapSurface>,
        hub: Arc<SyncHub>,
        clock: Arc<dyn Clock>,
        config: PositionControllerConfig,
    ) -> Self {
        let state = ControllerState {
            route: RouteData::default(),
            state: PositionState::Idle,
            current: None,
            visual: GeoVisual::default(),
            pointer_throttle: Throttle::new(config.pointer_throttle),
            hide_timer: DeferredAction::new(config.hide_delay),
            viewport: ViewportPolicy::new(config.margins, config.min_pan_interval),
            stats: ControllerStats::default(),
        };

        Self {
            view_id: view_id.into(),
            resolver: GeometryResolver::new(map.clone()),
            map,
            hub,
            clock,
            config,
            state: Mutex::new(state),
        }
    }

    pub fn view_id(&self) -> &ViewId {
        &self.view_id
    }

    pub fn state(&self) -> PositionState {
        self.state.lock().state
    }

    pub fn visual(&self) -> GeoVisual {
        self.state.lock().visual.clone()
    }

    pub fn current(&self) -> Option<ResolvedSample> {
        self.state.lock().current.clone()
    }

    pub fn stats(&self) -> ControllerStats {
        self.state.lock().stats
    }

    /// Replace the loaded route and start over from Idle
    pub fn set_route_data(&self, route: RouteData) {
        let mut st = self.state.lock();
        info!(
            "Map '{}' loaded route with {} samples in {} segments",
            self.view_id,
            route.samples.len(),
            route.segments.len()
        );
        st.route = route;
        st.reset();
    }

    /// Move to the sample closest to `index`.
    ///
    /// A negative index or an empty route only hides the popup; the
    /// indicator stays unless `hide_indicator` is set.
    pub fn update_position(&self, index: f64, options: PositionOptions) {
        let now = self.clock.now();
        let effects = {
            let mut st = self.state.lock();
            let sample = if index < 0.0 {
                None
            } else {
                st.route.samples.nearest_by_index(index)
            };
            match sample {
                Some(sample) => self.present_sample(&mut st, ResolvedSample::Real(sample), options, now),
                None => {
                    Self::hide_missing(&mut st, options);
                    Effects::default()
                }
            }
        };
        self.apply(effects);
    }

    /// Move to the sample closest to `timestamp` without broadcasting
    pub fn update_position_by_timestamp(&self, timestamp: i64, options: PositionOptions) {
        let now = self.clock.now();
        let options = options.no_sync();
        let effects = {
            let mut st = self.state.lock();
            match st.route.samples.nearest_by_timestamp(timestamp) {
                Some(sample) => self.present_sample(&mut st, ResolvedSample::Real(sample), options, now),
                None => {
                    Self::hide_missing(&mut st, options);
                    Effects::default()
                }
            }
        };
        self.apply(effects);
    }

    /// Pointer moved over the route
    pub fn on_pointer_move(&self, cursor: Pos2) {
        let now = self.clock.now();
        let effects = {
            let mut st = self.state.lock();
            st.hide_timer.cancel();

            if !st.pointer_throttle.should_run(now) {
                st.stats.throttled += 1;
                return;
            }
            st.stats.resolutions += 1;

            let Some((hit, sample)) = self.resolver.resolve(cursor, &st.route.segments) else {
                return;
            };
            debug!(
                "Pointer at {:?} snapped to segment {} at {:.3} ({:.1}px), index {:.2}",
                cursor,
                hit.segment,
                hit.fraction,
                hit.distance,
                sample.index()
            );

            st.state = PositionState::Hovering;
            self.present(
                &mut st,
                sample,
                Some((hit.position, hit.screen)),
                PositionOptions::default().center_if_near_edge(),
                now,
            )
        };
        self.apply(effects);
    }

    /// Pointer left the route; the hover is hidden after the hide delay
    pub fn on_pointer_leave(&self) {
        let now = self.clock.now();
        let mut st = self.state.lock();
        if st.state == PositionState::Hovering {
            st.hide_timer.arm(now);
        }
    }

    /// Run deferred actions that are due. Call once per frame.
    pub fn poll_timers(&self) {
        let now = self.clock.now();
        let hover_ended = {
            let mut st = self.state.lock();
            if st.hide_timer.fire_if_due(now) && st.state == PositionState::Hovering {
                st.state = PositionState::Idle;
                st.current = None;
                st.visual.popup = None;
                true
            } else {
                false
            }
        };

        if hover_ended {
            debug!("Map '{}' hover ended", self.view_id);
            self.apply(Effects {
                hover_out: true,
                ..Effects::default()
            });
        }
    }

    /// Back to Idle with nothing drawn and no pending timers
    pub fn cleanup(&self) {
        self.state.lock().reset();
    }

    fn present_sample(
        &self,
        st: &mut ControllerState,
        sample: ResolvedSample,
        options: PositionOptions,
        now: Instant,
    ) -> Effects {
        // A programmatic position takes over from the pointer, including a
        // hide still pending from the last pointer leave
        st.hide_timer.cancel();
        st.state = PositionState::Pinned;
        let anchor = sample
            .position()
            .map(|position| (position, self.map.lat_lng_to_screen(position)));
        self.present(st, sample, anchor, options, now)
    }

    fn present(
        &self,
        st: &mut ControllerState,
        sample: ResolvedSample,
        anchor: Option<(LatLng, Pos2)>,
        options: PositionOptions,
        now: Instant,
    ) -> Effects {
        let mut effects = Effects::default();

        if let Some((position, screen)) = anchor {
            st.visual.indicator = Some(position);
            st.visual.indicator_visible = true;

            if options.center || options.center_if_near_edge {
                let rect = self.config.popup.rect_at(screen);
                if st.viewport.should_pan(rect, self.map.size(), options.center, now) {
                    st.stats.pans += 1;
                    effects.pan_to = Some(position);
                }
            }
        }

        // Samples without a fix have nowhere to anchor a popup
        st.visual.popup = if options.show_popup && anchor.is_some() {
            Some(PopupContent::from(&sample))
        } else {
            None
        };

        if !options.no_sync {
            st.stats.broadcasts += 1;
            effects.broadcast = Some(HoverPosition::from(&sample));
        }

        st.current = Some(sample);
        effects
    }

    fn hide_missing(st: &mut ControllerState, options: PositionOptions) {
        st.visual.popup = None;
        if options.hide_indicator {
            st.visual.indicator_visible = false;
        }
        if options.unpin {
            st.state = PositionState::Idle;
            st.current = None;
        }
    }

    fn apply(&self, effects: Effects) {
        if let Some(center) = effects.pan_to {
            self.map.pan_to(center, self.config.pan_duration);
        }
        if let Some(position) = effects.broadcast {
            self.hub.sync_hover(position, self.view_id.as_str());
        }
        if effects.hover_out {
            self.hub.sync_hover_out(self.view_id.as_str());
        }
    }
}

impl GeoView for PositionController {
    fn view_id(&self) -> &ViewId {
        &self.view_id
    }

    fn show_position(&self, position: &HoverPosition) {
        let options = PositionOptions::default().center_if_near_edge().no_sync();
        match position.timestamp {
            Some(timestamp) => self.update_position_by_timestamp(timestamp, options),
            None => self.update_position(position.index, options),
        }
    }

    fn clear_position(&self) {
        let mut st = self.state.lock();
        // The local pointer owns the map while hovering
        if st.state == PositionState::Hovering {
            return;
        }
        st.state = PositionState::Idle;
        st.current = None;
        st.visual.popup = None;
    }

    fn destroy(&self) -> anyhow::Result<()> {
        self.cleanup();
        Ok(())
    }
}
