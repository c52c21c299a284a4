//! Hover synchronization hub implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::{ChartCapabilities, ChartView, GeoView, HoverPosition, SyncEvent, ViewId};

/// Counters describing hub traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub hover_broadcasts: u64,
    pub hover_out_broadcasts: u64,
    /// Individual view updates performed
    pub deliveries: u64,
    /// Broadcasts issued from inside a broadcast and dropped
    pub reentrant_dropped: u64,
    /// Views skipped for lacking the needed entry point
    pub missing_capability: u64,
}

struct ChartEntry {
    handle: Weak<dyn ChartView>,
    capabilities: ChartCapabilities,
}

struct GeoEntry {
    id: ViewId,
    handle: Weak<dyn GeoView>,
}

/// Fans hover events from one view out to every other registered view.
///
/// Owned by the host and shared with each view at construction. Views are
/// held weakly and pruned once dropped. Dispatch never holds a lock while
/// view code runs, and a broadcast issued from inside a broadcast is
/// dropped, so a misbehaving view cannot start an update loop.
///
/// The hub is meant to be driven from the host's event thread. There is one
/// dispatch flag per hub, so a broadcast issued from another thread while a
/// fan-out is in flight is dropped like a nested one.
pub struct SyncHub {
    charts: RwLock<IndexMap<ViewId, ChartEntry>>,
    geo: RwLock<Option<GeoEntry>>,
    dispatching: AtomicBool,
    stats: Mutex<HubStats>,
    last_event: Mutex<Option<SyncEvent>>,
}

/// Clears the dispatch flag on every exit path
struct DispatchGuard<'a>(&'a AtomicBool);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            charts: RwLock::new(IndexMap::new()),
            geo: RwLock::new(None),
            dispatching: AtomicBool::new(false),
            stats: Mutex::new(HubStats::default()),
            last_event: Mutex::new(None),
        }
    }

    /// Register a chart; an existing registration with the same id is replaced
    pub fn register_chart<V: ChartView + 'static>(&self, view_id: impl Into<ViewId>, view: &Arc<V>) {
        let view_id = view_id.into();
        let capabilities = view.capabilities();
        let handle = Arc::downgrade(view) as Weak<dyn ChartView>;

        if !capabilities.hover_index && !capabilities.hover_timestamp {
            warn!("Chart '{}' registered without any hover entry point", view_id);
        }
        info!("Registered chart '{}' ({:?})", view_id, capabilities);

        self.charts.write().insert(view_id, ChartEntry { handle, capabilities });
    }

    /// Register the map view under its own id, replacing any previous one
    pub fn register_geo_view<V: GeoView + 'static>(&self, view: &Arc<V>) {
        let id = view.view_id().clone();
        let handle = Arc::downgrade(view) as Weak<dyn GeoView>;
        info!("Registered geo view '{}'", id);
        *self.geo.write() = Some(GeoEntry { id, handle });
    }

    /// Remove one chart without tearing it down
    pub fn unregister(&self, view_id: &str) -> bool {
        let removed = self.charts.write().shift_remove(view_id).is_some();
        if !removed {
            let mut geo = self.geo.write();
            if geo.as_ref().is_some_and(|g| g.id.as_str() == view_id) {
                *geo = None;
                return true;
            }
        }
        removed
    }

    /// Number of live charts
    pub fn view_count(&self) -> usize {
        self.live_charts().len()
    }

    pub fn has_geo_view(&self) -> bool {
        self.live_geo().is_some()
    }

    pub fn stats(&self) -> HubStats {
        *self.stats.lock()
    }

    pub fn last_event(&self) -> Option<SyncEvent> {
        self.last_event.lock().clone()
    }

    /// Broadcast a hover to every view except `source`.
    ///
    /// Charts get their timestamp entry point when the position carries a
    /// timestamp and they support it, else the index entry point. The geo
    /// view is always moved and shown.
    pub fn sync_hover(&self, position: impl Into<HoverPosition>, source: &str) {
        let position = position.into();
        let Some(_guard) = self.enter_dispatch("sync_hover", source) else {
            return;
        };

        let mut delivered = 0;
        let mut missing = 0;
        for (id, view, capabilities) in self.live_charts() {
            if id.as_str() == source {
                continue;
            }
            match position.timestamp {
                Some(timestamp) if capabilities.hover_timestamp => view.sync_hover_ts(timestamp),
                _ if capabilities.hover_index => view.sync_hover(position.index),
                _ => {
                    warn!("Chart '{}' cannot take hover position {:?}, skipped", id, position);
                    missing += 1;
                    continue;
                }
            }
            delivered += 1;
        }

        if let Some((id, geo)) = self.live_geo() {
            if id.as_str() != source {
                geo.show_position(&position);
                delivered += 1;
            }
        }

        debug!("Hover from '{}' at {:?} delivered to {} views", source, position, delivered);

        let mut stats = self.stats.lock();
        stats.hover_broadcasts += 1;
        stats.deliveries += delivered;
        stats.missing_capability += missing;
        drop(stats);

        *self.last_event.lock() = Some(SyncEvent::HoverIn {
            source: ViewId::from(source),
            position,
        });
    }

    /// Broadcast the end of a hover to every view except `source`
    pub fn sync_hover_out(&self, source: &str) {
        let Some(_guard) = self.enter_dispatch("sync_hover_out", source) else {
            return;
        };

        let mut delivered = 0;
        for (id, view, capabilities) in self.live_charts() {
            if id.as_str() == source || !capabilities.hover_out {
                continue;
            }
            view.sync_hover_out();
            delivered += 1;
        }

        if let Some((id, geo)) = self.live_geo() {
            if id.as_str() != source {
                geo.clear_position();
                delivered += 1;
            }
        }

        debug!("Hover-out from '{}' delivered to {} views", source, delivered);

        let mut stats = self.stats.lock();
        stats.hover_out_broadcasts += 1;
        stats.deliveries += delivered;
        drop(stats);

        *self.last_event.lock() = Some(SyncEvent::HoverOut {
            source: ViewId::from(source),
        });
    }

    /// Tell every overlay-aware chart that an overlay was toggled
    pub fn broadcast_overlay_change(&self, overlay_id: &str, visible: bool) {
        let mut delivered = 0;
        for (_, view, capabilities) in self.live_charts() {
            if capabilities.overlays {
                view.update_overlay_visibility(overlay_id, visible);
                delivered += 1;
            }
        }
        debug!("Overlay '{}' visible={} delivered to {} charts", overlay_id, visible, delivered);

        *self.last_event.lock() = Some(SyncEvent::OverlayChanged {
            overlay_id: overlay_id.to_string(),
            visible,
        });
    }

    /// Drop every registration, tearing views down best-effort.
    ///
    /// A failing teardown is logged and the remaining views are still torn
    /// down. Safe to call repeatedly.
    pub fn unregister_all(&self) {
        let charts: Vec<(ViewId, ChartEntry)> = self.charts.write().drain(..).collect();
        let geo = self.geo.write().take();

        if charts.is_empty() && geo.is_none() {
            return;
        }

        for (id, entry) in charts {
            if !entry.capabilities.destroy {
                continue;
            }
            if let Some(view) = entry.handle.upgrade() {
                if let Err(e) = view.destroy() {
                    error!("Failed to destroy chart '{}': {:#}", id, e);
                }
            }
        }

        if let Some(entry) = geo {
            if let Some(view) = entry.handle.upgrade() {
                if let Err(e) = view.destroy() {
                    error!("Failed to destroy geo view '{}': {:#}", entry.id, e);
                }
            }
        }

        info!("Unregistered all views");
    }

    fn enter_dispatch(&self, what: &str, source: &str) -> Option<DispatchGuard<'_>> {
        if self.dispatching.swap(true, Ordering::AcqRel) {
            warn!("Re-entrant {} from '{}' dropped", what, source);
            self.stats.lock().reentrant_dropped += 1;
            return None;
        }
        Some(DispatchGuard(&self.dispatching))
    }

    /// Snapshot live charts in registration order, pruning dropped ones
    fn live_charts(&self) -> Vec<(ViewId, Arc<dyn ChartView>, ChartCapabilities)> {
        let mut charts = self.charts.write();
        charts.retain(|_, entry| entry.handle.strong_count() > 0);
        charts
            .iter()
            .filter_map(|(id, entry)| {
                entry
                    .handle
                    .upgrade()
                    .map(|view| (id.clone(), view, entry.capabilities))
            })
            .collect()
    }

    fn live_geo(&self) -> Option<(ViewId, Arc<dyn GeoView>)> {
        let mut geo = self.geo.write();
        let view = geo.as_ref().and_then(|entry| entry.handle.upgrade());
        match view {
            Some(view) => geo.as_ref().map(|entry| (entry.id.clone(), view)),
            None => {
                *geo = None;
                None
            }
        }
    }
}

impl Default for SyncHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Chart that records every call it receives
    #[derive(Default)]
    struct RecordingChart {
        capabilities: ChartCapabilities,
        calls: Mutex<Vec<String>>,
        fail_destroy: bool,
        /// Hub to call back into from inside a handler
        echo_to: Mutex<Option<Arc<SyncHub>>>,
    }

    impl RecordingChart {
        fn with(capabilities: ChartCapabilities) -> Arc<Self> {
            Arc::new(Self {
                capabilities,
                ..Self::default()
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl ChartView for RecordingChart {
        fn capabilities(&self) -> ChartCapabilities {
            self.capabilities
        }

        fn sync_hover(&self, index: f64) {
            self.calls.lock().push(format!("hover:{index}"));
            if let Some(hub) = self.echo_to.lock().clone() {
                hub.sync_hover(index, "echo");
            }
        }

        fn sync_hover_ts(&self, timestamp: i64) {
            self.calls.lock().push(format!("hover_ts:{timestamp}"));
        }

        fn sync_hover_out(&self) {
            self.calls.lock().push("out".to_string());
        }

        fn update_overlay_visibility(&self, overlay_id: &str, visible: bool) {
            self.calls.lock().push(format!("overlay:{overlay_id}:{visible}"));
        }

        fn destroy(&self) -> anyhow::Result<()> {
            self.calls.lock().push("destroy".to_string());
            if self.fail_destroy {
                anyhow::bail!("teardown failed");
            }
            Ok(())
        }
    }

    struct RecordingGeo {
        id: ViewId,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingGeo {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: ViewId::from(id),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl GeoView for RecordingGeo {
        fn view_id(&self) -> &ViewId {
            &self.id
        }

        fn show_position(&self, position: &HoverPosition) {
            self.calls.lock().push(format!("show:{}:{:?}", position.index, position.timestamp));
        }

        fn clear_position(&self) {
            self.calls.lock().push("clear".to_string());
        }
    }

    #[test]
    fn test_hover_skips_source_and_prefers_timestamp() {
        let hub = SyncHub::new();
        let a = RecordingChart::with(ChartCapabilities::basic().with_timestamp());
        let b = RecordingChart::with(ChartCapabilities::basic().with_timestamp());
        let c = RecordingChart::with(ChartCapabilities::basic());
        hub.register_chart("chartA", &a);
        hub.register_chart("chartB", &b);
        hub.register_chart("chartC", &c);

        hub.sync_hover((5.0, 1000), "chartA");

        assert!(a.calls().is_empty());
        assert_eq!(b.calls(), vec!["hover_ts:1000"]);
        assert_eq!(c.calls(), vec!["hover:5"]);
        assert_eq!(hub.stats().deliveries, 2);
    }

    #[test]
    fn test_bare_index_uses_index_entry_point() {
        let hub = SyncHub::new();
        let b = RecordingChart::with(ChartCapabilities::basic().with_timestamp());
        hub.register_chart("chartB", &b);

        hub.sync_hover(3u64, "chartA");
        assert_eq!(b.calls(), vec!["hover:3"]);
    }

    #[test]
    fn test_missing_capability_is_skipped() {
        let hub = SyncHub::new();
        let mute = RecordingChart::with(ChartCapabilities::default());
        let ts_only = RecordingChart::with(ChartCapabilities::default().with_timestamp());
        hub.register_chart("mute", &mute);
        hub.register_chart("tsOnly", &ts_only);

        hub.sync_hover(2u64, "chartA");

        assert!(mute.calls().is_empty());
        assert!(ts_only.calls().is_empty());
        assert_eq!(hub.stats().missing_capability, 2);
    }

    #[test]
    fn test_reentrant_broadcast_is_dropped() {
        let hub = Arc::new(SyncHub::new());
        let echo = RecordingChart::with(ChartCapabilities::basic());
        *echo.echo_to.lock() = Some(hub.clone());
        let other = RecordingChart::with(ChartCapabilities::basic());
        hub.register_chart("echo", &echo);
        hub.register_chart("other", &other);

        hub.sync_hover(5u64, "chartA");

        assert_eq!(echo.calls(), vec!["hover:5"]);
        assert_eq!(other.calls(), vec!["hover:5"]);
        let stats = hub.stats();
        assert_eq!(stats.hover_broadcasts, 1);
        assert_eq!(stats.reentrant_dropped, 1);

        // The guard is released once the outer broadcast returns
        *echo.echo_to.lock() = None;
        hub.sync_hover(6u64, "chartA");
        assert_eq!(other.calls(), vec!["hover:5", "hover:6"]);
    }

    /// Chart whose handler broadcasts from a worker thread
    struct ThreadedEcho {
        hub: Arc<SyncHub>,
    }

    impl ChartView for ThreadedEcho {
        fn capabilities(&self) -> ChartCapabilities {
            ChartCapabilities::basic()
        }

        fn sync_hover(&self, index: f64) {
            let hub = self.hub.clone();
            std::thread::spawn(move || hub.sync_hover(index + 1.0, "worker"))
                .join()
                .unwrap();
        }
    }

    #[test]
    fn test_broadcast_from_other_thread_during_fanout_is_dropped() {
        let hub = Arc::new(SyncHub::new());
        let echo = Arc::new(ThreadedEcho { hub: hub.clone() });
        hub.register_chart("echo", &echo);

        hub.sync_hover(1u64, "chartA");

        let stats = hub.stats();
        assert_eq!(stats.hover_broadcasts, 1);
        assert_eq!(stats.reentrant_dropped, 1);
        assert_eq!(hub.last_event(), Some(SyncEvent::HoverIn {
            source: "chartA".into(),
            position: HoverPosition::at_index(1.0),
        }));
    }

    #[test]
    fn test_geo_view_registers_under_its_own_id() {
        let hub = SyncHub::new();
        let geo = RecordingGeo::new("map");
        hub.register_geo_view(&geo);

        // Its own broadcasts never come back to it
        hub.sync_hover((3.0, 3_000), "map");
        assert!(geo.calls.lock().is_empty());
        assert_eq!(hub.stats().deliveries, 0);

        hub.sync_hover((3.0, 3_000), "chartA");
        assert_eq!(*geo.calls.lock(), vec!["show:3:Some(3000)"]);
    }

    #[test]
    fn test_geo_view_shown_and_cleared() {
        let hub = SyncHub::new();
        let geo = RecordingGeo::new("map");
        hub.register_geo_view(&geo);

        hub.sync_hover((1.0, 1000), "chartA");
        hub.sync_hover_out("chartA");
        // Never echoed back to itself
        hub.sync_hover(2u64, "map");
        hub.sync_hover_out("map");

        assert_eq!(*geo.calls.lock(), vec!["show:1:Some(1000)", "clear"]);
        assert_eq!(hub.last_event(), Some(SyncEvent::HoverOut { source: "map".into() }));
    }

    #[test]
    fn test_hover_out_only_reaches_capable_charts() {
        let hub = SyncHub::new();
        let capable = RecordingChart::with(ChartCapabilities::basic());
        let no_out = RecordingChart::with(ChartCapabilities {
            hover_index: true,
            ..ChartCapabilities::default()
        });
        hub.register_chart("capable", &capable);
        hub.register_chart("noOut", &no_out);

        hub.sync_hover_out("chartA");

        assert_eq!(capable.calls(), vec!["out"]);
        assert!(no_out.calls().is_empty());
    }

    #[test]
    fn test_reregistering_replaces_handle() {
        let hub = SyncHub::new();
        let first = RecordingChart::with(ChartCapabilities::basic());
        let second = RecordingChart::with(ChartCapabilities::basic());
        hub.register_chart("chart", &first);
        hub.register_chart("chart", &second);

        hub.sync_hover(1u64, "other");

        assert!(first.calls().is_empty());
        assert_eq!(second.calls(), vec!["hover:1"]);
        assert_eq!(hub.view_count(), 1);
    }

    #[test]
    fn test_dropped_views_are_pruned() {
        let hub = SyncHub::new();
        let chart = RecordingChart::with(ChartCapabilities::basic());
        hub.register_chart("chart", &chart);
        assert_eq!(hub.view_count(), 1);

        drop(chart);
        assert_eq!(hub.view_count(), 0);
        hub.sync_hover(1u64, "other");
        assert_eq!(hub.stats().deliveries, 0);
    }

    #[test]
    fn test_overlay_change_reaches_overlay_charts() {
        let hub = SyncHub::new();
        let aware = RecordingChart::with(ChartCapabilities::basic().with_overlays());
        let plain = RecordingChart::with(ChartCapabilities::basic());
        hub.register_chart("aware", &aware);
        hub.register_chart("plain", &plain);

        hub.broadcast_overlay_change("speed", false);

        assert_eq!(aware.calls(), vec!["overlay:speed:false"]);
        assert!(plain.calls().is_empty());
    }

    #[test]
    fn test_unregister_all_survives_failed_teardown() {
        let hub = SyncHub::new();
        let failing = Arc::new(RecordingChart {
            capabilities: ChartCapabilities::basic().with_destroy(),
            fail_destroy: true,
            ..RecordingChart::default()
        });
        let healthy = RecordingChart::with(ChartCapabilities::basic().with_destroy());
        hub.register_chart("failing", &failing);
        hub.register_chart("healthy", &healthy);

        hub.unregister_all();
        hub.unregister_all();

        assert_eq!(failing.calls(), vec!["destroy"]);
        assert_eq!(healthy.calls(), vec!["destroy"]);
        assert_eq!(hub.view_count(), 0);
        assert!(!hub.has_geo_view());
    }

    #[test]
    fn test_unregister_single_view() {
        let hub = SyncHub::new();
        let chart = RecordingChart::with(ChartCapabilities::basic());
        let geo = RecordingGeo::new("map");
        hub.register_chart("chart", &chart);
        hub.register_geo_view(&geo);

        assert!(hub.unregister("chart"));
        assert!(hub.unregister("map"));
        assert!(!hub.unregister("missing"));
        assert_eq!(hub.view_count(), 0);
        assert!(!hub.has_geo_view());
    }
}
