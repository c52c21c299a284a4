//! Headless replay of hover synchronization across a route map and charts

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use egui::Vec2;
use td_core::{ChartCapabilities, Clock, ManualClock, SyncHub};
use td_data::{LatLng, OverlayConfig, RouteData};
use td_views::{MapSurface, MercatorSurface, PositionController, PositionControllerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod demo;

use demo::LoggingChart;

/// One frame at 60 fps
const FRAME: Duration = Duration::from_millis(16);

const DEMO_SAMPLES: u64 = 240;

/// Headless replay of hover synchronization
#[derive(Parser)]
#[command(name = "td-replay")]
#[command(about = "Replay a pointer sweep over a route and report hover sync traffic", long_about = None)]
struct Args {
    /// Route samples as a JSON array; a demo ride is generated when absent
    #[arg(long)]
    route: Option<PathBuf>,

    /// Overlay recipes as JSON; the built-in recipes are used when absent
    #[arg(long)]
    overlays: Option<PathBuf>,

    /// Overlay that colors the route segments
    #[arg(long, default_value = "speed")]
    overlay: String,
}

fn load_route(args: &Args) -> Result<RouteData> {
    let overlays = match &args.overlays {
        Some(path) => OverlayConfig::load(path)
            .with_context(|| format!("Failed to load overlays from {}", path.display()))?,
        None => OverlayConfig::default(),
    };
    let recipe = overlays.recipe(&args.overlay)?;

    let route = match &args.route {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read route {}", path.display()))?;
            RouteData::from_json_str(&json, Some(recipe))?
        }
        None => {
            info!("No route given, generating a demo ride");
            RouteData::from_samples(demo::demo_route(DEMO_SAMPLES), Some(recipe))?
        }
    };

    info!(
        "Route colored by '{}': {} samples, {} segments",
        args.overlay,
        route.samples.len(),
        route.segments.len()
    );
    Ok(route)
}

/// Positions the pointer sweeps over, in route order
fn sweep_points(route: &RouteData) -> Vec<LatLng> {
    route
        .segments
        .iter()
        .flat_map(|segment| segment.coords().iter().copied())
        .collect()
}

fn replay(route: RouteData, overlay_id: &str) {
    let hub = Arc::new(SyncHub::new());
    let clock = Arc::new(ManualClock::new());

    let center = route
        .samples
        .samples()
        .iter()
        .find_map(|s| s.position)
        .unwrap_or(LatLng::new(0.0, 0.0));
    let map = Arc::new(MercatorSurface::new(Vec2::new(1024.0, 768.0), center, 15.0));

    let controller = Arc::new(PositionController::new(
        "map",
        map.clone(),
        hub.clone(),
        clock.clone(),
        PositionControllerConfig::default(),
    ));

    let speed_chart = Arc::new(LoggingChart::new(
        "speed",
        ChartCapabilities::basic()
            .with_timestamp()
            .with_overlays()
            .with_destroy(),
    ));
    let battery_chart = Arc::new(LoggingChart::new("battery", ChartCapabilities::basic()));
    hub.register_chart(speed_chart.name(), &speed_chart);
    hub.register_chart(battery_chart.name(), &battery_chart);
    hub.register_geo_view(&controller);

    let sweep = sweep_points(&route);
    let midpoint = route
        .samples
        .samples()
        .get(route.samples.len() / 2)
        .cloned();
    controller.set_route_data(route);

    // Pointer sweep along the route, one move per frame
    let started = clock.now();
    for position in &sweep {
        let cursor = map.lat_lng_to_screen(*position) + Vec2::new(0.0, -3.0);
        controller.on_pointer_move(cursor);
        clock.advance(FRAME);
        controller.poll_timers();
    }
    controller.on_pointer_leave();
    for _ in 0..12 {
        clock.advance(FRAME);
        controller.poll_timers();
    }
    info!(
        "Swept {} points in {:?} of replay time, map now {:?}",
        sweep.len(),
        clock.now() - started,
        controller.state()
    );

    // A chart takes over the hover
    match midpoint {
        Some(sample) => {
            hub.sync_hover((sample.index as f64, sample.timestamp), speed_chart.name());
            if let Some(popup) = controller.visual().popup {
                info!("Map popup '{}' for sample #{}", popup.title, popup.index);
            }
            hub.sync_hover_out(speed_chart.name());
        }
        None => warn!("Route is empty, skipping chart hover"),
    }

    hub.broadcast_overlay_change(overlay_id, false);

    let hub_stats = hub.stats();
    let controller_stats = controller.stats();
    println!("Replay summary");
    println!(
        "  hub: {} hovers, {} hover-outs, {} deliveries, {} re-entrant dropped, {} skipped",
        hub_stats.hover_broadcasts,
        hub_stats.hover_out_broadcasts,
        hub_stats.deliveries,
        hub_stats.reentrant_dropped,
        hub_stats.missing_capability
    );
    println!(
        "  map: {} resolutions, {} throttled, {} pans ({} recorded), {} broadcasts",
        controller_stats.resolutions,
        controller_stats.throttled,
        controller_stats.pans,
        map.pans().len(),
        controller_stats.broadcasts
    );
    for chart in [&speed_chart, &battery_chart] {
        let counts = chart.counts();
        println!(
            "  {}: {} hovers, {} hover-outs, {} overlay changes",
            chart.name(),
            counts.hovers,
            counts.hover_outs,
            counts.overlay_changes
        );
    }

    hub.unregister_all();
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting telemetry hover replay");

    let args = Args::parse();
    let route = load_route(&args)?;
    replay(route, &args.overlay);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults_and_paths() {
        let args = Args::try_parse_from(["td-replay"]).unwrap();
        assert!(args.route.is_none());
        assert!(args.overlays.is_none());
        assert_eq!(args.overlay, "speed");

        let args = Args::try_parse_from([
            "td-replay",
            "--route",
            "ride.json",
            "--overlay",
            "battery",
        ])
        .unwrap();
        assert_eq!(args.route, Some(PathBuf::from("ride.json")));
        assert_eq!(args.overlay, "battery");
    }

    #[test]
    fn test_cli_rejects_unknown_argument() {
        assert!(Args::try_parse_from(["td-replay", "--zoom", "3"]).is_err());
    }
}
