//! Demo mode for the replay host
//! Creates a synthetic ride and chart views that log what they receive

use parking_lot::Mutex;
use td_core::{ChartCapabilities, ChartView};
use td_data::Sample;
use tracing::{debug, info};

/// Start of the synthetic ride, 2023-11-14 22:13:20 UTC
const START_MS: i64 = 1_700_000_000_000;

/// One sample per second on a loop around a park, with a GPS dropout
/// every 40 samples
pub fn demo_route(count: u64) -> Vec<Sample> {
    let (center_lat, center_lng) = (48.2082, 16.3738);

    (0..count)
        .map(|i| {
            let t = i as f64;
            let angle = t / count as f64 * std::f64::consts::TAU;

            // Accelerate out of corners, slow into them
            let speed = 22.0 + 12.0 * (angle * 3.0).sin() + 3.0 * (t * 0.7).cos();
            let battery = 95.0 - 60.0 * t / count as f64;
            let pwm = (speed * 2.4).clamp(0.0, 100.0);
            let elevation = 170.0 + 15.0 * (angle * 2.0).sin();

            let sample = Sample::new(i, START_MS + i as i64 * 1_000)
                .with_field("speed", speed)
                .with_field("battery", battery)
                .with_field("pwm", pwm)
                .with_field("elevation", elevation);

            if i % 40 == 39 {
                sample
            } else {
                sample.with_position(
                    center_lat + 0.006 * angle.sin(),
                    center_lng + 0.009 * angle.cos(),
                )
            }
        })
        .collect()
}

/// Chart stand-in that counts and logs sync calls
pub struct LoggingChart {
    name: String,
    capabilities: ChartCapabilities,
    counts: Mutex<ChartCounts>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChartCounts {
    pub hovers: u64,
    pub hover_outs: u64,
    pub overlay_changes: u64,
}

impl LoggingChart {
    pub fn new(name: impl Into<String>, capabilities: ChartCapabilities) -> Self {
        Self {
            name: name.into(),
            capabilities,
            counts: Mutex::new(ChartCounts::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn counts(&self) -> ChartCounts {
        *self.counts.lock()
    }
}

impl ChartView for LoggingChart {
    fn capabilities(&self) -> ChartCapabilities {
        self.capabilities
    }

    fn sync_hover(&self, index: f64) {
        debug!("[{}] hover at index {:.2}", self.name, index);
        self.counts.lock().hovers += 1;
    }

    fn sync_hover_ts(&self, timestamp: i64) {
        debug!("[{}] hover at {} ms", self.name, timestamp);
        self.counts.lock().hovers += 1;
    }

    fn sync_hover_out(&self) {
        debug!("[{}] hover out", self.name);
        self.counts.lock().hover_outs += 1;
    }

    fn update_overlay_visibility(&self, overlay_id: &str, visible: bool) {
        info!("[{}] overlay '{}' visible={}", self.name, overlay_id, visible);
        self.counts.lock().overlay_changes += 1;
    }

    fn destroy(&self) -> anyhow::Result<()> {
        info!("[{}] destroyed", self.name);
        Ok(())
    }
}
