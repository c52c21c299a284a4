//! Overlay recipes for route coloring

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::RouteError;

/// How one overlay colors the route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayRecipe {
    /// Sample field the overlay reads
    pub field: String,

    /// Name of the color function applied by the renderer
    pub color_function: String,

    /// Ascending bucket boundaries
    #[serde(default)]
    pub thresholds: Vec<f64>,
}

impl OverlayRecipe {
    pub fn new(field: impl Into<String>, color_function: impl Into<String>, thresholds: Vec<f64>) -> Self {
        Self {
            field: field.into(),
            color_function: color_function.into(),
            thresholds,
        }
    }

    /// Bucket of a value: the number of thresholds at or below it
    pub fn bucket_of(&self, value: f64) -> usize {
        self.thresholds.iter().filter(|&&t| t <= value).count()
    }

    /// Bucket of a sample field, bucket 0 when the field is missing
    pub fn bucket_for(&self, fields: &ahash::AHashMap<String, f64>) -> usize {
        fields
            .get(&self.field)
            .map(|&value| self.bucket_of(value))
            .unwrap_or(0)
    }
}

/// Static overlay id -> recipe mapping, read-only once loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayConfig {
    overlays: BTreeMap<String, OverlayRecipe>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        let mut overlays = BTreeMap::new();
        overlays.insert(
            "speed".to_string(),
            OverlayRecipe::new("speed", "speedColor", vec![10.0, 20.0, 30.0, 40.0]),
        );
        overlays.insert(
            "battery".to_string(),
            OverlayRecipe::new("battery", "batteryColor", vec![20.0, 40.0, 60.0, 80.0]),
        );
        overlays.insert(
            "pwm".to_string(),
            OverlayRecipe::new("pwm", "pwmColor", vec![50.0, 70.0, 85.0]),
        );
        overlays.insert(
            "elevation".to_string(),
            OverlayRecipe::new("elevation", "elevationColor", vec![100.0, 250.0, 500.0, 1000.0]),
        );
        Self { overlays }
    }
}

impl OverlayConfig {
    pub fn empty() -> Self {
        Self {
            overlays: BTreeMap::new(),
        }
    }

    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_overlay(mut self, id: impl Into<String>, recipe: OverlayRecipe) -> Self {
        self.overlays.insert(id.into(), recipe);
        self
    }

    pub fn get(&self, id: &str) -> Option<&OverlayRecipe> {
        self.overlays.get(id)
    }

    /// Recipe for `id`, or an error naming the unknown overlay
    pub fn recipe(&self, id: &str) -> crate::Result<&OverlayRecipe> {
        self.get(id).ok_or_else(|| RouteError::UnknownOverlay(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.overlays.keys().map(String::as_str)
    }
}
