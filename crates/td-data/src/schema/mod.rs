//! Sample records and their resolved forms

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Linear blend towards `other`; `t` is not clamped
    pub fn lerp(self, other: LatLng, t: f64) -> LatLng {
        LatLng {
            lat: self.lat + (other.lat - self.lat) * t,
            lng: self.lng + (other.lng - self.lng) * t,
        }
    }
}

/// One telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Canonical ordering key, unique within a route
    pub index: u64,

    /// Epoch milliseconds
    pub timestamp: i64,

    /// Geographic position, absent for samples without a GPS fix
    #[serde(default)]
    pub position: Option<LatLng>,

    /// Telemetry channels (speed, battery, ...)
    #[serde(default)]
    pub fields: AHashMap<String, f64>,
}

impl Sample {
    pub fn new(index: u64, timestamp: i64) -> Self {
        Self {
            index,
            timestamp,
            position: None,
            fields: AHashMap::new(),
        }
    }

    pub fn with_position(mut self, lat: f64, lng: f64) -> Self {
        self.position = Some(LatLng::new(lat, lng));
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }
}

/// A synthetic sample blended between two real neighbours
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedSample {
    /// Fractional index, never a valid exact-lookup key
    pub index: f64,
    pub timestamp: i64,
    pub position: Option<LatLng>,
    pub fields: AHashMap<String, f64>,
}

impl InterpolatedSample {
    /// Blend `a` towards `b` by `t` in [0, 1].
    ///
    /// Channels present on both sides are blended linearly, channels present
    /// on one side only are taken from whichever sample is nearer.
    pub fn between(a: &Sample, b: &Sample, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let a_is_nearer = t <= 0.5;
        let nearer = if a_is_nearer { a } else { b };

        let mut fields = AHashMap::with_capacity(a.fields.len().max(b.fields.len()));
        for (name, &va) in &a.fields {
            match b.fields.get(name) {
                Some(&vb) => {
                    fields.insert(name.clone(), va + (vb - va) * t);
                }
                None if a_is_nearer => {
                    fields.insert(name.clone(), va);
                }
                None => {}
            }
        }
        if !a_is_nearer {
            for (name, &vb) in &b.fields {
                fields.entry(name.clone()).or_insert(vb);
            }
        }

        let position = match (a.position, b.position) {
            (Some(pa), Some(pb)) => Some(pa.lerp(pb, t)),
            _ => nearer.position,
        };

        let span = (b.timestamp - a.timestamp) as f64;
        Self {
            index: a.index as f64 + (b.index as f64 - a.index as f64) * t,
            timestamp: a.timestamp + (span * t).round() as i64,
            position,
            fields,
        }
    }
}

/// The sample a view currently points at
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSample {
    /// A record from the loaded route
    Real(Arc<Sample>),
    /// A point between two records, produced by route projection
    Interpolated(InterpolatedSample),
}

impl ResolvedSample {
    pub fn index(&self) -> f64 {
        match self {
            ResolvedSample::Real(sample) => sample.index as f64,
            ResolvedSample::Interpolated(sample) => sample.index,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            ResolvedSample::Real(sample) => sample.timestamp,
            ResolvedSample::Interpolated(sample) => sample.timestamp,
        }
    }

    pub fn position(&self) -> Option<LatLng> {
        match self {
            ResolvedSample::Real(sample) => sample.position,
            ResolvedSample::Interpolated(sample) => sample.position,
        }
    }

    pub fn fields(&self) -> &AHashMap<String, f64> {
        match self {
            ResolvedSample::Real(sample) => &sample.fields,
            ResolvedSample::Interpolated(sample) => &sample.fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields().get(name).copied()
    }

    pub fn is_interpolated(&self) -> bool {
        matches!(self, ResolvedSample::Interpolated(_))
    }

    /// Key usable with `SampleIndex::by_exact_index`, only for real samples
    pub fn lookup_key(&self) -> Option<u64> {
        match self {
            ResolvedSample::Real(sample) => Some(sample.index),
            ResolvedSample::Interpolated(_) => None,
        }
    }
}

impl From<Arc<Sample>> for ResolvedSample {
    fn from(sample: Arc<Sample>) -> Self {
        ResolvedSample::Real(sample)
    }
}
