//! Route segmentation
//!
//! A route is rendered as runs of samples sharing one color bucket. The
//! runs are the unit of geometry search, so each keeps its samples for
//! interpolation.

use std::sync::Arc;

use tracing::debug;

use crate::{LatLng, OverlayRecipe, Sample, SampleIndex};

/// A contiguous run of positioned samples drawn with one style
#[derive(Debug, Clone)]
pub struct RouteSegment {
    bucket: usize,
    samples: Vec<Arc<Sample>>,
    coords: Vec<LatLng>,
}

impl RouteSegment {
    /// Create a segment; samples without a position are skipped
    pub fn new(bucket: usize, samples: Vec<Arc<Sample>>) -> Self {
        let samples: Vec<Arc<Sample>> = samples.into_iter().filter(|s| s.position.is_some()).collect();
        let coords = samples.iter().filter_map(|s| s.position).collect();
        Self {
            bucket,
            samples,
            coords,
        }
    }

    pub fn bucket(&self) -> usize {
        self.bucket
    }

    pub fn samples(&self) -> &[Arc<Sample>] {
        &self.samples
    }

    pub fn coords(&self) -> &[LatLng] {
        &self.coords
    }

    /// Number of line pieces between consecutive coords
    pub fn sub_segment_count(&self) -> usize {
        self.coords.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

/// Split the positioned samples of a route into maximal runs of equal bucket.
///
/// Without a recipe the whole route is a single segment. Each segment after
/// the first starts with the last sample of the one before it, so the drawn
/// route has no gaps at bucket changes.
pub fn build_segments(index: &SampleIndex, recipe: Option<&OverlayRecipe>) -> Vec<RouteSegment> {
    let mut segments = Vec::new();
    let mut current: Vec<Arc<Sample>> = Vec::new();
    let mut current_bucket = 0;

    for sample in index.samples().iter().filter(|s| s.position.is_some()) {
        let bucket = recipe.map(|r| r.bucket_for(&sample.fields)).unwrap_or(0);
        if !current.is_empty() && bucket != current_bucket {
            let boundary = current.last().cloned();
            segments.push(RouteSegment::new(current_bucket, std::mem::take(&mut current)));
            current.extend(boundary);
        }
        current_bucket = bucket;
        current.push(sample.clone());
    }
    if !current.is_empty() {
        segments.push(RouteSegment::new(current_bucket, current));
    }

    debug!(
        "Built {} route segments from {} samples ({})",
        segments.len(),
        index.len(),
        recipe.map(|r| r.field.as_str()).unwrap_or("no overlay")
    );
    segments
}

/// Everything a geo view needs for one loaded route
#[derive(Debug, Clone, Default)]
pub struct RouteData {
    pub samples: SampleIndex,
    pub segments: Vec<RouteSegment>,
}

impl RouteData {
    pub fn new(samples: SampleIndex, recipe: Option<&OverlayRecipe>) -> Self {
        let segments = build_segments(&samples, recipe);
        Self { samples, segments }
    }

    /// Index and segment already-parsed samples
    pub fn from_samples(samples: Vec<Sample>, recipe: Option<&OverlayRecipe>) -> crate::Result<Self> {
        Ok(Self::new(SampleIndex::new(samples)?, recipe))
    }

    /// Route from a JSON array of samples
    pub fn from_json_str(json: &str, recipe: Option<&OverlayRecipe>) -> crate::Result<Self> {
        let samples: Vec<Sample> = serde_json::from_str(json)?;
        Self::from_samples(samples, recipe)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> Vec<Sample> {
        vec![
            Sample::new(0, 0).with_position(0.0, 0.0).with_field("speed", 5.0),
            Sample::new(1, 1_000).with_position(0.0, 1.0).with_field("speed", 8.0),
            Sample::new(2, 2_000).with_field("speed", 9.0),
            Sample::new(3, 3_000).with_position(0.0, 2.0).with_field("speed", 15.0),
            Sample::new(4, 4_000).with_position(0.0, 3.0).with_field("speed", 16.0),
            Sample::new(5, 5_000).with_position(0.0, 4.0).with_field("speed", 3.0),
        ]
    }

    #[test]
    fn test_single_segment_without_overlay() {
        let data = RouteData::from_samples(route(), None).unwrap();
        assert_eq!(data.segments.len(), 1);
        // Sample 2 has no fix
        assert_eq!(data.segments[0].coords().len(), 5);
        assert_eq!(data.segments[0].sub_segment_count(), 4);
    }

    #[test]
    fn test_segments_split_on_bucket_change() {
        let recipe = OverlayRecipe::new("speed", "speedColor", vec![10.0]);
        let data = RouteData::from_samples(route(), Some(&recipe)).unwrap();

        let shape: Vec<(usize, Vec<u64>)> = data
            .segments
            .iter()
            .map(|s| (s.bucket(), s.samples().iter().map(|x| x.index).collect()))
            .collect();
        // Boundary samples open the following segment
        assert_eq!(
            shape,
            vec![(0, vec![0, 1]), (1, vec![1, 3, 4]), (0, vec![4, 5])]
        );
        assert_eq!(data.segments[1].coords().first(), data.segments[0].coords().last());
        assert_eq!(data.segments[2].sub_segment_count(), 1);
    }

    #[test]
    fn test_route_from_json() {
        let data = RouteData::from_json_str(
            r#"[
                { "index": 0, "timestamp": 0, "position": { "lat": 1.0, "lng": 2.0 }, "fields": { "speed": 12.5 } },
                { "index": 1, "timestamp": 500 }
            ]"#,
            None,
        )
        .unwrap();

        assert_eq!(data.samples.len(), 2);
        assert_eq!(data.samples.by_exact_index(0).unwrap().field("speed"), Some(12.5));
        assert_eq!(data.segments[0].coords(), &[LatLng::new(1.0, 2.0)]);
    }
}
