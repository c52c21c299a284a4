//! Route projection and interpolation
//!
//! Cursor hits are computed in screen space: at hit-testing scale a degree
//! of longitude and a degree of latitude are not the same distance, so raw
//! coordinates would pick the wrong segment near bends.

use std::sync::Arc;

use egui::Pos2;
use td_data::{InterpolatedSample, LatLng, ResolvedSample, RouteSegment};

use crate::MapSurface;

/// Positions this close to a whole sample snap to it
const SNAP_EPSILON: f64 = 1e-9;

/// Closest point of a screen-space line piece
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub point: Pos2,
    /// Position along `a -> b`, clamped to [0, 1]
    pub t: f64,
}

/// Project `cursor` onto the line piece `a -> b`
pub fn closest_point_on_segment(cursor: Pos2, a: Pos2, b: Pos2) -> Projection {
    let ab = b - a;
    let ac = cursor - a;
    let length_sq = (ab.x * ab.x + ab.y * ab.y) as f64;
    if length_sq == 0.0 {
        return Projection { point: a, t: 0.0 };
    }

    let t = ((ac.x * ab.x + ac.y * ab.y) as f64 / length_sq).clamp(0.0, 1.0);
    let point = if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        a + ab * t as f32
    };
    Projection { point, t }
}

/// Where a cursor lands on the route
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteMatch {
    /// Owning segment
    pub segment: usize,
    /// Line piece within the segment
    pub sub_segment: usize,
    /// Position along the line piece
    pub t: f64,
    /// Position within the whole segment, in [0, 1]
    pub fraction: f64,
    /// Projected point, on the route
    pub position: LatLng,
    pub screen: Pos2,
    /// Pixel distance from the cursor to `screen`
    pub distance: f32,
}

/// Snaps cursor positions onto the rendered route
pub struct GeometryResolver {
    map: Arc<dyn MapSurface>,
}

impl GeometryResolver {
    pub fn new(map: Arc<dyn MapSurface>) -> Self {
        Self { map }
    }

    /// Nearest point on any segment, searched independently per segment so
    /// gaps between segments do not matter
    pub fn find_nearest_on_route(&self, cursor: Pos2, segments: &[RouteSegment]) -> Option<RouteMatch> {
        let mut best: Option<RouteMatch> = None;

        for (segment_idx, segment) in segments.iter().enumerate() {
            let coords = segment.coords();
            let screen: Vec<Pos2> = coords.iter().map(|&c| self.map.lat_lng_to_screen(c)).collect();
            let pieces = segment.sub_segment_count();

            if pieces == 0 {
                // Lone point
                if let (Some(&position), Some(&point)) = (coords.first(), screen.first()) {
                    let distance = cursor.distance(point);
                    if best.map_or(true, |b| distance < b.distance) {
                        best = Some(RouteMatch {
                            segment: segment_idx,
                            sub_segment: 0,
                            t: 0.0,
                            fraction: 0.0,
                            position,
                            screen: point,
                            distance,
                        });
                    }
                }
                continue;
            }

            for piece in 0..pieces {
                let projection = closest_point_on_segment(cursor, screen[piece], screen[piece + 1]);
                let distance = cursor.distance(projection.point);
                if best.map_or(false, |b| distance >= b.distance) {
                    continue;
                }

                // Two-level fraction: which piece, then how far along it.
                // Pieces count equally whatever their pixel length.
                let fraction = ((piece as f64 + projection.t) / pieces as f64).clamp(0.0, 1.0);
                best = Some(RouteMatch {
                    segment: segment_idx,
                    sub_segment: piece,
                    t: projection.t,
                    fraction,
                    position: coords[piece].lerp(coords[piece + 1], projection.t),
                    screen: projection.point,
                    distance,
                });
            }
        }

        best
    }

    /// Sample at `fraction` of a segment, blended between its neighbours.
    ///
    /// Lands on a real sample when the fraction hits one exactly.
    pub fn interpolate_at_fraction(segment: &RouteSegment, fraction: f64) -> Option<ResolvedSample> {
        let samples = segment.samples();
        match samples.len() {
            0 => return None,
            1 => return Some(ResolvedSample::Real(samples[0].clone())),
            _ => {}
        }

        let pieces = samples.len() - 1;
        let scaled = fraction.clamp(0.0, 1.0) * pieces as f64;
        let nearest_whole = scaled.round();
        if (scaled - nearest_whole).abs() < SNAP_EPSILON {
            return Some(ResolvedSample::Real(samples[nearest_whole as usize].clone()));
        }

        let lower = (scaled.floor() as usize).min(pieces - 1);
        let t = scaled - lower as f64;
        Some(ResolvedSample::Interpolated(InterpolatedSample::between(
            &samples[lower],
            &samples[lower + 1],
            t,
        )))
    }

    /// Project the cursor and interpolate the sample under it
    pub fn resolve(&self, cursor: Pos2, segments: &[RouteSegment]) -> Option<(RouteMatch, ResolvedSample)> {
        let hit = self.find_nearest_on_route(cursor, segments)?;
        let sample = Self::interpolate_at_fraction(&segments[hit.segment], hit.fraction)?;
        Some((hit, sample))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use egui::Vec2;
    use td_data::{RouteData, Sample};

    /// One pixel per degree, lng right and lat down
    struct PlanarMap;

    impl MapSurface for PlanarMap {
        fn size(&self) -> Vec2 {
            Vec2::new(1000.0, 1000.0)
        }

        fn lat_lng_to_screen(&self, position: LatLng) -> Pos2 {
            Pos2::new(position.lng as f32, position.lat as f32)
        }

        fn pan_to(&self, _center: LatLng, _duration: Duration) {}
    }

    fn resolver() -> GeometryResolver {
        GeometryResolver::new(Arc::new(PlanarMap))
    }

    /// Uneven spacing: a long first piece, then two short ones
    fn uneven_route() -> RouteData {
        RouteData::from_samples(
            vec![
                Sample::new(0, 0).with_position(0.0, 0.0).with_field("speed", 0.0),
                Sample::new(1, 1_000).with_position(0.0, 100.0).with_field("speed", 10.0),
                Sample::new(2, 2_000).with_position(0.0, 110.0).with_field("speed", 20.0),
                Sample::new(3, 3_000).with_position(0.0, 120.0).with_field("speed", 30.0),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_projection_clamps_to_endpoints() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);

        let before = closest_point_on_segment(Pos2::new(-5.0, 3.0), a, b);
        assert_eq!(before.point, a);
        assert_eq!(before.t, 0.0);

        let after = closest_point_on_segment(Pos2::new(15.0, -3.0), a, b);
        assert_eq!(after.point, b);
        assert_eq!(after.t, 1.0);

        let middle = closest_point_on_segment(Pos2::new(4.0, 7.0), a, b);
        assert_eq!(middle.point, Pos2::new(4.0, 0.0));
        assert!((middle.t - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_piece_projects_to_start() {
        let a = Pos2::new(3.0, 3.0);
        let projection = closest_point_on_segment(Pos2::new(10.0, 10.0), a, a);
        assert_eq!(projection.point, a);
        assert_eq!(projection.t, 0.0);
    }

    #[test]
    fn test_vertex_round_trip() {
        let route = uneven_route();
        let hit = resolver()
            .find_nearest_on_route(Pos2::new(110.0, 0.0), &route.segments)
            .unwrap();

        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.screen, Pos2::new(110.0, 0.0));
        assert_eq!(hit.position, LatLng::new(0.0, 110.0));
        assert!((hit.fraction - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_fraction_counts_pieces_not_pixels() {
        let route = uneven_route();
        // Halfway along the long first piece is a third of the way in
        // pixels but only a sixth of the pieces
        let hit = resolver()
            .find_nearest_on_route(Pos2::new(50.0, 5.0), &route.segments)
            .unwrap();
        assert_eq!(hit.sub_segment, 0);
        assert!((hit.fraction - 1.0 / 6.0).abs() < 1e-6);
        assert!((hit.distance - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_interpolated_sample_between_neighbours() {
        let route = uneven_route();
        let (_, sample) = resolver().resolve(Pos2::new(105.0, 2.0), &route.segments).unwrap();

        assert!(sample.is_interpolated());
        assert!((sample.index() - 1.5).abs() < 1e-6);
        assert_eq!(sample.timestamp(), 1_500);
        assert!((sample.field("speed").unwrap() - 15.0).abs() < 1e-6);
        assert_eq!(sample.lookup_key(), None);
    }

    #[test]
    fn test_exact_fraction_yields_real_sample() {
        let route = uneven_route();
        let sample = GeometryResolver::interpolate_at_fraction(&route.segments[0], 1.0 / 3.0).unwrap();
        assert_eq!(sample.lookup_key(), Some(1));

        let end = GeometryResolver::interpolate_at_fraction(&route.segments[0], 1.0).unwrap();
        assert_eq!(end.lookup_key(), Some(3));
    }

    #[test]
    fn test_bucket_change_leaves_no_gap() {
        let route = RouteData::from_samples(
            vec![
                Sample::new(0, 0).with_position(0.0, 0.0).with_field("speed", 1.0),
                Sample::new(1, 100).with_position(0.0, 10.0).with_field("speed", 1.0),
                Sample::new(2, 200).with_position(0.0, 12.0).with_field("speed", 50.0),
                Sample::new(3, 300).with_position(0.0, 22.0).with_field("speed", 50.0),
            ],
            Some(&td_data::OverlayRecipe::new("speed", "speedColor", vec![10.0])),
        )
        .unwrap();
        assert_eq!(route.segments.len(), 2);

        // Between the last slow sample and the first fast one
        let (hit, sample) = resolver().resolve(Pos2::new(11.5, 0.0), &route.segments).unwrap();
        assert_eq!(hit.segment, 1);
        assert_eq!(hit.sub_segment, 0);
        assert_eq!(hit.distance, 0.0);
        assert!((hit.fraction - 0.375).abs() < 1e-6);
        assert!((sample.index() - 1.75).abs() < 1e-6);
        assert_eq!(sample.timestamp(), 175);
    }

    #[test]
    fn test_no_segments_no_match() {
        assert!(resolver().find_nearest_on_route(Pos2::new(1.0, 1.0), &[]).is_none());
        assert!(resolver().resolve(Pos2::new(1.0, 1.0), &[]).is_none());
    }
}
