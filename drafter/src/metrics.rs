use std::collections::BTreeMap;

use shared::{Metrics, Segment, SurfaceType};

pub use shared::haversine_meters;

pub const DEFAULT_WALKING_SPEED_KMH: f64 = 4.5;

/// Straight-line estimate of a draft. Chords between consecutive points are
/// summed per segment, never across segment boundaries, and no road
/// snapping is involved. Once a route is final the backend's figures replace
/// this estimate.
#[derive(Debug, Clone, Copy)]
pub struct Estimator {
    walking_speed_kmh: f64,
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new(DEFAULT_WALKING_SPEED_KMH)
    }
}

impl Estimator {
    pub fn new(walking_speed_kmh: f64) -> Self {
        Self { walking_speed_kmh }
    }

    /// Returns `None` when no segment holds a single point.
    pub fn estimate(&self, segments: &[Segment]) -> Option<Metrics> {
        if segments.iter().all(Segment::is_empty) {
            return None;
        }

        let mut total_m = 0.0;
        let mut preliminary_m = 0.0;
        let mut final_m = 0.0;
        let mut by_surface_m: BTreeMap<SurfaceType, f64> = BTreeMap::new();

        for segment in segments {
            let meters = segment.length_meters();
            total_m += meters;
            if segment.preliminary {
                preliminary_m += meters;
            } else {
                final_m += meters;
            }
            // Single-point segments have no traversal and get no key.
            if meters > 0.0 {
                *by_surface_m.entry(segment.surface_type.clone()).or_default() += meters;
            }
        }

        let total_km = meters_to_km(total_m);
        Some(Metrics {
            total_km,
            preliminary_km: meters_to_km(preliminary_m),
            final_km: meters_to_km(final_m),
            estimated_minutes: self.minutes_for(total_km),
            by_surface: by_surface_m
                .into_iter()
                .map(|(surface, meters)| (surface, meters_to_km(meters)))
                .collect(),
            coverage_fallback: false,
        })
    }

    pub fn minutes_for(&self, km: f64) -> u32 {
        if self.walking_speed_kmh <= 0.0 {
            return 0;
        }
        (km / self.walking_speed_kmh * 60.0).round() as u32
    }
}

pub fn estimate_draft(segments: &[Segment]) -> Option<Metrics> {
    Estimator::default().estimate(segments)
}

/// Meters to kilometers, rounded to one decimal.
fn meters_to_km(meters: f64) -> f64 {
    (meters / 100.0).round() / 10.0
}
