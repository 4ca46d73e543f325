//! Authoritative route metrics.
//!
//! Unlike the client-side estimate, final routes are timed per surface and
//! always report every well-known surface key.

use std::collections::BTreeMap;

use shared::{Metrics, RouteDraft, RouteRecord, RouteSummary, Status, SurfaceType};

pub const DEFAULT_SPEED_KMH: f64 = 4.5;

/// Walking speed on a surface, in km/h.
pub fn surface_speed_kmh(surface: &SurfaceType) -> f64 {
    match surface.as_str() {
        "ASPHALT" => 5.5,
        "FOREST_TRAIL" => 4.0,
        "FIELD_PATH" => 4.3,
        "RAILWAY" => 5.0,
        _ => DEFAULT_SPEED_KMH,
    }
}

pub fn build_metrics(draft: &RouteDraft) -> Metrics {
    let mut total_m = 0.0;
    let mut preliminary_m = 0.0;
    let mut final_m = 0.0;
    let mut declared_km: BTreeMap<SurfaceType, f64> = BTreeMap::new();

    for segment in &draft.segments {
        let meters = segment.length_meters();
        total_m += meters;
        if segment.preliminary {
            preliminary_m += meters;
        } else {
            final_m += meters;
        }
        if meters > 0.0 {
            *declared_km.entry(segment.surface_type.clone()).or_default() += meters / 1000.0;
        }
    }

    let total_km = total_m / 1000.0;
    let mut metrics = Metrics {
        total_km: round2(total_km),
        preliminary_km: round2(preliminary_m / 1000.0),
        final_km: round2(final_m / 1000.0),
        ..Metrics::default()
    };

    match draft.status {
        Status::Preliminary => {
            metrics.estimated_minutes = to_minutes(total_km / DEFAULT_SPEED_KMH * 60.0);
            metrics.by_surface = declared_km
                .into_iter()
                .map(|(surface, km)| (surface, round2(km)))
                .collect();
        }
        Status::Final => {
            let has_known = declared_km
                .iter()
                .any(|(surface, km)| *surface != SurfaceType::UNKNOWN && *km > 0.0);
            let mut by_surface = zero_filled();
            if has_known {
                by_surface.extend(declared_km);
            } else {
                tracing::debug!(
                    "no classified surface on route {:?}, attributing {:.2} km to ASPHALT",
                    draft.name,
                    total_km
                );
                by_surface.insert(SurfaceType::ASPHALT, total_km);
                metrics.coverage_fallback = true;
            }
            let minutes: f64 = by_surface
                .iter()
                .map(|(surface, km)| km / surface_speed_kmh(surface) * 60.0)
                .sum();
            metrics.estimated_minutes = to_minutes(minutes);
            metrics.by_surface = by_surface
                .into_iter()
                .map(|(surface, km)| (surface, round2(km)))
                .collect();
        }
    }

    metrics
}

pub fn summarize(route: &RouteRecord) -> RouteSummary {
    let metrics = build_metrics(&route.to_draft());
    RouteSummary {
        id: route.id,
        name: route.name.clone(),
        status: route.status,
        segment_count: route.segments.len(),
        total_km: metrics.total_km,
        updated_at: route.updated_at,
    }
}

fn zero_filled() -> BTreeMap<SurfaceType, f64> {
    SurfaceType::KNOWN
        .into_iter()
        .map(|surface| (surface, 0.0))
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn to_minutes(minutes: f64) -> u32 {
    minutes.round().max(0.0) as u32
}
