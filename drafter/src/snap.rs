use std::{future::Future, time::Duration};

use shared::{NearestHit, Point};

use crate::error::BackendError;

/// Nearest archived point lookup used to correct freshly drawn points.
pub trait SnapLookup {
    fn nearest(
        &self,
        point: Point,
        threshold_meters: f64,
    ) -> impl Future<Output = Result<Option<NearestHit>, BackendError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapOptions {
    pub enabled: bool,
    pub threshold_meters: f64,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPoint {
    pub point: Point,
    /// Name of the archived route the point was snapped to.
    pub snapped_to: Option<String>,
}

impl ResolvedPoint {
    pub fn raw(point: Point) -> Self {
        Self {
            point,
            snapped_to: None,
        }
    }
}

/// Substitutes `raw` with the nearest archived point when one lies within the
/// threshold. Misses, lookup failures and timeouts all yield `raw`.
pub async fn resolve_point<S: SnapLookup>(
    snap: &S,
    raw: Point,
    options: SnapOptions,
) -> ResolvedPoint {
    if !options.enabled {
        return ResolvedPoint::raw(raw);
    }

    let lookup = snap.nearest(raw, options.threshold_meters);
    match tokio::time::timeout(options.timeout, lookup).await {
        Ok(Ok(Some(hit))) => {
            tracing::debug!(
                "snapped ({:.5},{:.5}) to archived route {:?} ({:.1} m)",
                raw.lat,
                raw.lng,
                hit.route_name,
                hit.distance_meters
            );
            ResolvedPoint {
                point: Point::new(hit.point.lat, hit.point.lng),
                snapped_to: Some(hit.route_name),
            }
        }
        Ok(Ok(None)) => {
            tracing::debug!(
                "no archived point within {} m of ({:.5},{:.5})",
                options.threshold_meters,
                raw.lat,
                raw.lng
            );
            ResolvedPoint::raw(raw)
        }
        Ok(Err(err)) => {
            tracing::warn!("snap lookup failed, keeping raw point: {err}");
            ResolvedPoint::raw(raw)
        }
        Err(_) => {
            tracing::warn!(
                "snap lookup timed out after {:?}, keeping raw point",
                options.timeout
            );
            ResolvedPoint::raw(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    enum StubSnap {
        Hit(Point),
        Miss,
        Fail,
        Hang,
    }

    impl SnapLookup for StubSnap {
        async fn nearest(
            &self,
            _point: Point,
            _threshold_meters: f64,
        ) -> Result<Option<NearestHit>, BackendError> {
            match self {
                StubSnap::Hit(point) => Ok(Some(NearestHit {
                    point: *point,
                    route_id: Uuid::nil(),
                    route_name: "Archive 2023".to_string(),
                    distance_meters: 12.0,
                })),
                StubSnap::Miss => Ok(None),
                StubSnap::Fail => Err(BackendError::Status {
                    status: 500,
                    message: "boom".to_string(),
                }),
                StubSnap::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
            }
        }
    }

    fn options() -> SnapOptions {
        SnapOptions {
            enabled: true,
            threshold_meters: 40.0,
            timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_hit_substitutes_archived_point() {
        let archived = Point {
            lat: 56.839,
            lng: 60.605,
            is_node: true,
        };
        let resolved = resolve_point(&StubSnap::Hit(archived), Point::new(56.8391, 60.6051), options()).await;

        assert_eq!(resolved.point, Point::new(56.839, 60.605));
        assert_eq!(resolved.snapped_to.as_deref(), Some("Archive 2023"));
    }

    #[tokio::test]
    async fn test_miss_and_failure_fall_back_to_raw() {
        let raw = Point::new(56.0, 60.0);
        assert_eq!(resolve_point(&StubSnap::Miss, raw, options()).await, ResolvedPoint::raw(raw));
        assert_eq!(resolve_point(&StubSnap::Fail, raw, options()).await, ResolvedPoint::raw(raw));
    }

    #[tokio::test]
    async fn test_disabled_snap_skips_lookup() {
        let raw = Point::new(56.0, 60.0);
        let disabled = SnapOptions {
            enabled: false,
            ..options()
        };
        let resolved = resolve_point(&StubSnap::Hit(Point::new(1.0, 1.0)), raw, disabled).await;
        assert_eq!(resolved, ResolvedPoint::raw(raw));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_to_raw() {
        let raw = Point::new(56.0, 60.0);
        let resolved = resolve_point(&StubSnap::Hang, raw, options()).await;
        assert_eq!(resolved, ResolvedPoint::raw(raw));
    }
}
