use std::collections::HashMap;

use shared::{NearestHit, Point, RouteDraft, RouteRecord, Segment, Status, SurfaceType};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ServiceError;

/// In-memory route archive.
#[derive(Debug, Default)]
pub struct RouteStore {
    routes: RwLock<HashMap<Uuid, RouteRecord>>,
}

impl RouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new route under a fresh id.
    ///
    /// # Errors
    /// Returns `ServiceError::InvalidData` when the draft fails validation.
    pub async fn save_route(&self, draft: RouteDraft) -> Result<RouteRecord, ServiceError> {
        let draft = prepare(draft)?;
        let route = RouteRecord::from_draft(Uuid::new_v4(), draft);
        self.routes.write().await.insert(route.id, route.clone());
        tracing::info!(
            "route saved: {} ({}, {} segments, ID: {})",
            route.name,
            route.status,
            route.segments.len(),
            route.id
        );
        Ok(route)
    }

    /// Replaces the content of an existing route.
    pub async fn update_route(
        &self,
        id: Uuid,
        draft: RouteDraft,
    ) -> Result<RouteRecord, ServiceError> {
        let draft = prepare(draft)?;
        let mut routes = self.routes.write().await;
        let slot = routes.get_mut(&id).ok_or(ServiceError::NotFound(id))?;
        *slot = RouteRecord::from_draft(id, draft);
        tracing::info!("route updated: {} (ID: {id})", slot.name);
        Ok(slot.clone())
    }

    /// Changes the status of a stored route. Going final marks every segment
    /// final as well.
    pub async fn set_status(&self, id: Uuid, status: Status) -> Result<RouteRecord, ServiceError> {
        let mut routes = self.routes.write().await;
        let slot = routes.get_mut(&id).ok_or(ServiceError::NotFound(id))?;
        let mut draft = slot.to_draft();
        draft.status = status;
        *slot = RouteRecord::from_draft(id, prepare(draft)?);
        tracing::info!("route status changed: {} is now {status} (ID: {id})", slot.name);
        Ok(slot.clone())
    }

    /// Appends a point to one segment of a stored route.
    ///
    /// # Errors
    /// `NotFound` for an unknown route, `SegmentNotFound` for an unknown
    /// segment and `InvalidData` for out-of-range coordinates.
    pub async fn add_point(
        &self,
        id: Uuid,
        segment_id: Uuid,
        point: Point,
    ) -> Result<Point, ServiceError> {
        if !is_valid(&point) {
            return Err(ServiceError::InvalidData(format!(
                "invalid point ({}, {})",
                point.lat, point.lng
            )));
        }
        let mut routes = self.routes.write().await;
        let slot = routes.get_mut(&id).ok_or(ServiceError::NotFound(id))?;
        let mut draft = slot.to_draft();
        let segment = draft
            .segments
            .iter_mut()
            .find(|segment| segment.id == Some(segment_id))
            .ok_or(ServiceError::SegmentNotFound {
                route: id,
                segment: segment_id,
            })?;
        segment.points.push(point);
        *slot = RouteRecord::from_draft(id, prepare(draft)?);
        tracing::debug!("point added to segment {segment_id} of route {id}");
        Ok(point)
    }

    /// All routes, most recently updated first.
    pub async fn list_routes(&self) -> Vec<RouteRecord> {
        let mut routes: Vec<RouteRecord> = self.routes.read().await.values().cloned().collect();
        routes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        tracing::debug!("retrieved {} routes", routes.len());
        routes
    }

    pub async fn get_route(&self, id: Uuid) -> Result<RouteRecord, ServiceError> {
        self.routes
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound(id))
    }

    pub async fn delete_route(&self, id: Uuid) -> Result<(), ServiceError> {
        if self.routes.write().await.remove(&id).is_none() {
            return Err(ServiceError::NotFound(id));
        }
        tracing::info!("route deleted: ID {id}");
        Ok(())
    }

    pub async fn clear(&self) {
        self.routes.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.routes.read().await.is_empty()
    }

    /// Closest stored point within `threshold_meters` (inclusive) of
    /// `target`, across every route.
    pub async fn find_nearest(&self, target: Point, threshold_meters: f64) -> Option<NearestHit> {
        let routes = self.routes.read().await;
        let mut best: Option<NearestHit> = None;

        for route in routes.values() {
            for point in route.segments.iter().flat_map(|s| s.points.iter()) {
                let distance = target.distance_to(point);
                if distance > threshold_meters {
                    continue;
                }
                if best
                    .as_ref()
                    .is_some_and(|hit| hit.distance_meters <= distance)
                {
                    continue;
                }
                best = Some(NearestHit {
                    point: *point,
                    route_id: route.id,
                    route_name: route.name.clone(),
                    distance_meters: distance,
                });
            }
        }
        best
    }

    /// Replaces the archive with two demo routes around Yekaterinburg: a
    /// final forest trail and a preliminary city stretch.
    pub async fn seed_demo_routes(&self) -> Result<(), ServiceError> {
        self.clear().await;

        let archive = demo_segment(
            "Route 2023",
            SurfaceType::FOREST_TRAIL,
            false,
            &[(56.839, 60.605), (56.845, 60.62), (56.85, 60.64), (56.86, 60.66)],
        );
        self.save_route(RouteDraft {
            name: "Archived route".to_string(),
            status: Status::Final,
            segments: vec![archive],
        })
        .await?;

        let city = demo_segment(
            "City stretch",
            SurfaceType::ASPHALT,
            true,
            &[(56.84, 60.59), (56.83, 60.57), (56.82, 60.55)],
        );
        self.save_route(RouteDraft {
            name: "Preliminary example".to_string(),
            status: Status::Preliminary,
            segments: vec![city],
        })
        .await?;

        tracing::info!("seeded {} demo routes", self.len().await);
        Ok(())
    }
}

/// Validates a draft and gives every segment an id.
fn prepare(mut draft: RouteDraft) -> Result<RouteDraft, ServiceError> {
    if draft.name.trim().is_empty() {
        return Err(ServiceError::InvalidData(
            "route name must not be empty".to_string(),
        ));
    }
    for segment in &mut draft.segments {
        if let Some(point) = segment.points.iter().find(|p| !is_valid(p)) {
            return Err(ServiceError::InvalidData(format!(
                "segment {:?} has an invalid point ({}, {})",
                segment.name, point.lat, point.lng
            )));
        }
        segment.id.get_or_insert_with(Uuid::new_v4);
    }
    if draft.status == Status::Final {
        for segment in &mut draft.segments {
            segment.preliminary = false;
        }
    }
    Ok(draft)
}

fn is_valid(point: &Point) -> bool {
    point.lat.is_finite()
        && point.lng.is_finite()
        && (-90.0..=90.0).contains(&point.lat)
        && (-180.0..=180.0).contains(&point.lng)
}

fn demo_segment(
    name: &str,
    surface: SurfaceType,
    preliminary: bool,
    coords: &[(f64, f64)],
) -> Segment {
    let last = coords.len().saturating_sub(1);
    let mut segment = Segment::new(name, surface);
    segment.preliminary = preliminary;
    segment.points = coords
        .iter()
        .enumerate()
        .map(|(i, &(lat, lng))| Point {
            is_node: i == 0 || i == last,
            ..Point::new(lat, lng)
        })
        .collect();
    segment
}
