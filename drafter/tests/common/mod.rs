#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
    time::Duration,
};

use drafter::{
    backend::RouteBackend,
    error::BackendError,
    render::{BaseLayer, LineStyle, MapSurface, MarkerStyle},
    snap::SnapLookup,
    DraftConfig,
};
use shared::{
    ExportFormat, Metrics, NearestHit, Point, RouteDraft, RouteEnvelope, RouteRecord, RouteSummary,
};
use uuid::Uuid;

/// In-memory stand-in for the route service that records every call.
#[derive(Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<String>>,
    pub routes: Mutex<HashMap<Uuid, RouteRecord>>,
    pub nearest: Mutex<Option<NearestHit>>,
    pub fail_save: Mutex<bool>,
    pub fail_metrics: Mutex<bool>,
    pub fail_list: Mutex<bool>,
    pub snap_delay: Mutex<Option<Duration>>,
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| call.as_str() == name).count()
    }

    pub fn archive_point(&self, point: Point, route_name: &str) {
        *self.nearest.lock().unwrap() = Some(NearestHit {
            point,
            route_id: Uuid::new_v4(),
            route_name: route_name.to_string(),
            distance_meters: 10.0,
        });
    }

    pub fn insert(&self, draft: RouteDraft) -> Uuid {
        let id = Uuid::new_v4();
        self.routes
            .lock()
            .unwrap()
            .insert(id, RouteRecord::from_draft(id, draft));
        id
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn fake_metrics(draft: &RouteDraft) -> Metrics {
        let total_m: f64 = draft.segments.iter().map(|s| s.length_meters()).sum();
        Metrics {
            total_km: (total_m / 10.0).round() / 100.0,
            final_km: (total_m / 10.0).round() / 100.0,
            coverage_fallback: true,
            ..Metrics::default()
        }
    }
}

fn failure() -> BackendError {
    BackendError::Status {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

impl RouteBackend for FakeBackend {
    async fn list_routes(&self) -> Result<Vec<RouteSummary>, BackendError> {
        self.record("list");
        if *self.fail_list.lock().unwrap() {
            return Err(BackendError::Status {
                status: 503,
                message: "route list unavailable".to_string(),
            });
        }
        Ok(self
            .routes
            .lock()
            .unwrap()
            .values()
            .map(|route| RouteSummary {
                id: route.id,
                name: route.name.clone(),
                status: route.status,
                segment_count: route.segments.len(),
                total_km: 0.0,
                updated_at: route.updated_at,
            })
            .collect())
    }

    async fn load_route(&self, id: Uuid) -> Result<RouteEnvelope, BackendError> {
        self.record("load");
        let route = self.routes.lock().unwrap().get(&id).cloned();
        match route {
            Some(route) => Ok(RouteEnvelope {
                metrics: Self::fake_metrics(&route.to_draft()),
                route,
            }),
            None => Err(BackendError::Status {
                status: 404,
                message: format!("route {id} not found"),
            }),
        }
    }

    async fn save_route(&self, draft: &RouteDraft) -> Result<RouteEnvelope, BackendError> {
        self.record("save");
        if *self.fail_save.lock().unwrap() {
            return Err(failure());
        }
        let id = self.insert(draft.clone());
        let route = self.routes.lock().unwrap()[&id].clone();
        Ok(RouteEnvelope {
            metrics: Self::fake_metrics(draft),
            route,
        })
    }

    async fn metrics(&self, draft: &RouteDraft) -> Result<Metrics, BackendError> {
        self.record("metrics");
        if *self.fail_metrics.lock().unwrap() {
            return Err(failure());
        }
        Ok(Self::fake_metrics(draft))
    }

    async fn export(&self, id: Uuid, format: ExportFormat) -> Result<Vec<u8>, BackendError> {
        self.record("export");
        Ok(format!("{format}:{id}").into_bytes())
    }
}

impl SnapLookup for FakeBackend {
    async fn nearest(
        &self,
        _point: Point,
        _threshold_meters: f64,
    ) -> Result<Option<NearestHit>, BackendError> {
        self.record("nearest");
        let delay = *self.snap_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.nearest.lock().unwrap().clone())
    }
}

/// Snap lookup whose latency depends on the latitude of the request, used to
/// make completions arrive out of order.
pub struct DelayedSnap;

impl SnapLookup for DelayedSnap {
    async fn nearest(
        &self,
        point: Point,
        _threshold_meters: f64,
    ) -> Result<Option<NearestHit>, BackendError> {
        let delay_ms = ((point.lat - 56.0) * 100_000.0).round().max(0.0) as u64;
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(None)
    }
}

/// Surface that keeps only what is currently drawn.
#[derive(Default)]
pub struct RecordingSurface {
    next_handle: u32,
    pub lines: BTreeMap<u32, (usize, &'static str)>,
    pub markers: BTreeMap<u32, Point>,
    pub base_layers: Vec<BaseLayer>,
    pub interaction: Option<bool>,
}

impl MapSurface for RecordingSurface {
    type Handle = u32;

    fn set_base_layer(&mut self, layer: BaseLayer) {
        self.base_layers.push(layer);
    }

    fn draw_line(&mut self, points: &[Point], style: &LineStyle) -> u32 {
        self.next_handle += 1;
        self.lines.insert(self.next_handle, (points.len(), style.color));
        self.next_handle
    }

    fn remove_line(&mut self, handle: u32) {
        self.lines.remove(&handle);
    }

    fn draw_point_markers(&mut self, points: &[Point], _style: &MarkerStyle) -> Vec<u32> {
        points
            .iter()
            .map(|point| {
                self.next_handle += 1;
                self.markers.insert(self.next_handle, *point);
                self.next_handle
            })
            .collect()
    }

    fn remove_markers(&mut self, handles: Vec<u32>) {
        for handle in handles {
            self.markers.remove(&handle);
        }
    }

    fn set_interaction(&mut self, enabled: bool) {
        self.interaction = Some(enabled);
    }
}

pub fn test_config() -> DraftConfig {
    DraftConfig {
        snap_timeout: Duration::from_millis(500),
        ..DraftConfig::default()
    }
}

/// Offsets `meters` north of `origin`.
pub fn north_of(origin: Point, meters: f64) -> Point {
    Point::new(origin.lat + meters / 111_195.0, origin.lng)
}
