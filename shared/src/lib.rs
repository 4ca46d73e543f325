use std::{borrow::Cow, collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
    /// Reserved for graph snapping; carried through, never interpreted.
    #[serde(default, rename = "isNode", alias = "node")]
    pub is_node: bool,
}

impl Point {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            is_node: false,
        }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        haversine_meters(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Surface tag of a segment. The set of tags is owned by the backend, so the
/// key is kept as an opaque string; the constants cover the tags it knows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceType(Cow<'static, str>);

impl SurfaceType {
    pub const FOREST_TRAIL: SurfaceType = SurfaceType(Cow::Borrowed("FOREST_TRAIL"));
    pub const FIELD_PATH: SurfaceType = SurfaceType(Cow::Borrowed("FIELD_PATH"));
    pub const ASPHALT: SurfaceType = SurfaceType(Cow::Borrowed("ASPHALT"));
    pub const RAILWAY: SurfaceType = SurfaceType(Cow::Borrowed("RAILWAY"));
    pub const UNKNOWN: SurfaceType = SurfaceType(Cow::Borrowed("UNKNOWN"));

    pub const KNOWN: [SurfaceType; 5] = [
        Self::FOREST_TRAIL,
        Self::FIELD_PATH,
        Self::ASPHALT,
        Self::RAILWAY,
        Self::UNKNOWN,
    ];

    pub fn new(key: impl Into<String>) -> Self {
        Self(Cow::Owned(key.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SurfaceType {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Preliminary,
    Final,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Preliminary => f.write_str("PRELIMINARY"),
            Status::Final => f.write_str("FINAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub surface_type: SurfaceType,
    #[serde(default)]
    pub preliminary: bool,
    #[serde(default)]
    pub points: Vec<Point>,
}

impl Segment {
    /// Empty, preliminary segment without an identifier.
    pub fn new(name: impl Into<String>, surface_type: SurfaceType) -> Self {
        Self {
            id: None,
            name: name.into(),
            surface_type,
            preliminary: true,
            points: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of consecutive chord lengths, in meters.
    pub fn length_meters(&self) -> f64 {
        path_meters(&self.points)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteDraft {
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub id: Uuid,
    pub name: String,
    pub status: Status,
    pub segments: Vec<Segment>,
    pub updated_at: DateTime<Utc>,
}

impl RouteRecord {
    pub fn from_draft(id: Uuid, draft: RouteDraft) -> Self {
        Self {
            id,
            name: draft.name,
            status: draft.status,
            segments: draft.segments,
            updated_at: Utc::now(),
        }
    }

    pub fn to_draft(&self) -> RouteDraft {
        RouteDraft {
            name: self.name.clone(),
            status: self.status,
            segments: self.segments.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub id: Uuid,
    pub name: String,
    pub status: Status,
    pub segment_count: usize,
    pub total_km: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_km: f64,
    pub preliminary_km: f64,
    pub final_km: f64,
    pub estimated_minutes: u32,
    #[serde(default)]
    pub by_surface: BTreeMap<SurfaceType, f64>,
    #[serde(default)]
    pub coverage_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEnvelope {
    pub route: RouteRecord,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestRequest {
    pub lat: f64,
    pub lng: f64,
    pub threshold_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestHit {
    pub point: Point,
    pub route_id: Uuid,
    pub route_name: String,
    pub distance_meters: f64,
}

/// Appends one point to a segment of a stored route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPointRequest {
    pub segment_id: Uuid,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, rename = "isNode", alias = "node")]
    pub is_node: bool,
}

impl AddPointRequest {
    pub fn point(&self) -> Point {
        Point {
            is_node: self.is_node,
            ..Point::new(self.lat, self.lng)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Gpx,
    Kml,
    Kmz,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Gpx => "gpx",
            ExportFormat::Kml => "kml",
            ExportFormat::Kmz => "kmz",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Gpx | ExportFormat::Kml => "application/xml",
            ExportFormat::Kmz => "application/vnd.google-earth.kmz",
        }
    }

    /// Download name used by both the service and its clients.
    pub fn file_name(self, route_id: Uuid) -> String {
        format!("route-{route_id}.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpx" => Ok(ExportFormat::Gpx),
            "kml" => Ok(ExportFormat::Kml),
            "kmz" => Ok(ExportFormat::Kmz),
            other => Err(format!("unsupported export format: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

/// Great-circle distance in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + phi1.cos() * phi2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

pub fn path_meters(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}
