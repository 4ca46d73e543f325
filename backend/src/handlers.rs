// Handlers for the route archive API

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use shared::{
    AddPointRequest, ApiError, ExportFormat, Metrics, NearestHit, NearestRequest, Point,
    RouteDraft, RouteEnvelope, RouteRecord, RouteSummary, Status,
};
use uuid::Uuid;

use crate::{
    analysis::{build_metrics, summarize},
    error::ServiceError,
    export::{export_route, import_gpx, import_kml},
    AppState,
};

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// GET /api/routes - List saved routes
pub async fn list_routes(State(state): State<AppState>) -> Json<Vec<RouteSummary>> {
    let routes = state.store.list_routes().await;
    Json(routes.iter().map(summarize).collect())
}

/// GET /api/routes/:id - A route with its metrics
pub async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RouteEnvelope>> {
    state
        .store
        .get_route(id)
        .await
        .map(envelope)
        .map_err(service_error_to_api_error)
}

/// POST /api/routes - Save a new route
pub async fn save_route(
    State(state): State<AppState>,
    Json(draft): Json<RouteDraft>,
) -> ApiResult<Json<RouteEnvelope>> {
    state
        .store
        .save_route(draft)
        .await
        .map(envelope)
        .map_err(service_error_to_api_error)
}

/// PUT /api/routes/:id - Replace a route
pub async fn update_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<RouteDraft>,
) -> ApiResult<Json<RouteEnvelope>> {
    state
        .store
        .update_route(id, draft)
        .await
        .map(envelope)
        .map_err(service_error_to_api_error)
}

/// DELETE /api/routes/:id - Delete a route
pub async fn delete_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .store
        .delete_route(id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(service_error_to_api_error)
}

/// POST /api/routes/:id/status - Body is the bare status, e.g. `"FINAL"`
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(status): Json<Status>,
) -> ApiResult<Json<RouteEnvelope>> {
    state
        .store
        .set_status(id, status)
        .await
        .map(envelope)
        .map_err(service_error_to_api_error)
}

/// POST /api/routes/:id/points - Append a point to one segment
pub async fn add_point(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddPointRequest>,
) -> ApiResult<Json<Point>> {
    state
        .store
        .add_point(id, req.segment_id, req.point())
        .await
        .map(Json)
        .map_err(service_error_to_api_error)
}

/// POST /api/routes/nearest - Closest archived point, 404 on a miss
pub async fn nearest(
    State(state): State<AppState>,
    Json(req): Json<NearestRequest>,
) -> ApiResult<Json<NearestHit>> {
    let target = Point::new(req.lat, req.lng);
    match state.store.find_nearest(target, req.threshold_meters).await {
        Some(hit) => Ok(Json(hit)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                message: format!(
                    "no archived point within {} m of ({}, {})",
                    req.threshold_meters, req.lat, req.lng
                ),
            }),
        )),
    }
}

/// POST /api/routes/metrics - Evaluate an unsaved draft
pub async fn metrics(Json(draft): Json<RouteDraft>) -> Json<Metrics> {
    Json(build_metrics(&draft))
}

/// GET /api/routes/:id/export/:format - Download as GPX, KML or KMZ
pub async fn export(
    State(state): State<AppState>,
    Path((id, format)): Path<(Uuid, String)>,
) -> ApiResult<impl IntoResponse> {
    let format: ExportFormat = format.parse().map_err(|message| {
        (StatusCode::BAD_REQUEST, Json(ApiError { message }))
    })?;
    let route = state
        .store
        .get_route(id)
        .await
        .map_err(service_error_to_api_error)?;
    let bytes = export_route(&route, format).map_err(service_error_to_api_error)?;
    tracing::info!("exported route {id} as {format} ({} bytes)", bytes.len());

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", format.file_name(id)),
        ),
    ];
    Ok((headers, bytes))
}

/// POST /api/routes/import/gpx - Body is a base64 GPX document
pub async fn import_gpx_route(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<RouteEnvelope>> {
    let draft = import_gpx(&body).map_err(service_error_to_api_error)?;
    save_imported(&state, draft).await
}

/// POST /api/routes/import/kml - Body is a base64 KML document
pub async fn import_kml_route(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<RouteEnvelope>> {
    let draft = import_kml(&body).map_err(service_error_to_api_error)?;
    save_imported(&state, draft).await
}

async fn save_imported(state: &AppState, draft: RouteDraft) -> ApiResult<Json<RouteEnvelope>> {
    state
        .store
        .save_route(draft)
        .await
        .map(envelope)
        .map_err(service_error_to_api_error)
}

fn envelope(route: RouteRecord) -> Json<RouteEnvelope> {
    let metrics = build_metrics(&route.to_draft());
    Json(RouteEnvelope { route, metrics })
}

/// Convert ServiceError to API error response
fn service_error_to_api_error(err: ServiceError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        ServiceError::NotFound(_) | ServiceError::SegmentNotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::InvalidData(_) | ServiceError::Gpx(_) | ServiceError::Xml(_) => {
            StatusCode::BAD_REQUEST
        }
        ServiceError::Zip(_) | ServiceError::Io(_) => {
            tracing::error!("export failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
