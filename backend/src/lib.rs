pub mod analysis;
pub mod error;
pub mod export;
pub mod handlers;
pub mod store;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::store::RouteStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RouteStore>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/routes",
            get(handlers::list_routes).post(handlers::save_route),
        )
        .route("/api/routes/nearest", post(handlers::nearest))
        .route("/api/routes/metrics", post(handlers::metrics))
        .route("/api/routes/import/gpx", post(handlers::import_gpx_route))
        .route("/api/routes/import/kml", post(handlers::import_kml_route))
        .route(
            "/api/routes/:id",
            get(handlers::get_route)
                .put(handlers::update_route)
                .delete(handlers::delete_route),
        )
        .route("/api/routes/:id/status", post(handlers::set_status))
        .route("/api/routes/:id/points", post(handlers::add_point))
        .route("/api/routes/:id/export/:format", get(handlers::export))
        .layer(cors)
        .with_state(state)
}

/// Serves the API on an already bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("starting backend on http://{addr}");
    }
    axum::serve(listener, create_router(state)).await
}
