use std::{net::SocketAddr, sync::Arc};

use backend::{serve, store::RouteStore, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = Arc::new(RouteStore::new());
    let seed = std::env::var("SEED_DEMO_ROUTES")
        .map(|value| {
            !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            )
        })
        .unwrap_or(true);
    if seed {
        store.seed_demo_routes().await.expect("seed demo routes");
    }

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()
        .expect("valid socket address");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    serve(listener, AppState { store }).await.unwrap();
}
