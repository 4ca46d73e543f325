use std::{future::Future, time::Duration};

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    ApiError, ExportFormat, Metrics, NearestHit, NearestRequest, Point, RouteDraft, RouteEnvelope,
    RouteSummary,
};
use uuid::Uuid;

use crate::{config::DraftConfig, error::BackendError, snap::SnapLookup};

/// Persistence and authoritative analysis of routes.
pub trait RouteBackend {
    fn list_routes(&self) -> impl Future<Output = Result<Vec<RouteSummary>, BackendError>> + Send;

    fn load_route(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<RouteEnvelope, BackendError>> + Send;

    fn save_route(
        &self,
        draft: &RouteDraft,
    ) -> impl Future<Output = Result<RouteEnvelope, BackendError>> + Send;

    fn metrics(
        &self,
        draft: &RouteDraft,
    ) -> impl Future<Output = Result<Metrics, BackendError>> + Send;

    fn export(
        &self,
        id: Uuid,
        format: ExportFormat,
    ) -> impl Future<Output = Result<Vec<u8>, BackendError>> + Send;
}

/// JSON-over-HTTP client for the route service.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    root: String,
}

impl HttpBackend {
    pub fn new(root: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        let root = root.into().trim_end_matches('/').to_string();
        Ok(Self { client, root })
    }

    pub fn from_config(config: &DraftConfig) -> Result<Self, BackendError> {
        Self::new(config.api_root.clone(), config.http_timeout)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.root, path)
    }
}

impl RouteBackend for HttpBackend {
    async fn list_routes(&self) -> Result<Vec<RouteSummary>, BackendError> {
        let response = self.client.get(self.url("routes")).send().await?;
        decode(response).await
    }

    async fn load_route(&self, id: Uuid) -> Result<RouteEnvelope, BackendError> {
        let response = self.client.get(self.url(&format!("routes/{id}"))).send().await?;
        decode(response).await
    }

    async fn save_route(&self, draft: &RouteDraft) -> Result<RouteEnvelope, BackendError> {
        tracing::debug!(
            "saving route {:?} with {} segments",
            draft.name,
            draft.segments.len()
        );
        let response = self
            .client
            .post(self.url("routes"))
            .json(draft)
            .send()
            .await?;
        decode(response).await
    }

    async fn metrics(&self, draft: &RouteDraft) -> Result<Metrics, BackendError> {
        let response = self
            .client
            .post(self.url("routes/metrics"))
            .json(draft)
            .send()
            .await?;
        decode(response).await
    }

    async fn export(&self, id: Uuid, format: ExportFormat) -> Result<Vec<u8>, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("routes/{id}/export/{format}")))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

impl SnapLookup for HttpBackend {
    async fn nearest(
        &self,
        point: Point,
        threshold_meters: f64,
    ) -> Result<Option<NearestHit>, BackendError> {
        let request = NearestRequest {
            lat: point.lat,
            lng: point.lng,
            threshold_meters,
        };
        let response = self
            .client
            .post(self.url("routes/nearest"))
            .json(&request)
            .send()
            .await?;
        // A miss is reported as 404.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let response = check_status(response).await?;
    Ok(response.json::<T>().await?)
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ApiError>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}
