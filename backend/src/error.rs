use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("route {0} not found")]
    NotFound(Uuid),
    #[error("segment {segment} not found in route {route}")]
    SegmentNotFound { route: Uuid, segment: Uuid },
    #[error("invalid route data: {0}")]
    InvalidData(String),
    #[error("failed to process GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("failed to parse KML document: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("failed to build KMZ archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
