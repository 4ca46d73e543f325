use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend answered {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("a preliminary route cannot be saved, mark it final first")]
    PreliminarySave,
    #[error("a preliminary route cannot be exported, mark it final and save it first")]
    PreliminaryExport,
    #[error("save the route before exporting it")]
    NoSavedRoute,
    #[error(transparent)]
    Backend(#[from] BackendError),
}
