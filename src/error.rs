/// Errors surfaced by the camera roll, the file cache and the image resolver.
///
/// Payloads are plain strings so the error is `Clone` and can be handed to every
/// caller joined on a shared fetch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RollError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Invalid localTime string, value={0}")]
    InvalidTimestamp(String),
    #[error("Photo source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Error copying file: {0}")]
    CopyFailed(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("Failed to acquire {0} lock")]
    Poisoned(&'static str),
}

impl From<std::io::Error> for RollError {
    fn from(e: std::io::Error) -> Self {
        RollError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for RollError {
    fn from(e: serde_json::Error) -> Self {
        RollError::Json(e.to_string())
    }
}

pub type RollResult<T> = Result<T, RollError>;
