use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("No frame available for this tick")]
    InputUnavailable,
    #[error("Malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },
    #[error("Evidence rendering failed: {0}")]
    EvidenceRendering(String),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
