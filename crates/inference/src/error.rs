use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}

impl DetectError {
    /// Wraps a backend or post-processing failure, keeping the whole context chain.
    pub fn inference(err: anyhow::Error) -> Self {
        DetectError::InferenceFailed(format!("{err:#}"))
    }
}

impl From<anyhow::Error> for DetectError {
    fn from(err: anyhow::Error) -> Self {
        DetectError::inference(err)
    }
}
