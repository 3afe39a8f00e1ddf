use crate::fetch::FetchError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use inference::DetectError;
use serde::Serialize;
use thiserror::Error;

pub const MISSING_FIELDS: &str = "No imageUrl or model provided";
pub const INVALID_MODEL: &str = "Invalid model name";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{}", MISSING_FIELDS)]
    MissingFields,

    #[error("{}", INVALID_MODEL)]
    InvalidModel,

    #[error("{0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    UnprocessableImage(String),

    #[error("{0}")]
    Inference(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields | ApiError::InvalidModel | ApiError::InvalidUrl(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::UnprocessableImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Inference(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for logs and metric attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingFields | ApiError::InvalidModel | ApiError::InvalidUrl(_) => {
                "validation"
            }
            ApiError::Upstream(_) => "upstream_fetch",
            ApiError::UnprocessableImage(_) => "decode",
            ApiError::Inference(_) => "inference",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(_) => ApiError::InvalidUrl(err.to_string()),
            FetchError::Upstream(_) | FetchError::TooLarge { .. } => {
                ApiError::Upstream(err.to_string())
            }
            FetchError::Decode(_) => ApiError::UnprocessableImage(err.to_string()),
        }
    }
}

impl From<DetectError> for ApiError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::UnknownModel(_) => ApiError::InvalidModel,
            DetectError::InvalidImage(_) => ApiError::UnprocessableImage(err.to_string()),
            DetectError::InferenceFailed(_) => ApiError::Inference(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "Request rejected");
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
