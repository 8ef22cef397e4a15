use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::likes::LikeError;

/// `{ "error": "..." }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for LikeError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            LikeError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            LikeError::InvalidKey(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            LikeError::Storage { .. } => {
                error!(error = %self, "like storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to access likes".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
