use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("meal plan not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ApiError {
    fn kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError"),
        }
    }
}

impl From<mealsync_shared::Error> for ApiError {
    fn from(value: mealsync_shared::Error) -> Self {
        match value {
            mealsync_shared::Error::Validate(message) => ApiError::BadRequest(message),
            mealsync_shared::Error::NotFound => ApiError::NotFound,
            mealsync_shared::Error::Forbidden => ApiError::Forbidden,
            mealsync_shared::Error::Server(message) => ApiError::Internal(message),
            mealsync_shared::Error::Unknown(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.kind();

        let message = match &self {
            ApiError::Internal(message) => {
                tracing::error!("{message}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_errors_map_to_status() {
        let cases = [
            (
                mealsync_shared::Error::Validate("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (mealsync_shared::Error::NotFound, StatusCode::NOT_FOUND),
            (mealsync_shared::Error::Forbidden, StatusCode::FORBIDDEN),
            (
                mealsync_shared::Error::Server("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_message_is_hidden() {
        let response = ApiError::Internal("database is locked".to_string()).into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"], "InternalServerError");
        assert_eq!(json["message"], "Internal server error");
    }
}
