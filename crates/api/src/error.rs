//! Mapping of engine and remote failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use engine::EngineError;
use remote::RemoteError;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Remote(err) | ApiError::Engine(EngineError::Remote(err)) => remote_status(err),
            ApiError::Engine(EngineError::Decode { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Engine(EngineError::Encode { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn remote_status(err: &RemoteError) -> StatusCode {
    match err {
        RemoteError::NotFound(_) => StatusCode::NOT_FOUND,
        RemoteError::Unauthorized => StatusCode::UNAUTHORIZED,
        // The platform refused the document itself.
        RemoteError::Rejected { status, .. } if (400..500).contains(status) => StatusCode::UNPROCESSABLE_ENTITY,
        RemoteError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, error = %self, "request failed");
        (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_failure_kind() {
        let cases = [
            (ApiError::from(RemoteError::NotFound("wf".into())), StatusCode::NOT_FOUND),
            (ApiError::from(RemoteError::Unauthorized), StatusCode::UNAUTHORIZED),
            (
                ApiError::from(RemoteError::Rejected { status: 400, message: "bad".into() }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::from(RemoteError::Rejected { status: 503, message: "down".into() }),
                StatusCode::BAD_GATEWAY,
            ),
            (ApiError::from(RemoteError::Unavailable("refused".into())), StatusCode::BAD_GATEWAY),
            (
                ApiError::from(EngineError::Remote(RemoteError::NotFound("wf".into()))),
                StatusCode::NOT_FOUND,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn body_carries_success_false_and_message() {
        let response = ApiError::from(RemoteError::NotFound("wf-9".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("wf-9"));
    }
}
