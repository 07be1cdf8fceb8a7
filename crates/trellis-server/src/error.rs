//! Error responses for the backend API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use trellis_core::GraphError;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    #[error("invalid pipeline graph: {0}")]
    InvalidGraph(#[from] GraphError),
}

impl BackendError {
    pub fn status(&self) -> StatusCode {
        match self {
            BackendError::UnknownComponent(_) => StatusCode::NOT_FOUND,
            BackendError::InvalidGraph(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            BackendError::UnknownComponent(_) => "ERR_NOT_FOUND_COMPONENT",
            BackendError::InvalidGraph(_) => "ERR_VALIDATION_ERROR",
        }
    }
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let body = Json(json!({
            "error": message,
            "errorDetails": {
                "errorCode": self.code(),
                "errorMessage": message,
            }
        }));
        (self.status(), body).into_response()
    }
}
