// JSON error responses for the HTTP adapter
use crate::application::session_registry::SessionError;
use crate::domain::simulation::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ApiErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_after_ms: Option<u64>,
}

impl ApiError {
    /// Rejected simulation input, shown as a short-lived status message.
    pub fn invalid_config(err: ConfigError, clear_after_ms: u64) -> Self {
        let error = match err {
            ConfigError::InvalidInterval => "invalid_interval",
            ConfigError::InvalidVolatility => "invalid_volatility",
        };
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: ApiErrorBody {
                error,
                message: err.to_string(),
                field: Some(err.field()),
                clear_after_ms: Some(clear_after_ms),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ApiErrorBody {
        &self.body
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                body: ApiErrorBody {
                    error: "session_not_found",
                    message: err.to_string(),
                    field: None,
                    clear_after_ms: None,
                },
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
