use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("script_path must not be empty")]
    EmptyScriptPath,
    #[error("host must not be empty")]
    EmptyHost,
    #[error("unknown workload {0}")]
    UnknownWorkload(String),
}

impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let status = match self {
            SchedulerError::EmptyScriptPath | SchedulerError::EmptyHost => StatusCode::BAD_REQUEST,
            SchedulerError::UnknownWorkload(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
