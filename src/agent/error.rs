use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("script_path must not be empty")]
    EmptyScriptPath,

    #[error("failed to spawn process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("unknown pid {0}")]
    UnknownPid(u32),

    #[error("invalid pid: {0}")]
    InvalidPid(String),

    #[error("failed to signal process: {0}")]
    SignalFailed(#[source] nix::errno::Errno),
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = match self {
            AgentError::EmptyScriptPath | AgentError::InvalidPid(_) => StatusCode::BAD_REQUEST,
            AgentError::UnknownPid(_) => StatusCode::NOT_FOUND,
            AgentError::SpawnFailed(_) | AgentError::SignalFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
