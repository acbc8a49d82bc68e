use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("资源未找到")]
    NotFound,

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("未授权")]
    Unauthorized,

    #[error("客户端断开连接")]
    ClientDisconnected,

    #[error("内部服务器错误")]
    Internal(#[from] anyhow::Error),
}

impl ServerError {
    pub fn internal(msg: impl std::fmt::Display) -> Self {
        ServerError::Internal(anyhow::anyhow!("{}", msg))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ServerError::Validation(msg.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ServerError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            ServerError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            ServerError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string())
            }
            // 传输层错误，正常不会到达 HTTP 层
            ServerError::ClientDisconnected => {
                (StatusCode::BAD_REQUEST, "disconnected", self.to_string())
            }
            ServerError::Internal(err) => {
                // 记录内部错误但不暴露详细信息
                tracing::error!(error = ?err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// 处理器的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
