use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;

use super::types::ErrorResponse;
use crate::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// API错误类型，统一以 HTTP 状态码和 `{"error": ...}` 返回
pub struct AppError(pub Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::ImageNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidPath(_) | Error::InvalidContentType(_) | Error::Rejection(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("请求处理失败: {}", self.0);
        }
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

/// 将 axum 的参数提取错误转换为统一的错误响应
pub fn rejected(rejection: impl std::fmt::Display) -> AppError {
    AppError(Error::Rejection(rejection.to_string()))
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
