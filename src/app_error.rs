use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("No event with uid {0}")]
    NoEvent(String),

    #[error("Connectivity: {0}")]
    Connectivity(#[from] crate::services::errors::ConnectivityError),
}

#[derive(Serialize)]
pub struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NoEvent(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Connectivity(_) => (StatusCode::CONFLICT, self.to_string()),
        };

        (
            status,
            Json(ErrorBody {
                code: status.as_u16(),
                message,
            }),
        )
            .into_response()
    }
}
