use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db;

/// Failures surfaced to API callers.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unknown station: {0}")]
    UnknownStation(String),
    #[error("Invalid field '{field}' for station '{station}'")]
    InvalidField { station: String, field: String },
    #[error("Invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },
    #[error("Invalid year: {0}")]
    InvalidYear(String),
    #[error(transparent)]
    Store(#[from] db::Error),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::UnknownStation(_) => StatusCode::NOT_FOUND,
            Error::InvalidField { .. }
            | Error::InvalidDate { .. }
            | Error::InvalidRange { .. }
            | Error::InvalidYear(_) => StatusCode::BAD_REQUEST,
            Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("error handling request: {}", self);
        } else {
            warn!("rejected request: {}", self);
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
