//! Error handling module for the quotes backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and the
//! uniform `{"error": ...}` response body.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Message returned for every 500; details stay in the logs.
const INTERNAL_MESSAGE: &str = "Internal server error.";

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Malformed slug or request body
    Validation(String),
    /// Resource not found, optionally listing the series that do exist
    NotFound {
        message: String,
        available_series: Option<Vec<String>>,
    },
    /// Write attempted against a read-only deployment
    Forbidden(String),
    /// Client exceeded its request quota
    RateLimited {
        message: String,
        retry_after_secs: u64,
    },
    /// Database error
    Database(String),
    /// Filesystem error while reading bootstrap documents
    Io(String),
}

impl AppError {
    /// Not-found error without a series listing.
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound {
            message: message.into(),
            available_series: None,
        }
    }

    /// Unknown-series error carrying the slugs that are available.
    pub fn unknown_series(slug: &str, available: Vec<String>) -> Self {
        AppError::NotFound {
            message: format!("Series '{}' not found.", slug),
            available_series: Some(available),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound { message, .. } => message.clone(),
            AppError::Forbidden(msg) => msg.clone(),
            AppError::RateLimited { message, .. } => message.clone(),
            AppError::Database(msg) => msg.clone(),
            AppError::Io(msg) => msg.clone(),
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            INTERNAL_MESSAGE.to_string()
        } else {
            self.message()
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status_code().as_u16(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Validation(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {:?}", err);
        AppError::Io(format!("I/O error: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AppError::Validation("Request body must be a JSON object.".to_string())
    }
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_series: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let available_series = match error {
            AppError::NotFound {
                available_series, ..
            } => available_series.clone(),
            _ => None,
        };

        Self {
            error: error.public_message(),
            available_series,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        let mut response = (status, Json(body)).into_response();

        if let AppError::RateLimited {
            retry_after_secs, ..
        } = self
        {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs.max(1)),
            );
        }

        response
    }
}
