//! REST API module.
//!
//! Handlers read the series slug from the [`SeriesSlug`] extension that
//! [`normalize_series`] installs, so they only ever see normalized, valid slugs.

mod quotes;

pub use quotes::*;

use axum::{
    extract::{rejection::PathRejection, Path, Request},
    middleware::Next,
    response::Response,
    Json,
};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::{is_valid_slug, normalize_slug};

/// Response type for all API handlers.
pub type ApiResult<T> = Result<T, AppError>;

/// Normalized, validated `:series` path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSlug(pub String);

/// Route layer for every `/quotes/{series}` route: trims and lowercases the
/// slug, rejects it with 400 unless it matches `[a-z0-9-]{2,40}`.
pub async fn normalize_series(
    path: Result<Path<String>, PathRejection>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let slug = path.map(|Path(raw)| normalize_slug(&raw)).unwrap_or_default();

    if !is_valid_slug(&slug) {
        return Err(AppError::Validation(
            "Invalid series format. Use lowercase letters, numbers, and dashes only.".to_string(),
        ));
    }

    request.extensions_mut().insert(SeriesSlug(slug));
    Ok(next.run(request).await)
}

/// GET /api/health
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Fallback for unmatched `/api/*` requests.
pub async fn endpoint_not_found() -> AppError {
    AppError::not_found("Endpoint not found.")
}
