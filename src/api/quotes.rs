//! Quote API endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Map};

use super::{ApiResult, SeriesSlug};
use crate::db::RandomQuote;
use crate::errors::AppError;
use crate::models::{
    BulkInserted, BulkQuotesRequest, CreateQuoteRequest, NewQuote, SeriesIndex, SeriesQuote,
    SeriesQuotes,
};
use crate::AppState;

/// GET /api/quotes - List series slugs and the endpoint map.
pub async fn list_series(State(state): State<AppState>) -> ApiResult<Json<SeriesIndex>> {
    let series = state.store.list_series_slugs().await?;
    let writes_enabled = state.config.writes_enabled;

    let mut endpoints = Map::new();
    endpoints.insert("allQuotesBySeries".into(), json!("/api/quotes/:series"));
    endpoints.insert("randomQuoteBySeries".into(), json!("/api/quotes/:series/random"));
    if writes_enabled {
        endpoints.insert("addQuoteToSeries".into(), json!("POST /api/quotes/:series"));
        endpoints.insert("addQuotesBulk".into(), json!("POST /api/quotes/:series/bulk"));
    }

    let mode = if writes_enabled { "read-write" } else { "read-only" };

    Ok(Json(SeriesIndex {
        message: format!("Quotes API is ready in {} mode.", mode),
        series,
        endpoints,
    }))
}

/// GET /api/quotes/:series - All quotes of a series in insertion order.
pub async fn get_series_quotes(
    State(state): State<AppState>,
    Extension(SeriesSlug(slug)): Extension<SeriesSlug>,
) -> ApiResult<Json<SeriesQuotes>> {
    let Some(quotes) = state.store.get_quotes(&slug).await? else {
        return Err(unknown_series(&state, &slug).await);
    };

    Ok(Json(SeriesQuotes {
        series: slug,
        total: quotes.len(),
        quotes,
    }))
}

/// GET /api/quotes/:series/random - One random quote of a series.
pub async fn get_random_quote(
    State(state): State<AppState>,
    Extension(SeriesSlug(slug)): Extension<SeriesSlug>,
) -> ApiResult<Json<SeriesQuote>> {
    match state.store.get_random_quote(&slug).await? {
        RandomQuote::Found(quote) => Ok(Json(SeriesQuote {
            series: slug,
            quote,
        })),
        RandomQuote::EmptySeries => Err(AppError::not_found(format!(
            "No quotes available yet for '{}'.",
            slug
        ))),
        RandomQuote::UnknownSeries => Err(unknown_series(&state, &slug).await),
    }
}

/// POST /api/quotes/:series - Submit one quote (read-write deployments).
pub async fn create_quote(
    State(state): State<AppState>,
    Extension(SeriesSlug(slug)): Extension<SeriesSlug>,
    body: Result<Json<CreateQuoteRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SeriesQuote>)> {
    let Json(request) = body?;

    let Some(new_quote) = request.validate() else {
        return Err(AppError::Validation(
            "Both 'speaker' and 'quote' are required non-empty strings.".to_string(),
        ));
    };

    match state.store.insert_quote(&slug, &new_quote).await? {
        Some(quote) => {
            tracing::info!(series = %slug, id = quote.id, "Quote added");
            Ok((
                StatusCode::CREATED,
                Json(SeriesQuote {
                    series: slug,
                    quote,
                }),
            ))
        }
        None => Err(unknown_series(&state, &slug).await),
    }
}

/// POST /api/quotes/:series/bulk - Submit many quotes atomically (read-write
/// deployments). One invalid item rejects the whole batch.
pub async fn create_quotes_bulk(
    State(state): State<AppState>,
    Extension(SeriesSlug(slug)): Extension<SeriesSlug>,
    body: Result<Json<BulkQuotesRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BulkInserted>)> {
    let Json(request) = body?;

    let items = request.quotes.unwrap_or_default();
    if items.is_empty() {
        return Err(AppError::Validation(
            "Provide a non-empty 'quotes' array.".to_string(),
        ));
    }

    let quotes = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.validate().ok_or_else(|| {
                AppError::Validation(format!(
                    "Quote at index {} needs non-empty 'speaker' and 'quote' strings.",
                    index
                ))
            })
        })
        .collect::<Result<Vec<NewQuote>, AppError>>()?;

    match state.store.insert_quotes_bulk(&slug, &quotes).await? {
        Some(inserted) => {
            tracing::info!(series = %slug, inserted, "Quotes added in bulk");
            Ok((
                StatusCode::CREATED,
                Json(BulkInserted {
                    series: slug,
                    inserted,
                }),
            ))
        }
        None => Err(unknown_series(&state, &slug).await),
    }
}

/// Any non-GET request on /api/quotes/:series in read-only deployments.
pub async fn submission_disabled() -> AppError {
    AppError::Forbidden("Quote submission is disabled for public users.".to_string())
}

/// Any request on /api/quotes/:series/bulk in read-only deployments.
pub async fn bulk_submission_disabled() -> AppError {
    AppError::Forbidden("Bulk quote submission is disabled for public users.".to_string())
}

async fn unknown_series(state: &AppState, slug: &str) -> AppError {
    match state.store.list_series_slugs().await {
        Ok(available) => AppError::unknown_series(slug, available),
        Err(e) => e,
    }
}
