//! Startup bootstrap: seed series from SQL and import quotes from JSON.
//!
//! The quotes document is a JSON object mapping a series slug to an array of
//! `{"speaker": ..., "quote": ...}` entries. Entries missing either field are
//! skipped rather than treated as errors.

use std::path::Path;

use serde_json::{Map, Value};

use crate::db::{DocumentSeries, Store};
use crate::errors::AppError;
use crate::models::{humanize_slug, is_valid_slug, normalize_slug, NewQuote};

/// Totals from one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub series_created: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub malformed: usize,
}

/// What `bootstrap` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub seeded_series: bool,
    pub import: Option<ImportReport>,
}

/// Locations of the bootstrap documents.
#[derive(Debug, Clone, Copy)]
pub struct SeedPaths<'a> {
    pub seed_sql: &'a Path,
    pub quotes_json: &'a Path,
}

/// Seed the canonical series when none exist, then import quotes when the
/// quotes table is empty. With `reimport`, the JSON import also runs on a
/// populated database, skipping quotes that are already stored.
pub async fn bootstrap(
    store: &Store,
    paths: SeedPaths<'_>,
    reimport: bool,
) -> Result<BootstrapReport, AppError> {
    let mut report = BootstrapReport::default();

    if store.count_series().await? == 0 {
        report.seeded_series = run_seed_script(store, paths.seed_sql).await?;
    }

    if store.count_quotes().await? == 0 {
        report.import = import_quotes_file(store, paths.quotes_json, false).await?;
    } else if reimport {
        report.import = import_quotes_file(store, paths.quotes_json, true).await?;
    }

    Ok(report)
}

/// Execute the seed script if it exists. Returns whether it ran.
pub async fn run_seed_script(store: &Store, path: &Path) -> Result<bool, AppError> {
    if !tokio::fs::try_exists(path).await? {
        tracing::info!("No seed script at {:?}, skipping", path);
        return Ok(false);
    }

    let sql = tokio::fs::read_to_string(path).await?;
    store.run_script(&sql).await?;
    tracing::info!("Applied seed script {:?}", path);
    Ok(true)
}

/// Import quotes from a JSON file if it exists.
pub async fn import_quotes_file(
    store: &Store,
    path: &Path,
    skip_existing: bool,
) -> Result<Option<ImportReport>, AppError> {
    if !tokio::fs::try_exists(path).await? {
        tracing::info!("No quotes document at {:?}, skipping import", path);
        return Ok(None);
    }

    let raw = tokio::fs::read_to_string(path).await?;
    let document: Map<String, Value> = serde_json::from_str(&raw)?;
    let report = import_quotes(store, &document, skip_existing).await?;

    tracing::info!(
        series_created = report.series_created,
        inserted = report.inserted,
        skipped = report.skipped,
        malformed = report.malformed,
        "Imported quotes from {:?}",
        path
    );
    Ok(Some(report))
}

/// Import a parsed quotes document in document order. The whole document is
/// stored in one transaction, so a failure leaves no partial import behind.
pub async fn import_quotes(
    store: &Store,
    document: &Map<String, Value>,
    skip_existing: bool,
) -> Result<ImportReport, AppError> {
    let mut report = ImportReport::default();
    let mut batch = Vec::with_capacity(document.len());

    for (raw_slug, entries) in document {
        let slug = normalize_slug(raw_slug);
        if !is_valid_slug(&slug) {
            tracing::warn!("Skipping series with invalid slug {:?}", raw_slug);
            report.malformed += 1;
            continue;
        }

        let Some(entries) = entries.as_array() else {
            tracing::warn!("Skipping series {:?}: quotes must be an array", slug);
            report.malformed += 1;
            continue;
        };

        let mut quotes = Vec::with_capacity(entries.len());
        for entry in entries {
            match parse_entry(entry) {
                Some(quote) => quotes.push(quote),
                None => {
                    tracing::debug!("Skipping malformed entry in {:?}: {}", slug, entry);
                    report.malformed += 1;
                }
            }
        }

        batch.push(DocumentSeries {
            name: humanize_slug(&slug),
            slug,
            quotes,
        });
    }

    for result in store.import_document(&batch, skip_existing).await? {
        if result.series_created {
            report.series_created += 1;
        }
        report.inserted += result.inserted;
        report.skipped += result.skipped;
    }

    Ok(report)
}

fn parse_entry(entry: &Value) -> Option<NewQuote> {
    NewQuote::parse(
        entry.get("speaker").and_then(Value::as_str),
        entry.get("quote").and_then(Value::as_str),
    )
}
