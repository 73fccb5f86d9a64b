//! Quote model and request/response bodies.

use serde::{Deserialize, Serialize};

/// A quote as exposed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    pub speaker: String,
    pub quote: String,
}

/// A validated quote ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuote {
    pub speaker: String,
    pub quote: String,
}

impl NewQuote {
    /// Build from raw fields, rejecting missing or blank values.
    pub fn parse(speaker: Option<&str>, quote: Option<&str>) -> Option<Self> {
        let speaker = speaker.map(str::trim).filter(|s| !s.is_empty())?;
        let quote = quote.map(str::trim).filter(|s| !s.is_empty())?;

        Some(Self {
            speaker: speaker.to_string(),
            quote: quote.to_string(),
        })
    }
}

/// Request body for submitting a single quote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateQuoteRequest {
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub quote: Option<String>,
}

impl CreateQuoteRequest {
    pub fn validate(&self) -> Option<NewQuote> {
        NewQuote::parse(self.speaker.as_deref(), self.quote.as_deref())
    }
}

/// Request body for submitting many quotes at once.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkQuotesRequest {
    #[serde(default)]
    pub quotes: Option<Vec<CreateQuoteRequest>>,
}

/// Body of `GET /api/quotes`.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesIndex {
    pub message: String,
    pub series: Vec<String>,
    pub endpoints: serde_json::Map<String, serde_json::Value>,
}

/// Body of `GET /api/quotes/:series`.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesQuotes {
    pub series: String,
    pub total: usize,
    pub quotes: Vec<Quote>,
}

/// Body of `GET /api/quotes/:series/random` and `POST /api/quotes/:series`.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesQuote {
    pub series: String,
    pub quote: Quote,
}

/// Body of `POST /api/quotes/:series/bulk`.
#[derive(Debug, Clone, Serialize)]
pub struct BulkInserted {
    pub series: String,
    pub inserted: usize,
}
