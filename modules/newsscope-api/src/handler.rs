//! `GET /api/query` handler: the Query Path's HTTP surface.
//!
//! Validates and parses query params, resolves a cached or degraded
//! spectrum, then serves it with HTTP caching: ETag is the SHA-1 hex of
//! the canonical (sorted-key) JSON body, `If-None-Match` short-circuits to
//! 304, and `Cache-Control`/`CDN-Cache-Control` set a 4-hour freshness
//! window for edge and client caches.

use crate::canonical_json::canonicalize;
use crate::query;
use crate::AppState;
use axum::extract::{Query as AxumQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use newsscope_core::types::SpectrumRecord;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::sync::Arc;
use tracing::{error, info};

/// The wire shape served at `/api/query`: a `SpectrumRecord` stripped of
/// its cache key (`topic_label`, `topic_date`), which are storage
/// concerns the caller never asked about.
#[derive(Debug, Serialize)]
struct SpectrumResponse<'a> {
    spectrum_name: &'a Option<String>,
    spectrum_description: &'a Option<String>,
    spectrum_points: &'a [newsscope_core::types::SpectrumPoint],
    articles: &'a std::collections::BTreeMap<String, newsscope_core::types::CountryEntry>,
}

impl<'a> From<&'a SpectrumRecord> for SpectrumResponse<'a> {
    fn from(record: &'a SpectrumRecord) -> Self {
        Self {
            spectrum_name: &record.spectrum_name,
            spectrum_description: &record.spectrum_description,
            spectrum_points: &record.spectrum_points,
            articles: &record.articles_by_country,
        }
    }
}

const CACHE_CONTROL: &str = "public, max-age=14400";
const CDN_CACHE_CONTROL: &str = "public, s-maxage=14400";

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub query: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
}

pub async fn api_query(
    State(state): State<Arc<AppState>>,
    AxumQuery(params): AxumQuery<QueryParams>,
    headers: HeaderMap,
) -> Response {
    let (Some(query_text), Some(date_start_raw), Some(date_end_raw)) =
        (params.query, params.date_start, params.date_end)
    else {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(serde_json::json!({"error": "query, date_start, and date_end are required"})),
        )
            .into_response();
    };

    let date_start = match NaiveDate::parse_from_str(&date_start_raw, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(serde_json::json!({"error": "date_start must be YYYY-MM-DD"})),
            )
                .into_response()
        }
    };
    let date_end = match NaiveDate::parse_from_str(&date_end_raw, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(serde_json::json!({"error": "date_end must be YYYY-MM-DD"})),
            )
                .into_response()
        }
    };

    let result = run_query(&state, &query_text, date_start, date_end).await;

    let record = match result {
        Ok(record) => record,
        Err(e) => {
            error!(query = query_text, error = %e, "query path failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(serde_json::json!({"error": "internal error"})),
            )
                .into_response();
        }
    };

    let response = SpectrumResponse::from(&record);
    let body = serde_json::to_value(&response).unwrap_or(serde_json::Value::Null);
    let canonical = canonicalize(&body);
    let etag = format!("\"{}\"", hex::encode(Sha1::digest(canonical.as_bytes())));

    if let Some(if_none_match) = headers.get(axum::http::header::IF_NONE_MATCH) {
        if if_none_match.to_str().ok() == Some(etag.as_str()) {
            return StatusCode::NOT_MODIFIED.into_response();
        }
    }

    info!(query = query_text, topic_date = %record.topic_date, "query served");

    (
        StatusCode::OK,
        [
            (axum::http::header::CONTENT_TYPE, "application/json".to_string()),
            (axum::http::header::ETAG, etag),
            (axum::http::header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
            (
                axum::http::HeaderName::from_static("cdn-cache-control"),
                CDN_CACHE_CONTROL.to_string(),
            ),
        ],
        canonical,
    )
        .into_response()
}

async fn run_query(
    state: &AppState,
    query_text: &str,
    date_start: NaiveDate,
    date_end: NaiveDate,
) -> newsscope_core::error::Result<newsscope_core::types::SpectrumRecord> {
    let topic_date = query::resolve_cache_date(&state.pool, query_text, date_end).await?;

    if let Some(cached) =
        newsscope_spectrum::get_cached_spectrum_analysis(&state.pool, query_text, topic_date).await?
    {
        return Ok(cached);
    }

    query::build_degraded_spectrum(
        state.gemini.as_ref(),
        &state.pool,
        query_text,
        date_start,
        date_end,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_date_format_is_rejected() {
        assert!(NaiveDate::parse_from_str("not-a-date", "%Y-%m-%d").is_err());
    }
}
