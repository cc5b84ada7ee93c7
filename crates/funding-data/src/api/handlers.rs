//! API handlers for the funding data HTTP endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::aggregate::Granularity;
use crate::api::models::*;
use crate::error::FundingDataError;
use crate::service::{InstrumentHistory, QueryService};

pub struct ApiState {
    pub service: Arc<QueryService>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: FundingDataError) -> ApiError {
    let (status, code) = match &e {
        FundingDataError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        FundingDataError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };
    (status, Json(ErrorResponse::new(code, e.to_string())))
}

fn validation_error(message: impl Into<String>) -> ApiError {
    api_error(FundingDataError::Validation(message.into()))
}

fn parse_timestamp(name: &str, value: Option<&str>) -> Result<i64, ApiError> {
    let value = value.ok_or_else(|| validation_error(format!("{} is required", name)))?;
    value
        .parse::<i64>()
        .map_err(|_| validation_error(format!("{} must be an integer millisecond timestamp", name)))
}

fn parse_granularity(value: Option<&str>) -> Result<Option<Granularity>, ApiError> {
    match value {
        None => Ok(None),
        Some(token) => Granularity::parse(token).map(Some).ok_or_else(|| {
            validation_error(format!(
                "invalid granularity '{}' (expected one of 1m/5m/15m/30m/1h/4h/8h/24h)",
                token
            ))
        }),
    }
}

fn parse_range(params: &RangeParams) -> Result<(i64, i64), ApiError> {
    let start = parse_timestamp("start_time", params.start_time.as_deref())?;
    let end = parse_timestamp("end_time", params.end_time.as_deref())?;
    Ok((start, end))
}

/// Health check handler
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "ratewatch".to_string(),
    })
}

/// Most recent sample
pub async fn get_latest_sample(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<SampleEnvelope>, ApiError> {
    let sample = state.service.latest().await.map_err(api_error)?;
    Ok(Json(SampleEnvelope {
        success: true,
        sample: sample.into(),
    }))
}

/// Most recent sample with symbols resolved per rate
pub async fn get_latest_sample_full(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<LatestFullResponse>, ApiError> {
    let sample = state.service.latest().await.map_err(api_error)?;
    let registry = state.service.registry();

    let rates = sample
        .rates
        .into_iter()
        .map(|r| SymbolRateEntry {
            symbol: registry
                .symbol(r.instrument_id)
                .unwrap_or("UNKNOWN")
                .to_string(),
            instrument_id: r.instrument_id,
            rate: r.rate,
        })
        .collect();

    Ok(Json(LatestFullResponse {
        success: true,
        timestamp: sample.timestamp,
        reference_value: sample.reference_value,
        instrument_count: registry.len(),
        rates,
    }))
}

/// Samples in a time range, newest first
pub async fn list_samples(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<SamplesEnvelope>, ApiError> {
    let (start, end) = parse_range(&params)?;
    let samples = state.service.range(start, end).await.map_err(api_error)?;
    Ok(Json(SamplesEnvelope {
        success: true,
        count: samples.len(),
        samples: samples.into_iter().map(Into::into).collect(),
    }))
}

/// Per-instrument rate statistics over a range
pub async fn get_rate_stats(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<RateStatsEnvelope>, ApiError> {
    let (start, end) = parse_range(&params)?;
    let stats = state
        .service
        .rate_stats(start, end)
        .await
        .map_err(api_error)?;
    let registry = state.service.registry();

    let stats: Vec<RateStatsResponse> = stats
        .into_iter()
        .map(|s| {
            let symbol = registry.symbol(s.instrument_id);
            RateStatsResponse::from_stats(s, symbol)
        })
        .collect();

    Ok(Json(RateStatsEnvelope {
        success: true,
        count: stats.len(),
        stats,
    }))
}

/// Reference value statistics over a range
pub async fn get_reference_stats(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<ReferenceStatsEnvelope>, ApiError> {
    let (start, end) = parse_range(&params)?;
    let stats = state
        .service
        .reference_value_stats(start, end)
        .await
        .map_err(api_error)?;
    Ok(Json(stats.into()))
}

fn history_envelope(
    state: &ApiState,
    instrument_id: i32,
    granularity: Option<Granularity>,
    history: InstrumentHistory,
) -> HistoryEnvelope {
    let symbol = state
        .service
        .registry()
        .symbol(instrument_id)
        .unwrap_or("UNKNOWN")
        .to_string();

    match history {
        InstrumentHistory::Raw(points) => HistoryEnvelope {
            success: true,
            instrument_id,
            symbol,
            granularity: None,
            points: Some(points.into_iter().map(Into::into).collect()),
            buckets: None,
        },
        InstrumentHistory::Bucketed(buckets) => HistoryEnvelope {
            success: true,
            instrument_id,
            symbol,
            granularity: granularity.map(|g| g.as_str().to_string()),
            points: None,
            buckets: Some(buckets.into_iter().map(Into::into).collect()),
        },
    }
}

/// One instrument's history over an explicit range
pub async fn get_instrument_history(
    State(state): State<Arc<ApiState>>,
    Path(instrument_id): Path<i32>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryEnvelope>, ApiError> {
    let start = parse_timestamp("start_time", params.start_time.as_deref())?;
    let end = parse_timestamp("end_time", params.end_time.as_deref())?;
    let granularity = parse_granularity(params.granularity.as_deref())?;

    let history = state
        .service
        .instrument_history(instrument_id, start, end, granularity)
        .await
        .map_err(api_error)?;

    Ok(Json(history_envelope(&state, instrument_id, granularity, history)))
}

/// One instrument's history over a trailing duration window
pub async fn get_instrument_history_by_duration(
    State(state): State<Arc<ApiState>>,
    Path((instrument_id, duration)): Path<(i32, String)>,
    Query(params): Query<DurationParams>,
) -> Result<Json<HistoryEnvelope>, ApiError> {
    let granularity = parse_granularity(params.granularity.as_deref())?;

    let history = state
        .service
        .instrument_history_by_duration(instrument_id, &duration, granularity)
        .await
        .map_err(api_error)?;

    Ok(Json(history_envelope(&state, instrument_id, granularity, history)))
}
