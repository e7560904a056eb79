//! JSON REST handlers for the weather station cache.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};

use cropcloud_app::ports::{AnalyticsSink, Clock, DeviceRegistry, EntityStore, TimeSeriesSink};
use cropcloud_domain::weather::Reading;

use super::written;
use crate::error::ApiError;
use crate::state::AppState;

/// Inclusive `YYYY-MM-DD` date range.
#[derive(Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// One document received from a station at `timestamp`.
#[derive(Deserialize)]
pub struct StationDocument {
    pub timestamp: String,
    pub doc: Map<String, Value>,
}

/// `GET /api/weather/stations`
pub async fn stations<S, A, T, R, C>(State(state): State<AppState<S, A, T, R, C>>) -> Json<Vec<String>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.weather.stations().await)
}

/// `POST /api/weather/stations` stores a station detail snapshot. The
/// station name is read from the document.
pub async fn save_station<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Json(req): Json<StationDocument>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    written(
        state.weather.save_station(&req.timestamp, &req.doc).await,
        "save station",
    )
}

/// `GET /api/weather/{station}?start=YYYY-MM-DD&end=YYYY-MM-DD`
pub async fn computed<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(station): Path<String>,
    Query(range): Query<DateRange>,
) -> Json<Vec<Reading>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(
        state
            .weather
            .computed_weather(&range.start, &range.end, &station)
            .await,
    )
}

/// `GET /api/weather/{station}/details`
pub async fn details<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(station): Path<String>,
) -> Json<Reading>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.weather.station_details(&station).await)
}

/// `POST /api/weather/{station}/{series}` where `series` is one of
/// `computed`, `raw_five_min` or `raw_aux`.
pub async fn save_series<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path((station, series)): Path<(String, String)>,
    Json(req): Json<StationDocument>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    let weather = &state.weather;
    let ok = match series.as_str() {
        "computed" => weather.save_computed(&req.timestamp, &station, &req.doc).await,
        "raw_five_min" => weather.save_raw_five_min(&req.timestamp, &station, &req.doc).await,
        "raw_aux" => weather.save_raw_aux(&req.timestamp, &station, &req.doc).await,
        _ => return Err(ApiError::not_found("Weather series", series.clone())),
    };
    written(ok, "save weather reading")
}
