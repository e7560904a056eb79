//! JSON REST handlers for device telemetry and inbound messages.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use cropcloud_app::ports::{AnalyticsSink, Clock, DeviceRegistry, EntityStore, TimeSeriesSink};
use cropcloud_app::services::message_relay::Handled;
use cropcloud_domain::device_data::{DeviceStatus, HistoryPoint, TempHumidityHistory};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Latest scalar readings, two decimals, empty when unknown.
#[derive(Serialize)]
pub struct CurrentValues {
    pub co2: String,
    pub temp: String,
    pub rh: String,
    pub ec: String,
    pub ph: String,
    pub h2o_temp: String,
}

/// `GET /api/devices/{device}/data/{property}`
pub async fn data<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path((device, property)): Path<(String, String)>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<Value>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(
        state
            .device_data
            .device_data(&property, &device, query.limit)
            .await,
    )
}

/// `GET /api/devices/{device}/current`
pub async fn current<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Json<CurrentValues>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    let data = &state.device_data;
    Json(CurrentValues {
        co2: data.current_co2_value(&device).await,
        temp: data.current_temp_value(&device).await,
        rh: data.current_rh_value(&device).await,
        ec: data.current_ec_value(&device).await,
        ph: data.current_ph_value(&device).await,
        h2o_temp: data.current_h2o_temp_value(&device).await,
    })
}

/// `GET /api/devices/{device}/latest`
pub async fn latest<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Json<BTreeMap<String, String>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.device_data.latest_properties(&device).await)
}

/// `GET /api/devices/{device}/history/co2`
pub async fn co2_history<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Json<Vec<HistoryPoint>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.device_data.co2_history(&device).await)
}

/// `GET /api/devices/{device}/history/led`
pub async fn led_history<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Json<Vec<String>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.device_data.led_panel_history(&device).await)
}

/// `GET /api/devices/{device}/history/temp-humidity`
pub async fn temp_humidity_history<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Json<TempHumidityHistory>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.device_data.temp_and_humidity_history(&device).await)
}

/// `GET /api/devices/{device}/status`
pub async fn status<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Result<Json<DeviceStatus>, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    state
        .device_data
        .device_status(&device)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Device status", device))
}

/// `POST /api/devices/{device}/messages`
///
/// Same dispatch as messages received from the broker.
pub async fn relay_message<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    let body = match state.relay.handle(&device, &payload).await? {
        Handled::Written { points } => json!({"points": points}),
        Handled::Run { action, applied } => json!({"action": action, "applied": applied}),
        Handled::Ignored => json!({"ignored": true}),
    };
    Ok((StatusCode::ACCEPTED, Json(body)))
}
