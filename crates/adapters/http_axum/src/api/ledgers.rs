//! JSON REST handlers for the per-device notification, run and schedule
//! ledgers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use cropcloud_app::ports::{AnalyticsSink, Clock, DeviceRegistry, EntityStore, TimeSeriesSink};
use cropcloud_domain::notification::Notification;
use cropcloud_domain::run::Run;
use cropcloud_domain::error::CropCloudError;
use cropcloud_domain::schedule::{Command, CommandInfo, ScheduleEntry};

use super::written;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for queuing a notification.
#[derive(Deserialize)]
pub struct AddNotificationRequest {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, alias = "URL")]
    pub url: Option<String>,
}

#[derive(Deserialize)]
pub struct StartRunRequest {
    pub recipe_name: String,
}

/// Request body for scheduling a command. `repeat_hours` overrides the
/// command's default interval.
#[derive(Deserialize)]
pub struct AddScheduleRequest {
    pub command: String,
    pub repeat_hours: Option<u32>,
}

/// `GET /api/devices/{device}/notifications`
pub async fn notifications<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Json<Vec<Notification>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.notifications.get_unacknowledged(&device).await)
}

/// `POST /api/devices/{device}/notifications`
pub async fn add_notification<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
    Json(req): Json<AddNotificationRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    let id = state
        .notifications
        .add(&device, &req.message, &req.kind, req.url)
        .await
        .ok_or(ApiError::Failed("add notification"))?;
    Ok((StatusCode::CREATED, Json(json!({"ID": id.to_string()}))))
}

/// `DELETE /api/devices/{device}/notifications/{id}` acknowledges the
/// notification.
pub async fn ack_notification<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path((device, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    if state.notifications.ack(&device, &id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Notification", id))
    }
}

/// `GET /api/devices/{device}/runs`
pub async fn runs<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Json<Vec<Run>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.runs.get_all(&device).await)
}

/// `GET /api/devices/{device}/runs/latest`
pub async fn latest_run<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Result<Json<Run>, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    state
        .runs
        .get_latest(&device)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Run", device))
}

/// `POST /api/devices/{device}/runs`
pub async fn start_run<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
    Json(req): Json<StartRunRequest>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    written(
        state.runs.start(&device, &req.recipe_name).await,
        "start run",
    )
}

/// `POST /api/devices/{device}/runs/stop`
pub async fn stop_run<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    written(state.runs.stop(&device).await, "stop run")
}

/// `GET /api/schedule/commands`
pub async fn commands<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
) -> Json<Vec<CommandInfo>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.scheduler.commands())
}

/// `GET /api/devices/{device}/schedule`
pub async fn schedule<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Json<Vec<ScheduleEntry>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.scheduler.schedule(&device).await)
}

/// `POST /api/devices/{device}/schedule`
pub async fn add_schedule<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
    Json(req): Json<AddScheduleRequest>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    req.command
        .parse::<Command>()
        .map_err(CropCloudError::from)?;
    if let Some(hours) = req.repeat_hours {
        ScheduleEntry::check_repeat_hours(hours).map_err(CropCloudError::from)?;
    }
    written(
        state
            .scheduler
            .add(&device, &req.command, req.repeat_hours)
            .await,
        "schedule command",
    )
}

/// `POST /api/devices/{device}/schedule/check` fires every due command.
pub async fn check_schedule<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Json<Value>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    let fired = state.scheduler.check(&device).await;
    Json(json!({"fired": fired}))
}

/// `DELETE /api/devices/{device}/schedule/{command}`
pub async fn remove_schedule<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path((device, command)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    written(
        state.scheduler.remove(&device, &command).await,
        "remove scheduled command",
    )
}

/// `DELETE /api/devices/{device}/schedule`
pub async fn clear_schedule<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(device): Path<String>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    written(state.scheduler.remove_all(&device).await, "clear schedule")
}
