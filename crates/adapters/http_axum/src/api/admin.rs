//! JSON REST handlers for the user and device directory.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use cropcloud_app::ports::{AnalyticsSink, Clock, DeviceRegistry, EntityStore, TimeSeriesSink};
use cropcloud_domain::directory::{
    BasicDeviceInfo, DeviceDataSummary, DeviceList, DeviceRecord, DeviceSummary, EntityCounts,
    UserList,
};

use super::written;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserRequest {
    pub username: String,
    pub email_address: String,
    #[serde(default)]
    pub organization: String,
}

#[derive(Deserialize)]
pub struct AddDeviceRequest {
    pub device_name: String,
    #[serde(default)]
    pub device_notes: String,
}

#[derive(Deserialize)]
pub struct SaveImageRequest {
    pub url: String,
    pub camera_name: String,
}

/// Display fields of one device.
#[derive(Serialize)]
pub struct DeviceDetails {
    pub name: String,
    pub software_version: Option<String>,
}

/// `GET /api/admin/counts`
pub async fn counts<S, A, T, R, C>(State(state): State<AppState<S, A, T, R, C>>) -> Json<EntityCounts>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.directory.counts().await)
}

/// `GET /api/admin/users`
pub async fn users<S, A, T, R, C>(State(state): State<AppState<S, A, T, R, C>>) -> Json<UserList>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.directory.users().await)
}

/// `POST /api/admin/users`
pub async fn add_user<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Json(req): Json<UserRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    let id = state
        .directory
        .add_user(&req.username, &req.email_address, &req.organization)
        .await
        .ok_or(ApiError::Failed("add user"))?;
    Ok((StatusCode::CREATED, Json(json!({"user_uuid": id}))))
}

/// `PUT /api/admin/users/{id}`
pub async fn update_user<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(id): Path<String>,
    Json(req): Json<UserRequest>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    let updated = state
        .directory
        .update_user(&id, &req.username, &req.email_address, &req.organization)
        .await;
    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("User", id))
    }
}

/// `DELETE /api/admin/users/{id}`
pub async fn delete_user<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    if state.directory.delete_user(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("User", id))
    }
}

/// `GET /api/admin/devices`
pub async fn devices<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
) -> Json<DeviceList<DeviceSummary>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.directory.devices().await)
}

/// `POST /api/admin/devices`
pub async fn add_device<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Json(req): Json<AddDeviceRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    let device_uuid = state
        .directory
        .add_device(&req.device_name, &req.device_notes)
        .await
        .ok_or(ApiError::Failed("add device"))?;
    Ok((StatusCode::CREATED, Json(json!({"device_uuid": device_uuid}))))
}

/// `GET /api/admin/devices/basic`
pub async fn basic_devices<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
) -> Json<Vec<BasicDeviceInfo>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.directory.basic_devices().await)
}

/// `GET /api/admin/devices/data`
pub async fn device_data<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
) -> Json<DeviceList<DeviceDataSummary>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(state.directory.device_data_list().await)
}

/// `GET /api/admin/devices/{id}`
pub async fn device<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(id): Path<String>,
) -> Json<DeviceDetails>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(DeviceDetails {
        name: state.directory.device_name(&id).await,
        software_version: state.directory.software_version(&id).await,
    })
}

/// `PUT /api/admin/devices/{id}` replaces the device record; the path key wins
/// over any key in the body.
pub async fn save_device<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(id): Path<String>,
    Json(mut record): Json<DeviceRecord>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    record.device_uuid = id;
    written(state.directory.save_device(&record).await, "save device")
}

/// `DELETE /api/admin/devices/{id}`
pub async fn delete_device<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    written(state.directory.delete_device(&id).await, "delete device")
}

/// `GET /api/admin/devices/{id}/image`
pub async fn latest_image<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(id): Path<String>,
) -> Json<Value>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Json(json!({"url": state.directory.latest_image_url(&id).await}))
}

/// `POST /api/admin/devices/{id}/image`
pub async fn save_image<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(id): Path<String>,
    Json(req): Json<SaveImageRequest>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    written(
        state
            .directory
            .save_image_url(&id, &req.url, &req.camera_name)
            .await,
        "save image",
    )
}
