//! JSON REST handlers relaying to the cloud device registry.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use cropcloud_app::ports::{AnalyticsSink, Clock, DeviceRegistry, EntityStore, TimeSeriesSink};
use cropcloud_app::services::RegistrationRequest;
use cropcloud_domain::directory::{DeviceList, DeviceRecord};
use cropcloud_domain::registry::{RegistrationCount, RegistryDeviceSummary};

use super::written;
use crate::error::ApiError;
use crate::state::AppState;

const REGISTRY: &str = "device registry";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub verification_code: String,
    pub device_name: String,
    #[serde(default)]
    pub device_notes: String,
    #[serde(default)]
    pub device_type: String,
    pub user_uuid: String,
}

#[derive(Deserialize)]
pub struct SendConfigRequest {
    pub commands: Value,
}

#[derive(Deserialize)]
pub struct StartRecipeRequest {
    pub recipe_uuid: String,
    #[serde(default)]
    pub recipe: Option<Value>,
}

/// `GET /api/registry/count`
pub async fn count<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
) -> Result<Json<RegistrationCount>, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    state
        .registry
        .registration_count()
        .await
        .map(Json)
        .ok_or(ApiError::Unavailable(REGISTRY))
}

/// `GET /api/registry/devices`
pub async fn list<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
) -> Result<Json<DeviceList<RegistryDeviceSummary>>, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    state
        .registry
        .device_list()
        .await
        .map(Json)
        .ok_or(ApiError::Unavailable(REGISTRY))
}

/// `POST /api/registry/devices` registers the device whose public key carries
/// the verification code, then records it in the directory.
pub async fn register<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    let device_type = if req.device_type.is_empty() {
        DeviceRecord::DEFAULT_TYPE
    } else {
        req.device_type.as_str()
    };
    let registration = state
        .registry
        .create_registry_entry(RegistrationRequest {
            verification_code: &req.verification_code,
            device_name: &req.device_name,
            device_notes: &req.device_notes,
            device_type,
            user_uuid: &req.user_uuid,
        })
        .await?;

    let record = DeviceRecord {
        device_name: req.device_name,
        device_notes: req.device_notes,
        device_type: device_type.to_string(),
        registration_date: Some(state.clock.now()),
        device_uuid: registration.device_id,
        user_uuid: req.user_uuid,
        device_software_version: registration.software_version,
    };
    if !state.directory.save_device(&record).await {
        return Err(ApiError::Failed("save registered device"));
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({"device_uuid": record.device_uuid})),
    ))
}

/// `DELETE /api/registry/devices/{id}`
pub async fn delete<S, A, T, R, C>(
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
    written(
        state.registry.delete_device(&id).await,
        "delete registry device",
    )
}

/// `PUT /api/registry/devices/{id}/config`
pub async fn send_config<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(id): Path<String>,
    Json(req): Json<SendConfigRequest>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    state.registry.send_recipe_config(&id, req.commands).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/registry/devices/{id}/start-recipe`
pub async fn start_recipe<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(id): Path<String>,
    Json(req): Json<StartRecipeRequest>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    state
        .registry
        .send_start_recipe(&id, &req.recipe_uuid, req.recipe)
        .await?;
    Ok(StatusCode::ACCEPTED)
}
