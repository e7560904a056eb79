//! JSON REST handlers for the recipe generator config and recipe snapshots.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use cropcloud_app::ports::{AnalyticsSink, Clock, DeviceRegistry, EntityStore, TimeSeriesSink};
use cropcloud_domain::recipe::RecipeConfig;

use super::written;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SaveRecipeRequest {
    pub timestamp: String,
    pub recipe: Value,
}

/// `GET /api/recipe-config`
pub async fn read_config<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
) -> Result<Json<RecipeConfig>, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    state
        .recipe_config
        .read_config()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Recipe config", "config"))
}

/// `PUT /api/recipe-config`
pub async fn write_config<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Json(config): Json<RecipeConfig>,
) -> Result<StatusCode, ApiError>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    written(
        state.recipe_config.write_config(config).await,
        "write recipe config",
    )
}

/// `POST /api/recipes/{station}`
pub async fn save_recipe<S, A, T, R, C>(
    State(state): State<AppState<S, A, T, R, C>>,
    Path(station): Path<String>,
    Json(req): Json<SaveRecipeRequest>,
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
            .recipe_config
            .save_recipe(&station, &req.timestamp, &req.recipe)
            .await,
        "save recipe",
    )
}
