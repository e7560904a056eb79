//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod admin;
#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod ledgers;
#[allow(clippy::missing_errors_doc)]
pub mod recipes;
#[allow(clippy::missing_errors_doc)]
pub mod registry;
#[allow(clippy::missing_errors_doc)]
pub mod weather;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};

use cropcloud_app::ports::{AnalyticsSink, Clock, DeviceRegistry, EntityStore, TimeSeriesSink};

use crate::error::ApiError;
use crate::state::AppState;

/// `204` for a successful write, a `500` naming `operation` otherwise.
pub(crate) fn written(ok: bool, operation: &'static str) -> Result<StatusCode, ApiError> {
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::Failed(operation))
    }
}

/// Build the `/api` sub-router.
#[allow(clippy::too_many_lines)]
pub fn routes<S, A, T, R, C>() -> Router<AppState<S, A, T, R, C>>
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Router::new()
        // Device telemetry
        .route(
            "/devices/{device}/data/{property}",
            get(devices::data::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/current",
            get(devices::current::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/latest",
            get(devices::latest::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/history/co2",
            get(devices::co2_history::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/history/led",
            get(devices::led_history::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/history/temp-humidity",
            get(devices::temp_humidity_history::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/status",
            get(devices::status::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/messages",
            post(devices::relay_message::<S, A, T, R, C>),
        )
        // Notifications
        .route(
            "/devices/{device}/notifications",
            get(ledgers::notifications::<S, A, T, R, C>)
                .post(ledgers::add_notification::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/notifications/{id}",
            delete(ledgers::ack_notification::<S, A, T, R, C>),
        )
        // Runs
        .route(
            "/devices/{device}/runs",
            get(ledgers::runs::<S, A, T, R, C>).post(ledgers::start_run::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/runs/latest",
            get(ledgers::latest_run::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/runs/stop",
            post(ledgers::stop_run::<S, A, T, R, C>),
        )
        // Schedule
        .route("/schedule/commands", get(ledgers::commands::<S, A, T, R, C>))
        .route(
            "/devices/{device}/schedule",
            get(ledgers::schedule::<S, A, T, R, C>)
                .post(ledgers::add_schedule::<S, A, T, R, C>)
                .delete(ledgers::clear_schedule::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/schedule/check",
            post(ledgers::check_schedule::<S, A, T, R, C>),
        )
        .route(
            "/devices/{device}/schedule/{command}",
            delete(ledgers::remove_schedule::<S, A, T, R, C>),
        )
        // Recipes
        .route(
            "/recipe-config",
            get(recipes::read_config::<S, A, T, R, C>).put(recipes::write_config::<S, A, T, R, C>),
        )
        .route(
            "/recipes/{station}",
            post(recipes::save_recipe::<S, A, T, R, C>),
        )
        // Weather
        .route(
            "/weather/stations",
            get(weather::stations::<S, A, T, R, C>).post(weather::save_station::<S, A, T, R, C>),
        )
        .route(
            "/weather/{station}",
            get(weather::computed::<S, A, T, R, C>),
        )
        .route(
            "/weather/{station}/details",
            get(weather::details::<S, A, T, R, C>),
        )
        .route(
            "/weather/{station}/{series}",
            post(weather::save_series::<S, A, T, R, C>),
        )
        // Directory
        .route("/admin/counts", get(admin::counts::<S, A, T, R, C>))
        .route(
            "/admin/users",
            get(admin::users::<S, A, T, R, C>).post(admin::add_user::<S, A, T, R, C>),
        )
        .route(
            "/admin/users/{id}",
            put(admin::update_user::<S, A, T, R, C>).delete(admin::delete_user::<S, A, T, R, C>),
        )
        .route(
            "/admin/devices",
            get(admin::devices::<S, A, T, R, C>).post(admin::add_device::<S, A, T, R, C>),
        )
        .route(
            "/admin/devices/basic",
            get(admin::basic_devices::<S, A, T, R, C>),
        )
        .route(
            "/admin/devices/data",
            get(admin::device_data::<S, A, T, R, C>),
        )
        .route(
            "/admin/devices/{id}",
            get(admin::device::<S, A, T, R, C>)
                .put(admin::save_device::<S, A, T, R, C>)
                .delete(admin::delete_device::<S, A, T, R, C>),
        )
        .route(
            "/admin/devices/{id}/image",
            get(admin::latest_image::<S, A, T, R, C>).post(admin::save_image::<S, A, T, R, C>),
        )
        // Registry
        .route(
            "/registry/count",
            get(registry::count::<S, A, T, R, C>),
        )
        .route(
            "/registry/devices",
            get(registry::list::<S, A, T, R, C>).post(registry::register::<S, A, T, R, C>),
        )
        .route(
            "/registry/devices/{id}",
            delete(registry::delete::<S, A, T, R, C>),
        )
        .route(
            "/registry/devices/{id}/config",
            put(registry::send_config::<S, A, T, R, C>),
        )
        .route(
            "/registry/devices/{id}/start-recipe",
            post(registry::start_recipe::<S, A, T, R, C>),
        )
}
