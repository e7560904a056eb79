//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use cropcloud_app::ports::{AnalyticsSink, Clock, DeviceRegistry, EntityStore, TimeSeriesSink};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Serves the JSON API under `/api` with a [`TraceLayer`] logging each
/// request and response through `tracing`.
pub fn build<S, A, T, R, C>(state: AppState<S, A, T, R, C>) -> Router
where
    S: EntityStore + Clone + Send + Sync + 'static,
    A: AnalyticsSink + Send + Sync + 'static,
    T: TimeSeriesSink + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
    C: Clock + Clone + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ServiceSettings;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use cropcloud_app::ports::{Entity, Key, Query, SystemClock};
    use cropcloud_domain::analytics::AnalyticsRow;
    use cropcloud_domain::error::CropCloudError;
    use cropcloud_domain::registry::{NewRegistryDevice, RegistryDevice};
    use cropcloud_domain::timeseries::Point;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct StubStore;
    #[derive(Clone)]
    struct StubAnalytics;
    struct StubSink;
    struct StubRegistry;

    impl EntityStore for StubStore {
        async fn get(&self, _key: &Key) -> Result<Option<Entity>, CropCloudError> {
            Ok(None)
        }
        async fn put(&self, entity: Entity) -> Result<Key, CropCloudError> {
            Ok(entity.key)
        }
        async fn delete(&self, _key: &Key) -> Result<(), CropCloudError> {
            Ok(())
        }
        async fn query(&self, _query: &Query) -> Result<Vec<Entity>, CropCloudError> {
            Ok(vec![])
        }
        async fn keys(&self, _query: &Query) -> Result<Vec<Key>, CropCloudError> {
            Ok(vec![])
        }
    }

    impl AnalyticsSink for StubAnalytics {
        async fn insert(&self, _row: AnalyticsRow) -> Result<(), CropCloudError> {
            Ok(())
        }
    }

    impl TimeSeriesSink for StubSink {
        async fn write_points(&self, _points: Vec<Point>) -> Result<(), CropCloudError> {
            Ok(())
        }
    }

    impl DeviceRegistry for StubRegistry {
        async fn list_devices(&self) -> Result<Vec<String>, CropCloudError> {
            Ok(vec!["EDU-1".to_string()])
        }
        async fn get_device(&self, device_id: &str) -> Result<RegistryDevice, CropCloudError> {
            Ok(RegistryDevice {
                id: device_id.to_string(),
                ..RegistryDevice::default()
            })
        }
        async fn delete_device(&self, _device_id: &str) -> Result<(), CropCloudError> {
            Ok(())
        }
        async fn latest_config_version(
            &self,
            _device_id: &str,
        ) -> Result<Option<u64>, CropCloudError> {
            Ok(None)
        }
        async fn modify_config(
            &self,
            _device_id: &str,
            _version_to_update: u64,
            _data: Vec<u8>,
        ) -> Result<(), CropCloudError> {
            Ok(())
        }
        async fn send_command(
            &self,
            _device_id: &str,
            _subfolder: &str,
            _data: Vec<u8>,
        ) -> Result<(), CropCloudError> {
            Ok(())
        }
        async fn create_device(&self, _device: NewRegistryDevice) -> Result<(), CropCloudError> {
            Ok(())
        }
    }

    fn app() -> Router {
        build(AppState::new(
            StubStore,
            StubAnalytics,
            StubSink,
            StubRegistry,
            SystemClock,
            ServiceSettings::default(),
        ))
    }

    async fn get_status(uri: &str) -> StatusCode {
        app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn should_return_not_found_when_recipe_config_missing() {
        assert_eq!(get_status("/api/recipe-config").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_return_not_found_when_no_run_recorded() {
        assert_eq!(
            get_status("/api/devices/EDU-1/runs/latest").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn should_count_registered_devices() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/registry/count")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["registered"], "1");
    }

    #[tokio::test]
    async fn should_reject_unknown_weather_series() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/weather/station-1/hourly")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"timestamp": "2024-01-01T00:00:00Z", "doc": {"t": 1}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
