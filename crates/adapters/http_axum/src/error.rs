//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use cropcloud_domain::error::{CropCloudError, NotFoundError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps service failures to an HTTP response with appropriate status code.
#[derive(Debug)]
pub enum ApiError {
    Domain(CropCloudError),
    /// A write reported failure; the cause was logged by the service.
    Failed(&'static str),
    /// A read through a remote service returned nothing; the cause was logged.
    Unavailable(&'static str),
}

impl ApiError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::Domain(CropCloudError::NotFound(NotFoundError {
            entity,
            id: id.into(),
        }))
    }
}

impl From<CropCloudError> for ApiError {
    fn from(err: CropCloudError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Domain(CropCloudError::Validation(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Domain(CropCloudError::NotFound(err)) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Domain(CropCloudError::Storage(err)) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            // Remote messages say why a device could not be reached.
            Self::Domain(CropCloudError::Remote(err)) => {
                tracing::error!(error = %err, "remote service error");
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            Self::Failed(operation) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to {operation}"),
            ),
            Self::Unavailable(service) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{service} unavailable"),
            ),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropcloud_domain::error::ValidationError;

    #[test]
    fn should_map_domain_errors_to_status_codes() {
        let cases = [
            (
                ApiError::from(CropCloudError::from(ValidationError::MissingDeviceKey)),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::not_found("Device", "EDU-1"), StatusCode::NOT_FOUND),
            (ApiError::Failed("save device"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ApiError::Unavailable("device registry"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
