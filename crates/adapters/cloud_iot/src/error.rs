//! Registry adapter error types.

use cropcloud_domain::error::{CropCloudError, NotFoundError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The request could not be sent or the response not read.
    #[error("registry request failed")]
    Http(#[from] reqwest::Error),

    /// The API refused the call. The message is the API's own.
    #[error("{message}")]
    Api { status: u16, message: String },
}

impl RegistryError {
    /// Map to the domain error, keeping the device id for 404s.
    pub fn into_domain(self, device_id: &str) -> CropCloudError {
        match self {
            Self::Api { status: 404, .. } => CropCloudError::NotFound(NotFoundError {
                entity: "Device",
                id: device_id.to_string(),
            }),
            other => CropCloudError::Remote(Box::new(other)),
        }
    }
}

impl From<RegistryError> for CropCloudError {
    fn from(err: RegistryError) -> Self {
        Self::Remote(Box::new(err))
    }
}
