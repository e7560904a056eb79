//! MQTT adapter error types.

use cropcloud_domain::error::CropCloudError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client rejected a request.
    #[error("MQTT client error")]
    Client(#[from] rumqttc::ClientError),

    /// The connection to the broker failed.
    #[error("MQTT connection error")]
    Connection(#[from] rumqttc::ConnectionError),

    /// A message arrived on a topic that carries no device id.
    #[error("unexpected topic `{0}`")]
    InvalidTopic(String),

    /// Failed to parse an incoming MQTT payload as a JSON object.
    #[error("failed to parse MQTT payload")]
    PayloadParse(#[source] serde_json::Error),
}

impl From<MqttError> for CropCloudError {
    fn from(err: MqttError) -> Self {
        Self::Remote(Box::new(err))
    }
}
