use crate::error::MqttError;

/// Device id carried by a telemetry topic such as
/// `/devices/EDU-6B1261EF-b8-27-eb/events`.
///
/// # Errors
///
/// Returns [`MqttError::InvalidTopic`] when the topic has no `devices`
/// segment followed by a non-empty id.
pub fn device_id_from_topic(topic: &str) -> Result<&str, MqttError> {
    let mut segments = topic.split('/').skip_while(|segment| *segment != "devices");
    segments.next();
    match segments.next().map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(MqttError::InvalidTopic(topic.to_string())),
    }
}
