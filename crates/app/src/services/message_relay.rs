//! Message relay: validates inbound device messages and dispatches them to
//! the time-series sink, the runs ledger and the device data cache.

use chrono::SubsecRound;
use serde_json::{Map, Value, json};

use cropcloud_domain::error::{CropCloudError, ValidationError};
use cropcloud_domain::id::DeviceKey;
use cropcloud_domain::message::{
    DeviceMessage, ENV_VARS_MEASUREMENT, RecipeAction, VariableReport,
};
use cropcloud_domain::shard::kind;
use cropcloud_domain::time::{Timestamp, format_timestamp};

use crate::ports::{Clock, EntityStore, TimeSeriesSink};

use super::device_data::DeviceDataAccessor;
use super::runs::RunsLedger;

/// What the relay did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    /// Points were written to the time-series sink.
    Written { points: usize },
    /// A recipe event updated the runs ledger.
    Run { action: &'static str, applied: bool },
    /// The message type is accepted but no longer processed.
    Ignored,
}

pub struct MessageRelay<T, S, C> {
    sink: T,
    runs: RunsLedger<S, C>,
    data: DeviceDataAccessor<S>,
    clock: C,
    mirror_device_data: bool,
}

impl<T, S, C> MessageRelay<T, S, C>
where
    T: TimeSeriesSink,
    S: EntityStore,
    C: Clock + Clone,
{
    pub fn new(sink: T, store: S, clock: C) -> Self
    where
        S: Clone,
    {
        Self {
            sink,
            runs: RunsLedger::new(store.clone(), clock.clone()),
            data: DeviceDataAccessor::new(store),
            clock,
            mirror_device_data: false,
        }
    }

    /// Also append every variable report to the device's `DeviceData` series
    /// so the history and current-value reads see it.
    #[must_use]
    pub fn with_device_data_mirror(mut self, enabled: bool) -> Self {
        self.mirror_device_data = enabled;
        self
    }

    /// Validate and dispatch one message from `device_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CropCloudError::Validation`] for a blank device id or a
    /// malformed message, and the sink's error when the write fails. Both are
    /// logged here; callers only need to drop the message.
    #[tracing::instrument(skip(self, payload))]
    pub async fn handle(
        &self,
        device_id: &str,
        payload: &Map<String, Value>,
    ) -> Result<Handled, CropCloudError> {
        let result = self.dispatch(device_id, payload).await;
        if let Err(err) = &result {
            tracing::error!(error = ?err, "dropped device message");
        }
        result
    }

    async fn dispatch(
        &self,
        device_id: &str,
        payload: &Map<String, Value>,
    ) -> Result<Handled, CropCloudError> {
        let device: DeviceKey = device_id.parse()?;
        let message = DeviceMessage::parse(payload)?;
        tracing::debug!(kind = %message.kind(), "relaying device message");

        match message {
            DeviceMessage::EnvVar(report) => {
                self.write_report(&device, &report, ENV_VARS_MEASUREMENT)
                    .await
            }
            DeviceMessage::CommandReply(report) => {
                let measurement = report.var.clone();
                self.write_report(&device, &report, &measurement).await
            }
            DeviceMessage::ImageUpload(image) => {
                let point = image.to_point(&device)?;
                self.sink.write_points(vec![point]).await?;
                Ok(Handled::Written { points: 1 })
            }
            DeviceMessage::Image(_) => {
                tracing::debug!("ignoring deprecated chunked image");
                Ok(Handled::Ignored)
            }
            DeviceMessage::RecipeEvent(action) => Ok(self.apply_recipe_event(&device, action).await),
        }
    }

    async fn write_report(
        &self,
        device: &DeviceKey,
        report: &VariableReport,
        measurement: &str,
    ) -> Result<Handled, CropCloudError> {
        let now = self.clock.now().trunc_subsecs(0);
        let point = report.to_point(measurement, device, now)?;
        if point.fields.is_empty() {
            let reason = format!("no value for `{}`", report.var);
            return Err(ValidationError::InvalidValues(reason).into());
        }
        self.sink.write_points(vec![point]).await?;
        if self.mirror_device_data {
            self.mirror(device, report, now).await;
        }
        Ok(Handled::Written { points: 1 })
    }

    async fn mirror(&self, device: &DeviceKey, report: &VariableReport, at: Timestamp) {
        let Ok(sensor) = report.sensor_value() else {
            return;
        };
        let record = json!({
            "name": sensor.name,
            "value": sensor.value,
            "timestamp": format_timestamp(at),
        });
        if !self
            .data
            .append(kind::DEVICE_DATA, &report.var, device, record, at)
            .await
        {
            tracing::warn!(var = %report.var, "failed to mirror reading");
        }
    }

    async fn apply_recipe_event(&self, device: &DeviceKey, action: RecipeAction) -> Handled {
        match action {
            RecipeAction::Start { name } => Handled::Run {
                action: "start",
                applied: self.runs.start(device.as_str(), &name).await,
            },
            RecipeAction::Stop => Handled::Run {
                action: "stop",
                applied: self.runs.stop(device.as_str()).await,
            },
            RecipeAction::End => Handled::Run {
                action: "end",
                applied: self.runs.stop(device.as_str()).await,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ManualClock;
    use crate::testing::{InMemoryStore, RecordingSink};
    use cropcloud_domain::shard::property;
    use cropcloud_domain::time::parse_timestamp;
    use cropcloud_domain::timeseries::FieldValue;

    type Relay = MessageRelay<RecordingSink, InMemoryStore, ManualClock>;

    fn setup() -> (RecordingSink, InMemoryStore, ManualClock, Relay) {
        let sink = RecordingSink::default();
        let store = InMemoryStore::default();
        let clock = ManualClock::new(parse_timestamp("2024-01-01T00:00:00Z").unwrap());
        let relay = MessageRelay::new(sink.clone(), store.clone(), clock.clone());
        (sink, store, clock, relay)
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn should_write_env_var_point() {
        let (sink, _, _, relay) = setup();
        let message = payload(json!({
            "messageType": "EnvVar",
            "var": "air_temperature_celsius",
            "values": "{'values':[{'name':'SHT25-Top','type':'float','value':21.5}]}"
        }));

        let handled = relay.handle("EDU-1", &message).await.unwrap();
        assert_eq!(handled, Handled::Written { points: 1 });

        let points = sink.points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].measurement, "env_vars");
        assert_eq!(points[0].tags["device_id"], "EDU-1");
        assert_eq!(points[0].tags["sensor"], "SHT25-Top");
        assert_eq!(points[0].tags["isSpectrum"], "false");
        assert_eq!(points[0].fields["air_temperature_celsius"], FieldValue::Float(21.5));
    }

    #[tokio::test]
    async fn should_use_variable_name_as_measurement_for_command_replies() {
        let (sink, _, _, relay) = setup();
        let message = payload(json!({
            "messageType": "CommandReply",
            "var": "boot",
            "values": "{'values':[{'name':'boot','value':'ok'}]}"
        }));
        relay.handle("EDU-1", &message).await.unwrap();
        assert_eq!(sink.points()[0].measurement, "boot");
    }

    #[tokio::test]
    async fn should_flatten_spectrum_report() {
        let (sink, _, _, relay) = setup();
        let message = payload(json!({
            "messageType": "EnvVar",
            "var": "light_spectrum_nm_percent",
            "values": "{'values':[{'name':'LEDPanel-Top','value':{'400-449': 10.0, '450-499': 90.0}}]}"
        }));
        relay.handle("EDU-1", &message).await.unwrap();

        let point = &sink.points()[0];
        assert_eq!(point.tags["isSpectrum"], "true");
        assert_eq!(point.fields["band_400-449"], FieldValue::Float(10.0));
        assert_eq!(point.fields.len(), 2);
    }

    #[tokio::test]
    async fn should_time_uploaded_image_at_capture() {
        let (sink, _, _, relay) = setup();
        let message = payload(json!({
            "messageType": "ImageUpload",
            "varName": "Camera",
            "fileName": "EDU-6B1261EF-b8-27-eb-7f-f2-73_2020-06-05_T19-42-52Z_Camera-Top.png"
        }));
        relay.handle("EDU-1", &message).await.unwrap();

        let point = &sink.points()[0];
        assert_eq!(point.measurement, "images");
        assert_eq!(point.time, parse_timestamp("2020-06-05T19:42:52Z").unwrap());
        assert_eq!(point.tags["sensor"], "Camera-Top");
    }

    #[tokio::test]
    async fn should_start_and_stop_runs_from_recipe_events() {
        let (sink, store, clock, relay) = setup();
        let start = payload(json!({"messageType": "RecipeEvent", "action": "start", "name": "Demo"}));
        assert_eq!(
            relay.handle("EDU-1", &start).await.unwrap(),
            Handled::Run { action: "start", applied: true }
        );
        clock.advance_hours(1);
        let end = payload(json!({"messageType": "RecipeEvent", "action": "end"}));
        relay.handle("EDU-1", &end).await.unwrap();

        let runs = RunsLedger::new(store, clock).get_all("EDU-1").await;
        assert_eq!(runs.len(), 1);
        assert!(!runs[0].is_open());
        assert!(sink.points().is_empty());
    }

    #[tokio::test]
    async fn should_drop_invalid_messages() {
        let (sink, _, _, relay) = setup();
        let missing_values = payload(json!({"messageType": "EnvVar", "var": "x"}));
        assert!(matches!(
            relay.handle("EDU-1", &missing_values).await,
            Err(CropCloudError::Validation(ValidationError::MissingField("values")))
        ));
        let unknown = payload(json!({"messageType": "Telemetry"}));
        assert!(relay.handle("EDU-1", &unknown).await.is_err());
        let valid = payload(json!({"messageType": "Image", "fileName": "a_b_c_d.png"}));
        assert!(relay.handle("None", &valid).await.is_err());
        assert!(sink.points().is_empty());
    }

    #[tokio::test]
    async fn should_ignore_deprecated_chunked_images() {
        let (sink, _, _, relay) = setup();
        let message = payload(json!({"messageType": "Image", "fileName": "chunk"}));
        assert_eq!(relay.handle("EDU-1", &message).await.unwrap(), Handled::Ignored);
        assert!(sink.points().is_empty());
    }

    #[tokio::test]
    async fn should_mirror_readings_into_device_data_when_enabled() {
        let (_, store, _, relay) = setup();
        let relay = relay.with_device_data_mirror(true);
        let message = payload(json!({
            "messageType": "EnvVar",
            "var": "air_carbon_dioxide_ppm",
            "values": {"values": [{"name": "MHZ16", "value": "512.345"}]}
        }));
        relay.handle("EDU-1", &message).await.unwrap();

        let accessor = DeviceDataAccessor::new(store);
        assert_eq!(accessor.current_co2_value("EDU-1").await, "512.35");
        assert_eq!(accessor.device_data(property::CO2, "EDU-1", None).await.len(), 1);
    }
}
