//! Broker connection loop.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::Instrument;

use cropcloud_app::ports::{Clock, EntityStore, TimeSeriesSink};
use cropcloud_app::services::MessageRelay;

use crate::config::MqttConfig;
use crate::error::MqttError;
use crate::topic::device_id_from_topic;

/// Subscribe to the device events topic and relay every message until
/// `shutdown` flips to `true`.
///
/// Broker failures are retried after [`MqttConfig::retry_delay`], up to
/// `max_retries` consecutive attempts.
#[tracing::instrument(
    name = "mqtt_subscriber",
    skip_all,
    fields(broker = %config.broker_host, topic = %config.topic)
)]
pub async fn run_subscriber<T, S, C>(
    config: MqttConfig,
    relay: Arc<MessageRelay<T, S, C>>,
    mut shutdown: watch::Receiver<bool>,
) where
    T: TimeSeriesSink,
    S: EntityStore,
    C: Clock + Clone,
{
    tracing::info!("starting MQTT subscriber");
    let mut failures = 0_u32;

    loop {
        if *shutdown.borrow() {
            break;
        }
        match run_connection(&config, &relay, &mut shutdown).await {
            Ok(()) => break,
            Err(err) => {
                failures += 1;
                tracing::error!(error = %err, attempt = failures, "MQTT connection error");
                if config.max_retries > 0 && failures >= config.max_retries {
                    tracing::error!(max_retries = config.max_retries, "giving up on MQTT broker");
                    break;
                }
                tokio::select! {
                    _ = shutdown.changed() => break,
                    () = tokio::time::sleep(config.retry_delay()) => {}
                }
            }
        }
    }

    tracing::info!("MQTT subscriber stopped");
}

async fn run_connection<T, S, C>(
    config: &MqttConfig,
    relay: &MessageRelay<T, S, C>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), MqttError>
where
    T: TimeSeriesSink,
    S: EntityStore,
    C: Clock + Clone,
{
    let mut options = MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
    options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
    options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(options, 100);
    client.subscribe(&config.topic, QoS::AtLeastOnce).await?;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::debug!("shutdown signal received");
                if let Err(err) = client.disconnect().await {
                    tracing::warn!(%err, "failed to disconnect from MQTT broker");
                }
                return Ok(());
            }
            event = eventloop.poll() => match event? {
                Event::Incoming(Packet::Publish(publish)) => {
                    let span = tracing::info_span!(
                        parent: tracing::Span::none(),
                        "mqtt_message",
                        topic = %publish.topic,
                        payload_size = publish.payload.len(),
                    );
                    handle_publish(relay, &publish.topic, &publish.payload)
                        .instrument(span)
                        .await;
                }
                Event::Incoming(Packet::ConnAck(_)) => {
                    tracing::info!("connected to MQTT broker");
                }
                Event::Incoming(Packet::SubAck(_)) => {
                    tracing::debug!("subscription acknowledged");
                }
                _ => {}
            },
        }
    }
}

/// Device id and JSON object body of one published message.
fn decode<'t>(topic: &'t str, payload: &[u8]) -> Result<(&'t str, Map<String, Value>), MqttError> {
    let device_id = device_id_from_topic(topic)?;
    let body = serde_json::from_slice(payload).map_err(MqttError::PayloadParse)?;
    Ok((device_id, body))
}

async fn handle_publish<T, S, C>(relay: &MessageRelay<T, S, C>, topic: &str, payload: &[u8])
where
    T: TimeSeriesSink,
    S: EntityStore,
    C: Clock + Clone,
{
    let (device_id, body) = match decode(topic, payload) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::warn!(%err, "skipping MQTT message");
            return;
        }
    };
    // The relay logs its own failures.
    if let Ok(handled) = relay.handle(device_id, &body).await {
        tracing::debug!(?handled, "relayed MQTT message");
    }
}
