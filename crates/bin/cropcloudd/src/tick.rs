//! Periodic scheduler pass over every device in the directory.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use cropcloud_app::ports::{Clock, EntityStore};
use cropcloud_app::services::{DeviceDirectory, Scheduler};

/// Fire due commands for every known device each `period` until `shutdown`
/// flips.
pub async fn run<S, C>(
    directory: Arc<DeviceDirectory<S, C>>,
    scheduler: Arc<Scheduler<S, C>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    S: EntityStore + Clone,
    C: Clock + Clone,
{
    tracing::info!(period_secs = period.as_secs(), "starting scheduler tick");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = interval.tick() => {
                let fired = check_all(&directory, &scheduler).await;
                if fired > 0 {
                    tracing::info!(fired, "fired scheduled commands");
                }
            }
        }
    }

    tracing::info!("scheduler tick stopped");
}

/// One pass; returns how many commands fired across all devices.
pub async fn check_all<S, C>(directory: &DeviceDirectory<S, C>, scheduler: &Scheduler<S, C>) -> usize
where
    S: EntityStore + Clone,
    C: Clock + Clone,
{
    let mut fired = 0;
    for device in directory.basic_devices().await {
        fired += scheduler.check(&device.device_uuid).await;
    }
    fired
}
