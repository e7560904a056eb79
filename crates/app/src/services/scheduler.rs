//! Scheduler: arms reminder commands per device and fires the due ones.

use cropcloud_domain::id::{DeviceKey, NotificationId};
use cropcloud_domain::notification::TYPE_DONE;
use cropcloud_domain::schedule::{Command, CommandInfo, ScheduleEntry};
use cropcloud_domain::shard::{kind, property, shard_name};

use crate::ports::{Clock, EntityStore, Key};

use super::device_data::DeviceDataAccessor;
use super::device_key;
use super::notifications::NotificationLedger;

/// Per-device reminder schedule.
///
/// Entries are keyed by command name inside the device's `schedule` shard,
/// so arming a command twice replaces the first entry in one write.
pub struct Scheduler<S, C> {
    data: DeviceDataAccessor<S>,
    notifications: NotificationLedger<S, C>,
    clock: C,
}

fn parse_command(name: &str) -> Option<Command> {
    match name.parse() {
        Ok(command) => Some(command),
        Err(err) => {
            tracing::error!(error = %err, "rejected schedule command");
            None
        }
    }
}

impl<S, C> Scheduler<S, C>
where
    S: EntityStore + Clone,
    C: Clock + Clone,
{
    pub fn new(store: S, clock: C) -> Self {
        Self {
            data: DeviceDataAccessor::new(store.clone()),
            notifications: NotificationLedger::new(store, clock.clone()),
            clock,
        }
    }

    /// The command table.
    #[must_use]
    pub fn commands(&self) -> Vec<CommandInfo> {
        Command::ALL.into_iter().map(Command::info).collect()
    }

    async fn save(&self, device: &DeviceKey, entry: &ScheduleEntry) -> bool {
        let payload = match serde_json::to_value(entry) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode schedule entry");
                return false;
            }
        };
        self.data
            .upsert(
                kind::DEVICE_DATA,
                property::SCHEDULE,
                device,
                entry.command.name(),
                payload,
                entry.run_at,
            )
            .await
    }

    /// Arm `command`, replacing any entry already armed for it.
    #[tracing::instrument(skip(self))]
    pub async fn add(&self, device: &str, command: &str, repeat_hours: Option<u32>) -> bool {
        let Some(device) = device_key(device) else {
            return false;
        };
        let Some(command) = parse_command(command) else {
            return false;
        };
        let entry = match ScheduleEntry::arm(command, repeat_hours, self.clock.now()) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "refusing to schedule command");
                return false;
            }
        };
        tracing::info!(run_at = %entry.run_at, "scheduled command");
        self.save(&device, &entry).await
    }

    /// Armed entries, soonest deadline first.
    pub async fn schedule(&self, device: &str) -> Vec<ScheduleEntry> {
        let Some(device) = device_key(device) else {
            return Vec::new();
        };
        let mut entries: Vec<ScheduleEntry> = self
            .data
            .read(kind::DEVICE_DATA, property::SCHEDULE, &device, None)
            .await
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::error!(error = %err, "skipping malformed schedule entry");
                    None
                }
            })
            .collect();
        entries.sort_by_key(|entry| entry.run_at);
        entries
    }

    /// Fire every due command: notify, then retire one-shots and re-arm the
    /// rest one interval after their previous deadline.
    ///
    /// Returns how many commands fired.
    #[tracing::instrument(skip(self))]
    pub async fn check(&self, device: &str) -> usize {
        let Some(key) = device_key(device) else {
            return 0;
        };
        let now = self.clock.now();
        let mut fired = 0;
        for mut entry in self.schedule(device).await {
            if !entry.is_due(now) {
                continue;
            }
            if self
                .notifications
                .add(device, &entry.message, TYPE_DONE, entry.url.clone())
                .await
                .is_none()
            {
                tracing::warn!(command = %entry.command, "failed to notify, will retry");
                continue;
            }
            fired += 1;
            if entry.is_one_shot() {
                self.delete(&key, entry.command).await;
            } else if let Err(err) = entry.rearm() {
                tracing::error!(
                    error = %err,
                    command = %entry.command,
                    "dropping unschedulable command"
                );
                self.delete(&key, entry.command).await;
            } else {
                self.save(&key, &entry).await;
            }
            tracing::info!(command = %entry.command, count = entry.count, "fired command");
        }
        fired
    }

    async fn delete(&self, device: &DeviceKey, command: Command) -> bool {
        let shard = shard_name(kind::DEVICE_DATA, property::SCHEDULE, device);
        self.data.remove(&Key::name(shard, command.name())).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, device: &str, command: &str) -> bool {
        let Some(device) = device_key(device) else {
            return false;
        };
        let Some(command) = parse_command(command) else {
            return false;
        };
        self.delete(&device, command).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_all(&self, device: &str) -> bool {
        let Some(key) = device_key(device) else {
            return false;
        };
        let entities = match self
            .data
            .entities(kind::DEVICE_DATA, property::SCHEDULE, &key, None)
            .await
        {
            Ok(entities) => entities,
            Err(err) => {
                tracing::error!(error = %err, "failed to list schedule");
                return false;
            }
        };
        let mut all_removed = true;
        for entity in entities {
            all_removed &= self.data.remove(&entity.key).await;
        }
        all_removed
    }

    /// Emit `command`'s notification now without touching the schedule.
    pub async fn create_notification(&self, device: &str, command: &str) -> Option<NotificationId> {
        let command = parse_command(command)?;
        self.notifications
            .add(
                device,
                command.message(),
                TYPE_DONE,
                command.url().map(str::to_string),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ManualClock;
    use crate::testing::InMemoryStore;
    use cropcloud_domain::time::parse_timestamp;

    type Fixture = (
        ManualClock,
        Scheduler<InMemoryStore, ManualClock>,
        NotificationLedger<InMemoryStore, ManualClock>,
    );

    fn setup() -> Fixture {
        let store = InMemoryStore::default();
        let clock = ManualClock::new(parse_timestamp("2024-01-01T00:00:00Z").unwrap());
        let scheduler = Scheduler::new(store.clone(), clock.clone());
        let notifications = NotificationLedger::new(store, clock.clone());
        (clock, scheduler, notifications)
    }

    #[test]
    fn should_list_the_four_commands() {
        let (_, scheduler, _) = setup();
        let names: Vec<&str> = scheduler.commands().iter().map(|c| c.command.name()).collect();
        assert_eq!(
            names,
            vec!["check_fluid", "take_measurements", "harvest_plant", "prune_plant"]
        );
    }

    #[tokio::test]
    async fn should_fire_once_and_rearm_from_previous_deadline() {
        let (clock, scheduler, notifications) = setup();
        assert!(scheduler.add("dev-1", "check_fluid", None).await);
        let armed = scheduler.schedule("dev-1").await;
        assert_eq!(armed[0].run_at, parse_timestamp("2024-01-03T00:00:00Z").unwrap());

        clock.advance_hours(49);
        assert_eq!(scheduler.check("dev-1").await, 1);

        let queued = notifications.get_unacknowledged("dev-1").await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].message, "Check your fluid level");

        let entry = &scheduler.schedule("dev-1").await[0];
        assert_eq!(entry.count, 1);
        assert_eq!(entry.run_at, parse_timestamp("2024-01-05T00:00:00Z").unwrap());
    }

    #[tokio::test]
    async fn should_not_fire_before_deadline() {
        let (clock, scheduler, notifications) = setup();
        scheduler.add("dev-1", "check_fluid", None).await;
        clock.advance_hours(47);
        assert_eq!(scheduler.check("dev-1").await, 0);
        assert!(notifications.get_unacknowledged("dev-1").await.is_empty());
    }

    #[tokio::test]
    async fn should_retire_one_shot_after_firing() {
        let (_, scheduler, notifications) = setup();
        scheduler.add("dev-1", "harvest_plant", None).await;

        assert_eq!(scheduler.check("dev-1").await, 1);
        assert_eq!(scheduler.check("dev-1").await, 0);
        assert!(scheduler.schedule("dev-1").await.is_empty());
        assert_eq!(notifications.get_unacknowledged("dev-1").await.len(), 1);
    }

    #[tokio::test]
    async fn should_replace_existing_entry_for_command() {
        let (_, scheduler, _) = setup();
        scheduler.add("dev-1", "check_fluid", None).await;
        scheduler.add("dev-1", "check_fluid", Some(1)).await;

        let entries = scheduler.schedule("dev-1").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].repeat_hours, 1);
    }

    #[tokio::test]
    async fn should_switch_measurements_to_daily_after_first_firing() {
        let (clock, scheduler, _) = setup();
        scheduler.add("dev-1", "take_measurements", None).await;
        clock.advance_hours(168);
        assert_eq!(scheduler.check("dev-1").await, 1);

        let entry = &scheduler.schedule("dev-1").await[0];
        assert_eq!(entry.repeat_hours, 24);
        assert_eq!(entry.run_at, parse_timestamp("2024-01-09T00:00:00Z").unwrap());
    }

    #[tokio::test]
    async fn should_refuse_oversized_repeat_interval() {
        let (_, scheduler, _) = setup();
        assert!(!scheduler.add("dev-1", "check_fluid", Some(u32::MAX)).await);
        assert!(scheduler.schedule("dev-1").await.is_empty());
    }

    #[tokio::test]
    async fn should_reject_unknown_command() {
        let (_, scheduler, _) = setup();
        assert!(!scheduler.add("dev-1", "water_plant", None).await);
        assert!(scheduler.schedule("dev-1").await.is_empty());
        assert_eq!(scheduler.create_notification("dev-1", "water_plant").await, None);
    }

    #[tokio::test]
    async fn should_remove_one_or_all_commands() {
        let (_, scheduler, _) = setup();
        scheduler.add("dev-1", "check_fluid", None).await;
        scheduler.add("dev-1", "prune_plant", None).await;
        scheduler.add("dev-1", "harvest_plant", None).await;

        assert!(scheduler.remove("dev-1", "prune_plant").await);
        assert_eq!(scheduler.schedule("dev-1").await.len(), 2);
        assert!(scheduler.remove_all("dev-1").await);
        assert!(scheduler.schedule("dev-1").await.is_empty());
    }

    #[tokio::test]
    async fn should_notify_immediately_with_command_url() {
        let (_, scheduler, notifications) = setup();
        assert!(scheduler.create_notification("dev-1", "prune_plant").await.is_some());

        let queued = notifications.get_unacknowledged("dev-1").await;
        assert_eq!(queued[0].message, "Time to prune your plant");
        assert!(queued[0].url.is_some());
        assert!(scheduler.schedule("dev-1").await.is_empty());
    }
}
