//! Scheduled reminder commands.
//!
//! Each device holds at most one entry per [`Command`]. An entry is armed
//! with a `run_at` deadline; once due it fires a notification and is either
//! deleted (`repeat_hours == 0`) or re-armed one interval later.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, SubsecRound};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::Timestamp;

/// The fixed set of schedulable commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    CheckFluid,
    TakeMeasurements,
    HarvestPlant,
    PrunePlant,
}

impl Command {
    pub const ALL: [Self; 4] = [
        Self::CheckFluid,
        Self::TakeMeasurements,
        Self::HarvestPlant,
        Self::PrunePlant,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CheckFluid => "check_fluid",
            Self::TakeMeasurements => "take_measurements",
            Self::HarvestPlant => "harvest_plant",
            Self::PrunePlant => "prune_plant",
        }
    }

    /// Text of the notification the command emits.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::CheckFluid => "Check your fluid level",
            Self::TakeMeasurements => "Record your plant measurements",
            Self::HarvestPlant => "Time to harvest your plant",
            Self::PrunePlant => "Time to prune your plant",
        }
    }

    #[must_use]
    pub fn url(self) -> Option<&'static str> {
        match self {
            Self::PrunePlant => Some("https://www.youtube.com/watch?v=9noUUTuPh3E"),
            _ => None,
        }
    }

    /// Hours until the first firing when no override is given.
    ///
    /// Measurements are first requested a week out, then daily.
    #[must_use]
    pub fn first_repeat_hours(self) -> u32 {
        match self {
            Self::TakeMeasurements => 168,
            other => other.steady_repeat_hours(),
        }
    }

    /// Hours between firings once the command has fired at least once.
    #[must_use]
    pub fn steady_repeat_hours(self) -> u32 {
        match self {
            Self::CheckFluid | Self::PrunePlant => 48,
            Self::TakeMeasurements => 24,
            Self::HarvestPlant => 0,
        }
    }

    /// Static description for listing the command table.
    #[must_use]
    pub fn info(self) -> CommandInfo {
        CommandInfo {
            command: self,
            message: self.message(),
            first_repeat_hours: self.first_repeat_hours(),
            default_repeat_hours: self.steady_repeat_hours(),
            url: self.url(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|command| command.name() == s)
            .ok_or_else(|| ValidationError::UnknownCommand(s.to_string()))
    }
}

/// One row of the command table.
#[derive(Debug, Clone, Serialize)]
pub struct CommandInfo {
    pub command: Command,
    pub message: &'static str,
    pub first_repeat_hours: u32,
    pub default_repeat_hours: u32,
    #[serde(rename = "URL")]
    pub url: Option<&'static str>,
}

/// Longest accepted interval between firings: ten years.
pub const MAX_REPEAT_HOURS: u32 = 24 * 365 * 10;

/// A device's armed schedule entry for one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub command: Command,
    pub message: String,
    #[serde(with = "crate::time::wire")]
    pub run_at: Timestamp,
    #[serde(alias = "repeat")]
    pub repeat_hours: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
}

impl ScheduleEntry {
    /// Reject intervals longer than [`MAX_REPEAT_HOURS`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RepeatOutOfRange`] for such intervals.
    pub fn check_repeat_hours(hours: u32) -> Result<u32, ValidationError> {
        if hours > MAX_REPEAT_HOURS {
            return Err(ValidationError::RepeatOutOfRange(hours));
        }
        Ok(hours)
    }

    /// Arm `command` to first fire `repeat_hours` (or its table default)
    /// after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RepeatOutOfRange`] when the interval is too
    /// long or the deadline falls outside the representable time range.
    pub fn arm(
        command: Command,
        repeat_hours: Option<u32>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let repeat =
            Self::check_repeat_hours(repeat_hours.unwrap_or_else(|| command.first_repeat_hours()))?;
        Ok(Self {
            command,
            message: command.message().to_string(),
            run_at: after_hours(now.trunc_subsecs(0), repeat)?,
            repeat_hours: repeat,
            count: 0,
            url: command.url().map(str::to_string),
        })
    }

    /// Whether the deadline has passed at `now`.
    ///
    /// Both sides are whole seconds once stored, so this agrees with
    /// comparing the fixed-width wire strings.
    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.run_at <= now
    }

    #[must_use]
    pub fn is_one_shot(&self) -> bool {
        self.repeat_hours == 0
    }

    /// Move the deadline one interval forward and bump the fire count.
    ///
    /// Measurement reminders switch to their steady interval after firing.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RepeatOutOfRange`] when the next deadline
    /// cannot be represented; the entry is left unchanged.
    pub fn rearm(&mut self) -> Result<(), ValidationError> {
        let repeat = if self.command == Command::TakeMeasurements {
            self.command.steady_repeat_hours()
        } else {
            self.repeat_hours
        };
        self.run_at = after_hours(self.run_at, repeat)?;
        self.repeat_hours = repeat;
        self.count = self.count.saturating_add(1);
        Ok(())
    }
}

fn after_hours(start: Timestamp, hours: u32) -> Result<Timestamp, ValidationError> {
    start
        .checked_add_signed(Duration::hours(i64::from(hours)))
        .ok_or(ValidationError::RepeatOutOfRange(hours))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_timestamp;
    use serde_json::json;

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    fn armed(command: Command, repeat_hours: Option<u32>) -> ScheduleEntry {
        ScheduleEntry::arm(command, repeat_hours, ts("2024-01-01T00:00:00Z")).unwrap()
    }

    #[test]
    fn should_parse_every_command_name() {
        for command in Command::ALL {
            assert_eq!(command.name().parse::<Command>().unwrap(), command);
        }
    }

    #[test]
    fn should_reject_unknown_command() {
        assert_eq!(
            "water_plant".parse::<Command>(),
            Err(ValidationError::UnknownCommand("water_plant".to_string()))
        );
    }

    #[test]
    fn should_arm_with_table_default() {
        let entry = armed(Command::CheckFluid, None);
        assert_eq!(entry.run_at, ts("2024-01-03T00:00:00Z"));
        assert_eq!(entry.repeat_hours, 48);
        assert_eq!(entry.count, 0);
        assert_eq!(entry.message, "Check your fluid level");
    }

    #[test]
    fn should_arm_with_override() {
        let entry = armed(Command::CheckFluid, Some(1));
        assert_eq!(entry.run_at, ts("2024-01-01T01:00:00Z"));
        assert_eq!(entry.repeat_hours, 1);
    }

    #[test]
    fn should_first_measure_after_a_week_then_daily() {
        let mut entry = armed(Command::TakeMeasurements, None);
        assert_eq!(entry.run_at, ts("2024-01-08T00:00:00Z"));

        entry.rearm().unwrap();
        assert_eq!(entry.run_at, ts("2024-01-09T00:00:00Z"));
        assert_eq!(entry.repeat_hours, 24);
        assert_eq!(entry.count, 1);
    }

    #[test]
    fn should_rearm_from_previous_deadline() {
        let mut entry = armed(Command::PrunePlant, None);
        entry.rearm().unwrap();
        assert_eq!(entry.run_at, ts("2024-01-05T00:00:00Z"));
        assert_eq!(entry.count, 1);
    }

    #[test]
    fn should_reject_interval_beyond_ten_years() {
        let now = ts("2024-01-01T00:00:00Z");
        assert_eq!(
            ScheduleEntry::arm(Command::CheckFluid, Some(u32::MAX), now),
            Err(ValidationError::RepeatOutOfRange(u32::MAX))
        );
        assert_eq!(
            ScheduleEntry::arm(Command::CheckFluid, Some(MAX_REPEAT_HOURS + 1), now),
            Err(ValidationError::RepeatOutOfRange(MAX_REPEAT_HOURS + 1))
        );
        let longest =
            ScheduleEntry::arm(Command::CheckFluid, Some(MAX_REPEAT_HOURS), now).unwrap();
        assert_eq!(longest.repeat_hours, MAX_REPEAT_HOURS);
    }

    #[test]
    fn should_keep_entry_when_next_deadline_is_unrepresentable() {
        let mut entry = ScheduleEntry {
            command: Command::CheckFluid,
            message: "Check your fluid level".to_string(),
            run_at: Timestamp::MAX_UTC,
            repeat_hours: 48,
            count: u32::MAX,
            url: None,
        };
        let before = entry.clone();
        assert_eq!(entry.rearm(), Err(ValidationError::RepeatOutOfRange(48)));
        assert_eq!(entry, before);
    }

    #[test]
    fn should_treat_harvest_as_one_shot() {
        let entry = armed(Command::HarvestPlant, None);
        assert!(entry.is_one_shot());
        assert!(entry.is_due(ts("2024-01-01T00:00:00Z")));
    }

    #[test]
    fn should_read_legacy_repeat_field() {
        let entry: ScheduleEntry = serde_json::from_value(json!({
            "command": "check_fluid",
            "message": "Check your fluid level",
            "run_at": "2024-01-01T00:00:00Z",
            "repeat": 48,
            "count": 3,
            "URL": null,
        }))
        .unwrap();
        assert_eq!(entry.repeat_hours, 48);
        assert_eq!(entry.count, 3);
    }
}
