//! Recipe runs: start/stop intervals during which a recipe executed.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// One recipe run. `end` is `None` while the run is in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    #[serde(with = "crate::time::wire")]
    pub start: Timestamp,
    #[serde(with = "crate::time::wire::option", default)]
    pub end: Option<Timestamp>,
    pub recipe_name: String,
}

impl Run {
    /// Open a new run of `recipe_name` at `at`.
    #[must_use]
    pub fn begin(recipe_name: impl Into<String>, at: Timestamp) -> Self {
        Self {
            start: at,
            end: None,
            recipe_name: recipe_name.into(),
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Close the run at `at`. Returns `false` if it was already closed.
    ///
    /// The end is clamped to the start so `end >= start` always holds.
    pub fn finish(&mut self, at: Timestamp) -> bool {
        if self.end.is_some() {
            return false;
        }
        self.end = Some(at.max(self.start));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_timestamp;
    use serde_json::json;

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn should_serialize_open_run_with_null_end() {
        let run = Run::begin("Demo Rainbow", ts("2019-08-09T16:52:46Z"));
        assert_eq!(
            serde_json::to_value(&run).unwrap(),
            json!({"start": "2019-08-09T16:52:46Z", "end": null, "recipe_name": "Demo Rainbow"})
        );
    }

    #[test]
    fn should_finish_open_run_once() {
        let mut run = Run::begin("Demo", ts("2024-01-01T00:00:00Z"));
        assert!(run.finish(ts("2024-01-02T00:00:00Z")));
        assert!(!run.finish(ts("2024-01-03T00:00:00Z")));
        assert_eq!(run.end, Some(ts("2024-01-02T00:00:00Z")));
    }

    #[test]
    fn should_clamp_end_to_start() {
        let mut run = Run::begin("Demo", ts("2024-01-02T00:00:00Z"));
        run.finish(ts("2024-01-01T00:00:00Z"));
        assert_eq!(run.end, Some(run.start));
    }

    #[test]
    fn should_parse_missing_end_as_open() {
        let run: Run =
            serde_json::from_value(json!({"start": "2024-01-01T00:00:00Z", "recipe_name": "x"}))
                .unwrap();
        assert!(run.is_open());
    }
}
