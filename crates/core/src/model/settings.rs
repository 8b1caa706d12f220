use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("warning thresholds must be > 0 seconds")]
    ZeroWarningThreshold,

    #[error("too many warning thresholds: {0}")]
    TooManyWarningThresholds(usize),
}

const MAX_WARNING_THRESHOLDS: usize = 8;

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Which countdown limits how long a student may spend on a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerScope {
    /// Each question with a time allotment gets its own countdown.
    PerQuestion,
    /// Only the attempt-wide countdown applies.
    #[default]
    QuizWide,
}

/// Configuration of a quiz session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    timer_scope: TimerScope,
    warning_thresholds_secs: Vec<u32>,
    persist_responses: bool,
}

impl Default for SessionSettings {
    /// Quiz-wide timer, warnings at five minutes and one minute, no incremental persistence.
    fn default() -> Self {
        Self {
            timer_scope: TimerScope::QuizWide,
            warning_thresholds_secs: vec![300, 60],
            persist_responses: false,
        }
    }
}

impl SessionSettings {
    /// Creates custom session settings.
    ///
    /// Thresholds are deduplicated and kept in descending order.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a threshold is zero or too many are given.
    pub fn new(
        timer_scope: TimerScope,
        warning_thresholds_secs: impl IntoIterator<Item = u32>,
        persist_responses: bool,
    ) -> Result<Self, SettingsError> {
        let mut thresholds: Vec<u32> = warning_thresholds_secs.into_iter().collect();
        if thresholds.contains(&0) {
            return Err(SettingsError::ZeroWarningThreshold);
        }
        thresholds.sort_unstable_by(|a, b| b.cmp(a));
        thresholds.dedup();
        if thresholds.len() > MAX_WARNING_THRESHOLDS {
            return Err(SettingsError::TooManyWarningThresholds(thresholds.len()));
        }

        Ok(Self {
            timer_scope,
            warning_thresholds_secs: thresholds,
            persist_responses,
        })
    }

    /// Default settings with per-question countdowns enabled.
    #[must_use]
    pub fn per_question() -> Self {
        Self {
            timer_scope: TimerScope::PerQuestion,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_persist_responses(mut self, persist: bool) -> Self {
        self.persist_responses = persist;
        self
    }

    #[must_use]
    pub fn timer_scope(&self) -> TimerScope {
        self.timer_scope
    }

    /// Thresholds in descending order.
    #[must_use]
    pub fn warning_thresholds_secs(&self) -> &[u32] {
        &self.warning_thresholds_secs
    }

    /// Whether each answer is sent to the backend as soon as it is recorded.
    #[must_use]
    pub fn persist_responses(&self) -> bool {
        self.persist_responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_warn_at_five_and_one_minute() {
        let settings = SessionSettings::default();
        assert_eq!(settings.timer_scope(), TimerScope::QuizWide);
        assert_eq!(settings.warning_thresholds_secs(), &[300, 60]);
        assert!(!settings.persist_responses());
    }

    #[test]
    fn thresholds_are_sorted_and_deduplicated() {
        let settings = SessionSettings::new(TimerScope::PerQuestion, [30, 60, 30], true).unwrap();
        assert_eq!(settings.warning_thresholds_secs(), &[60, 30]);
        assert!(settings.persist_responses());
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let err = SessionSettings::new(TimerScope::QuizWide, [60, 0], false).unwrap_err();
        assert_eq!(err, SettingsError::ZeroWarningThreshold);
    }

    #[test]
    fn timer_scope_uses_kebab_case() {
        let json = serde_json::to_string(&TimerScope::PerQuestion).unwrap();
        assert_eq!(json, "\"per-question\"");
    }
}
