use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::protocol::SettingsReport;

/// How long an alert stays on the alert bar
pub const ALERT_TTL: Duration = Duration::from_secs(4);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug)]
pub struct Alert {
    pub level: AlertLevel,
    pub text: String,
    pub at: Instant,
}

impl Alert {
    pub fn new(level: AlertLevel, text: impl Into<String>, at: Instant) -> Self {
        Self {
            level,
            text: text.into(),
            at,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.at) >= ALERT_TTL
    }
}

/// Results of background requests, reported back to the UI loop
#[derive(Debug)]
pub enum UiEvent {
    Captured(Result<PathBuf, String>),
    SettingsLoaded(Result<SettingsReport, String>),
    SettingsApplied(Result<String, String>),
}
