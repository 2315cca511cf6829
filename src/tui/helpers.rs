use std::time::Instant;

use crate::protocol::DeviceNotice;

use super::types::{Alert, AlertLevel, UiEvent};
use super::CameraUI;

impl CameraUI {
    pub(crate) fn alert(&mut self, level: AlertLevel, text: impl Into<String>) {
        self.alert = Some(Alert::new(level, text, Instant::now()));
    }

    /// Drop the alert once it has been up long enough
    pub(crate) fn expire_alert(&mut self, now: Instant) {
        if self.alert.as_ref().is_some_and(|a| a.is_expired(now)) {
            self.alert = None;
        }
    }

    pub(crate) fn on_notice(&mut self, notice: DeviceNotice) {
        match notice {
            DeviceNotice::Welcome { message } => self.alert(AlertLevel::Info, message),
            DeviceNotice::Error { message } => {
                self.alert(AlertLevel::Error, format!("Device: {}", message))
            }
            DeviceNotice::Pong { timestamp } => self.alert(
                AlertLevel::Success,
                format!("Pong, device up {}", format_uptime(timestamp)),
            ),
        }
    }

    pub(crate) fn on_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Captured(result) => {
                self.capture_pending = false;
                match result {
                    Ok(path) => self.alert(AlertLevel::Success, format!("📸 Saved {}", path.display())),
                    Err(e) => self.alert(AlertLevel::Error, e),
                }
            }
            UiEvent::SettingsLoaded(result) => {
                self.settings_busy = false;
                match result {
                    Ok(report) => self.panel.merge(&report),
                    Err(e) => self.alert(AlertLevel::Error, format!("Settings load failed: {}", e)),
                }
            }
            UiEvent::SettingsApplied(result) => {
                self.settings_busy = false;
                match result {
                    Ok(message) if message.is_empty() => self.alert(AlertLevel::Success, "Settings applied"),
                    Ok(message) => self.alert(AlertLevel::Success, message),
                    Err(e) => self.alert(AlertLevel::Error, format!("Settings not applied: {}", e)),
                }
            }
        }
    }
}

/// Human-readable byte count: "512 B", "1.5 KB", "2.25 MB"
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0).round() as u64))
}

/// "1:23" under an hour, "2:45:03" past it
pub fn format_uptime(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}
