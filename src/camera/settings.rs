//! Settings sync: device capture parameters, loaded and applied over HTTP.
//!
//! The panel's editing controls clamp to the device's accepted ranges; values
//! set directly (e.g. from the command line) are sent exactly as given.

use std::ops::RangeInclusive;

use tracing::{info, warn};

use crate::api::{ApiError, DeviceApi};
use crate::protocol::{CameraSettings, SettingsReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Quality,
    Brightness,
    Contrast,
    FrameSize,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Quality, Field::Brightness, Field::Contrast, Field::FrameSize];

    pub fn label(self) -> &'static str {
        match self {
            Field::Quality => "Quality",
            Field::Brightness => "Brightness",
            Field::Contrast => "Contrast",
            Field::FrameSize => "Frame size",
        }
    }

    /// Widget range (JPEG quality: lower is better)
    pub fn range(self) -> RangeInclusive<i32> {
        match self {
            Field::Quality => 0..=63,
            Field::Brightness | Field::Contrast => -2..=2,
            Field::FrameSize => 0..=13,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsPanel {
    values: CameraSettings,
    selected: usize,
    loaded: bool,
}

impl SettingsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> CameraSettings {
        self.values
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self, field: Field) -> i32 {
        match field {
            Field::Quality => self.values.quality,
            Field::Brightness => self.values.brightness,
            Field::Contrast => self.values.contrast,
            Field::FrameSize => self.values.framesize,
        }
    }

    /// Set a value as-is, no range check
    pub fn set(&mut self, field: Field, value: i32) {
        match field {
            Field::Quality => self.values.quality = value,
            Field::Brightness => self.values.brightness = value,
            Field::Contrast => self.values.contrast = value,
            Field::FrameSize => self.values.framesize = value,
        }
    }

    /// Widget-style nudge, clamped to the field's range
    pub fn adjust(&mut self, field: Field, delta: i32) {
        let range = field.range();
        let next = (self.get(field) + delta).clamp(*range.start(), *range.end());
        self.set(field, next);
    }

    /// Overwrite the fields the device reported; keep the rest
    pub fn merge(&mut self, report: &SettingsReport) {
        if let Some(v) = report.quality {
            self.values.quality = v;
        }
        if let Some(v) = report.brightness {
            self.values.brightness = v;
        }
        if let Some(v) = report.contrast {
            self.values.contrast = v;
        }
        if let Some(v) = report.framesize {
            self.values.framesize = v;
        }
        self.loaded = true;
    }

    pub fn selected(&self) -> Field {
        Field::ALL[self.selected]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % Field::ALL.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + Field::ALL.len() - 1) % Field::ALL.len();
    }

    /// Pull current values from the device. On failure the panel is untouched.
    pub async fn load(&mut self, api: &DeviceApi) -> Result<(), ApiError> {
        let report = load(api).await?;
        self.merge(&report);
        Ok(())
    }

    /// Push the panel's values to the device
    pub async fn apply(&self, api: &DeviceApi) -> Result<String, ApiError> {
        apply(api, self.values).await
    }
}

pub async fn load(api: &DeviceApi) -> Result<SettingsReport, ApiError> {
    match api.load_settings().await {
        Ok(report) => {
            info!(?report, "camera settings loaded");
            Ok(report)
        }
        Err(e) => {
            warn!(error = %e, "failed to load camera settings");
            Err(e)
        }
    }
}

pub async fn apply(api: &DeviceApi, values: CameraSettings) -> Result<String, ApiError> {
    match api.apply_settings(&values).await {
        Ok(message) => {
            info!(?values, "camera settings applied");
            Ok(message)
        }
        Err(e) => {
            warn!(error = %e, ?values, "failed to apply camera settings");
            Err(e)
        }
    }
}
