use serde::{Deserialize, Serialize};

/// Commands sent to the device over the camera socket (JSON text frames)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ClientCommand {
    /// Ask for one frame; the device answers with at most one binary message
    Capture,
    /// Liveness check; the device answers with a `pong` notice
    Ping,
}

impl ClientCommand {
    pub fn to_json(self) -> String {
        // Unit variants with a string tag cannot fail to serialize
        serde_json::to_string(&self).unwrap_or_default()
    }
}

/// Typed view of the JSON notices the device pushes on the camera socket
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeviceNotice {
    Welcome {
        #[serde(default)]
        message: String,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    Pong {
        /// Device uptime in milliseconds
        #[serde(default)]
        timestamp: u64,
    },
}

/// Any text frame from the device. Diagnostic only, never affects streaming.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Notice(DeviceNotice),
    /// Valid JSON that isn't a known notice
    Json(serde_json::Value),
    /// Not JSON at all
    Raw(String),
}

impl Diagnostic {
    pub fn parse(text: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(_) => return Diagnostic::Raw(text.to_string()),
        };
        match serde_json::from_value::<DeviceNotice>(value.clone()) {
            Ok(notice) => Diagnostic::Notice(notice),
            Err(_) => Diagnostic::Json(value),
        }
    }
}

/// Device capture parameters, sent form-encoded on write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub quality: i32,
    pub brightness: i32,
    pub contrast: i32,
    pub framesize: i32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        // Device boot defaults: JPEG quality 12, neutral image, VGA
        Self {
            quality: 12,
            brightness: 0,
            contrast: 0,
            framesize: 8,
        }
    }
}

/// Settings as read back from the device; any field may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SettingsReport {
    pub quality: Option<i32>,
    pub brightness: Option<i32>,
    pub contrast: Option<i32>,
    pub framesize: Option<i32>,
}

/// `GET /api/v1/camera/settings`
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsResponse {
    pub success: bool,
    #[serde(default)]
    pub settings: Option<SettingsReport>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Generic `{ success, message? }` envelope used by write endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiReply {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// `GET /api/v1/camera/status`
#[derive(Debug, Clone, Deserialize)]
pub struct CameraStatus {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub initialized: bool,
    #[serde(default)]
    pub settings: Option<SettingsReport>,
}

/// Error body returned with non-success statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
