pub mod frame;
pub mod ingest;
pub mod lifecycle;
pub mod pacer;
pub mod settings;
pub mod snapshot;
pub mod stats;

use std::time::Duration;

/// Default pause between capture commands (~10 requests/second)
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(100);
/// Statistics accounting window
pub const STATS_WINDOW: Duration = Duration::from_secs(1);
/// Path of the camera socket on the device
pub const CAMERA_WS_PATH: &str = "/ws/camera";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Closing,
}

/// Which operator controls are usable in a given state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub start: bool,
    pub stop: bool,
    pub capture: bool,
}

impl ConnectionState {
    pub fn affordances(self) -> Affordances {
        match self {
            ConnectionState::Idle => Affordances { start: true, stop: false, capture: false },
            ConnectionState::Connecting => Affordances { start: false, stop: true, capture: false },
            ConnectionState::Streaming => Affordances { start: false, stop: true, capture: true },
            ConnectionState::Closing => Affordances { start: true, stop: false, capture: false },
        }
    }

    /// Status badge text
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Idle => "Disconnected",
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Streaming => "Connected",
            ConnectionState::Closing => "Closing...",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Streaming)
    }
}
