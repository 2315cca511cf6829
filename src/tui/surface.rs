//! Camera frames on the terminal through ratatui-image.
//!
//! The graphics protocol is either chosen with `--graphics` or detected:
//! the terminal is queried first, then the environment it advertises is
//! consulted, and halfblocks is the fallback that works everywhere.

use image::codecs::jpeg::JpegDecoder;
use image::DynamicImage;
use ratatui_image::picker::{Picker, ProtocolType};
use ratatui_image::protocol::StatefulProtocol;
use std::io::Cursor;
use tracing::{debug, info};

use crate::camera::frame::{FrameError, Surface};
use crate::cli::Graphics;

impl From<Graphics> for ProtocolType {
    fn from(graphics: Graphics) -> Self {
        match graphics {
            Graphics::Sixel => ProtocolType::Sixel,
            Graphics::Kitty => ProtocolType::Kitty,
            Graphics::Iterm2 => ProtocolType::Iterm2,
            Graphics::Halfblocks => ProtocolType::Halfblocks,
        }
    }
}

/// Must run before raw mode, since detection talks to the terminal on stdio
pub fn create_picker(forced: Option<Graphics>) -> Picker {
    let (picker, source) = match forced {
        Some(graphics) => (picker_for(graphics.into()), "forced"),
        None => match Picker::from_query_stdio() {
            Ok(picker) => (picker, "terminal query"),
            Err(e) => {
                debug!(error = ?e, "terminal did not answer the graphics query");
                (picker_for(TerminalHints::from_env().protocol()), "environment")
            }
        },
    };
    info!(protocol = ?picker.protocol_type(), source, "graphics protocol selected");
    picker
}

fn picker_for(protocol: ProtocolType) -> Picker {
    let mut picker = Picker::halfblocks();
    picker.set_protocol_type(protocol);
    picker
}

/// What a terminal says about itself through environment variables
#[derive(Debug, Default)]
struct TerminalHints {
    term_program: String,
    term: String,
    windows_terminal: bool,
}

impl TerminalHints {
    fn from_env() -> Self {
        Self {
            term_program: std::env::var("TERM_PROGRAM").unwrap_or_default(),
            term: std::env::var("TERM").unwrap_or_default(),
            windows_terminal: std::env::var_os("WT_SESSION").is_some(),
        }
    }

    fn protocol(&self) -> ProtocolType {
        let program = self.term_program.to_ascii_lowercase();
        if program.contains("wezterm") {
            ProtocolType::Sixel
        } else if program.contains("iterm") {
            ProtocolType::Iterm2
        } else if self.term.contains("kitty") || program.contains("kitty") || program == "ghostty" {
            ProtocolType::Kitty
        } else if self.windows_terminal {
            ProtocolType::Sixel
        } else {
            ProtocolType::Halfblocks
        }
    }
}

/// A decoded camera frame, encoded for the terminal's graphics protocol
pub struct TerminalFrame {
    pub width: u32,
    pub height: u32,
    pub protocol: StatefulProtocol,
}

pub struct TerminalSurface {
    picker: Picker,
}

impl TerminalSurface {
    pub fn new(picker: Picker) -> Self {
        Self { picker }
    }

    pub fn protocol_type(&self) -> ProtocolType {
        self.picker.protocol_type()
    }
}

impl Surface for TerminalSurface {
    type Resource = TerminalFrame;

    fn create(&mut self, payload: &[u8]) -> Result<TerminalFrame, FrameError> {
        if payload.is_empty() {
            return Err(FrameError::Empty);
        }
        let decoder =
            JpegDecoder::new(Cursor::new(payload)).map_err(|e| FrameError::Decode(e.to_string()))?;
        let image =
            DynamicImage::from_decoder(decoder).map_err(|e| FrameError::Decode(e.to_string()))?;

        Ok(TerminalFrame {
            width: image.width(),
            height: image.height(),
            protocol: self.picker.new_resize_protocol(image),
        })
    }

    fn release(&mut self, frame: TerminalFrame) {
        debug!(width = frame.width, height = frame.height, "frame released");
        drop(frame);
    }
}
