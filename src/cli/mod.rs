use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{Overrides, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(name = "devcam")]
#[command(about = "📷 Live view and control for network camera devices", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Device host[:port]
    #[arg(long, global = true, env = "DEVCAM_HOST")]
    pub host: Option<String>,

    /// Bearer token for privileged requests
    #[arg(long, global = true, env = "DEVCAM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Use wss/https
    #[arg(long, global = true)]
    pub tls: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the live view
    Stream {
        /// Milliseconds between frame requests
        #[arg(short, long)]
        interval: Option<u64>,

        /// Graphics protocol (auto-detect by default)
        #[arg(short, long, value_enum)]
        graphics: Option<Graphics>,
    },

    /// Save a single frame as a JPEG file
    Capture {
        /// Output directory (defaults to capture_dir from the config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Read or change capture settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Show camera status
    Status,

    /// Turn the camera on
    Enable,

    /// Turn the camera off
    Disable,
}

/// Terminal graphics protocol for the live view
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Graphics {
    Sixel,
    Kitty,
    Iterm2,
    Halfblocks,
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the current settings
    Get,
    /// Change settings; omitted fields keep the device's current value
    Set(SetArgs),
}

#[derive(Args, Debug, Default)]
pub struct SetArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub quality: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    pub brightness: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    pub contrast: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    pub framesize: Option<i32>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn overrides(&self) -> Overrides {
        let frame_interval_ms = match &self.command {
            Commands::Stream { interval, .. } => *interval,
            _ => None,
        };
        Overrides {
            host: self.host.clone(),
            tls: self.tls,
            token: self.token.clone(),
            frame_interval_ms,
        }
    }
}
