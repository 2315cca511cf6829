mod api;
mod auth;
mod camera;
mod cli;
mod config;
#[cfg(test)]
mod mock_device;
mod protocol;
mod tui;

use anyhow::{Context, Result};
use cli::{Cli, Commands, Graphics, SetArgs, SettingsAction};
use config::{expand_path, Config, FileConfig};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use api::DeviceApi;
use auth::StaticToken;
use camera::lifecycle::{StreamSession, WsConnector};
use camera::settings::{Field, SettingsPanel};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = expand_path(&cli.config);
    let file = FileConfig::load(&config_path)?;
    let config = Config::resolve(file, cli.overrides())?;

    let tui_mode = matches!(cli.command, Commands::Stream { .. });
    init_logging(tui_mode.then_some(config.log_file.as_path()))?;

    let auth = Arc::new(StaticToken::new(config.token.clone()));
    let api = DeviceApi::new(config.http_base(), auth.clone());

    let result = run_command(cli.command, &config, api).await;
    if auth.is_invalidated() {
        eprintln!("🔑 The device rejected the token; pass a fresh one with --token or DEVCAM_TOKEN");
    }
    result
}

async fn run_command(command: Commands, config: &Config, api: DeviceApi) -> Result<()> {
    match command {
        Commands::Stream { graphics, .. } => {
            start_stream(config, api, graphics).await?;
        }
        Commands::Capture { out } => {
            let dir = out.unwrap_or_else(|| config.capture_dir.clone());
            println!("📸 Capturing from {}...", config.host);
            let path = camera::snapshot::capture_to_dir(&api, &dir).await?;
            println!("✅ Saved to: {}", path.display());
        }
        Commands::Settings { action } => match action {
            SettingsAction::Get => {
                let mut panel = SettingsPanel::new();
                panel.load(&api).await.context("Failed to load camera settings")?;
                print_settings(&panel);
            }
            SettingsAction::Set(args) => {
                set_settings(&api, args).await?;
            }
        },
        Commands::Status => {
            let status = api.status().await.context("Failed to read camera status")?;
            println!("📷 Camera at {}", api.base_url());
            println!("   Enabled:     {}", yes_no(status.enabled));
            println!("   Initialized: {}", yes_no(status.initialized));
            if let Some(report) = status.settings {
                let mut panel = SettingsPanel::new();
                panel.merge(&report);
                print_settings(&panel);
            }
        }
        Commands::Enable => {
            let message = api.set_enabled(true).await.context("Failed to enable camera")?;
            println!("✅ {}", or_default(message, "Camera enabled"));
        }
        Commands::Disable => {
            let message = api.set_enabled(false).await.context("Failed to disable camera")?;
            println!("✅ {}", or_default(message, "Camera disabled"));
        }
    }

    Ok(())
}

/// Logs go to a file while the terminal UI owns the screen, stderr otherwise
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,devcam=info"));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log dir {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

async fn start_stream(config: &Config, api: DeviceApi, graphics: Option<Graphics>) -> Result<()> {
    println!("📷 Camera: {}", config.ws_url());
    println!("📝 Logging to: {}", config.log_file.display());

    // Query the terminal before raw mode takes over stdin
    let picker = tui::surface::create_picker(graphics);
    println!("🖥️  Graphics: {:?}", picker.protocol_type());
    let session = StreamSession::new(
        WsConnector::new(config.ws_url()),
        tui::surface::TerminalSurface::new(picker),
        config.frame_interval,
    );

    let mut ui = tui::CameraUI::new(session, api, config.host.clone(), config.capture_dir.clone());
    ui.run().await?;

    println!("👋 Stream closed");
    Ok(())
}

/// Fields left out on the command line keep the device's current value
async fn set_settings(api: &DeviceApi, args: SetArgs) -> Result<()> {
    let mut panel = SettingsPanel::new();
    let requested = [
        (Field::Quality, args.quality),
        (Field::Brightness, args.brightness),
        (Field::Contrast, args.contrast),
        (Field::FrameSize, args.framesize),
    ];

    if requested.iter().all(|(_, v)| v.is_none()) {
        anyhow::bail!("Nothing to set; pass at least one of --quality, --brightness, --contrast, --framesize");
    }
    if requested.iter().any(|(_, v)| v.is_none()) {
        panel
            .load(api)
            .await
            .context("Failed to load current settings")?;
    }
    for (field, value) in requested {
        if let Some(value) = value {
            let range = field.range();
            if !range.contains(&value) {
                println!(
                    "⚠️  {} {} is outside {}..={}, sending anyway",
                    field.label(),
                    value,
                    range.start(),
                    range.end()
                );
            }
            panel.set(field, value);
        }
    }

    let message = panel.apply(api).await.context("Failed to apply settings")?;
    println!("✅ {}", or_default(message, "Settings applied"));
    print_settings(&panel);
    Ok(())
}

fn print_settings(panel: &SettingsPanel) {
    println!("⚙️  Camera settings:");
    for field in Field::ALL {
        println!("   {:<11} {}", field.label(), panel.get(field));
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn or_default(message: String, fallback: &str) -> String {
    if message.is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
