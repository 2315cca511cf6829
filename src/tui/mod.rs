mod helpers;
mod render;
pub mod surface;
mod types;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::DeviceApi;
use crate::camera::lifecycle::StreamSession;
use crate::camera::settings::{self, SettingsPanel};
use crate::camera::snapshot;
use crate::camera::stats::StatsSnapshot;
use crate::camera::ConnectionState;

use surface::TerminalSurface;
use types::{Alert, AlertLevel, UiEvent};

/// Redraw cadence; every redraw also pumps socket events
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);
/// How long quitting waits for the camera socket to finish closing
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

pub struct CameraUI {
    pub(crate) session: StreamSession<TerminalSurface>,
    pub(crate) api: DeviceApi,
    pub(crate) panel: SettingsPanel,
    pub(crate) capture_dir: PathBuf,
    pub(crate) host: String,
    pub(crate) stats: StatsSnapshot,
    pub(crate) alert: Option<Alert>,
    pub(crate) capture_pending: bool,
    pub(crate) settings_busy: bool,
    last_state: ConnectionState,
    events_tx: mpsc::UnboundedSender<UiEvent>,
    events_rx: mpsc::UnboundedReceiver<UiEvent>,
}

impl CameraUI {
    pub fn new(
        session: StreamSession<TerminalSurface>,
        api: DeviceApi,
        host: String,
        capture_dir: PathBuf,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session,
            api,
            panel: SettingsPanel::new(),
            capture_dir,
            host,
            stats: StatsSnapshot::default(),
            alert: None,
            capture_pending: false,
            settings_busy: false,
            last_state: ConnectionState::Idle,
            events_tx,
            events_rx,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal - no mouse capture so native text selection works
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_loop(&mut terminal).await;

        self.shutdown().await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Stop the stream and wait briefly for the socket to close
    pub(crate) async fn shutdown(&mut self) {
        self.session.stop();
        let closed = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while self.session.state() != ConnectionState::Idle {
                self.session.step().await;
            }
        })
        .await;
        if closed.is_err() {
            warn!("camera socket still closing at exit");
        }
    }

    async fn run_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        self.reload_settings();

        loop {
            self.tick(Instant::now());
            terminal.draw(|f| self.ui(f))?;

            if event::poll(REDRAW_INTERVAL)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key) {
                        info!("quit requested");
                        return Ok(());
                    }
                }
            }
            // Let socket and request tasks make progress between redraws
            tokio::task::yield_now().await;
        }
    }

    /// One redraw's worth of bookkeeping
    pub(crate) fn tick(&mut self, now: Instant) {
        for notice in self.session.pump() {
            self.on_notice(notice);
        }
        self.stats = self.session.stats_at(now);

        let state = self.session.state();
        if state != self.last_state {
            if state == ConnectionState::Idle {
                if let Some(err) = self.session.last_error().map(str::to_string) {
                    self.alert(AlertLevel::Error, format!("Connection lost: {}", err));
                }
            }
            self.last_state = state;
        }

        while let Ok(event) = self.events_rx.try_recv() {
            self.on_ui_event(event);
        }
        self.expire_alert(now);
    }

    /// Returns true when the user asked to quit
    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> bool {
        let affordances = self.session.affordances();
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('s') => {
                if affordances.start && self.session.start() {
                    self.alert(AlertLevel::Info, format!("Connecting to {}", self.host));
                }
            }
            KeyCode::Char('x') => {
                if affordances.stop {
                    self.session.stop();
                    self.alert(AlertLevel::Info, "Stream stopped");
                }
            }
            KeyCode::Char('c') => self.request_capture(),
            KeyCode::Char('p') => {
                if self.session.ping() {
                    self.alert(AlertLevel::Info, "Ping sent");
                } else {
                    self.alert(AlertLevel::Error, "Not streaming");
                }
            }
            KeyCode::Char('r') => self.reload_settings(),
            KeyCode::Up => self.panel.select_prev(),
            KeyCode::Down => self.panel.select_next(),
            KeyCode::Left => self.panel.adjust(self.panel.selected(), -1),
            KeyCode::Right => self.panel.adjust(self.panel.selected(), 1),
            KeyCode::Enter => self.apply_settings(),
            _ => {}
        }
        false
    }

    fn request_capture(&mut self) {
        if !self.session.affordances().capture {
            self.alert(AlertLevel::Error, "Start the stream to capture");
            return;
        }
        if self.capture_pending {
            self.alert(AlertLevel::Info, "Capture already in progress");
            return;
        }
        self.capture_pending = true;
        self.alert(AlertLevel::Info, "Capturing...");

        let api = self.api.clone();
        let dir = self.capture_dir.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = snapshot::capture_to_dir(&api, &dir)
                .await
                .map_err(|e| format!("{:#}", e));
            let _ = tx.send(UiEvent::Captured(result));
        });
    }

    fn reload_settings(&mut self) {
        if self.settings_busy {
            return;
        }
        self.settings_busy = true;

        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = settings::load(&api).await.map_err(|e| e.to_string());
            let _ = tx.send(UiEvent::SettingsLoaded(result));
        });
    }

    fn apply_settings(&mut self) {
        if self.settings_busy {
            self.alert(AlertLevel::Info, "Settings request in progress");
            return;
        }
        self.settings_busy = true;

        let api = self.api.clone();
        let values = self.panel.values();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = settings::apply(&api, values).await.map_err(|e| e.to_string());
            let _ = tx.send(UiEvent::SettingsApplied(result));
        });
    }
}
