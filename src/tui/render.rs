use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use ratatui_image::StatefulImage;

use crate::camera::settings::Field;
use crate::camera::ConnectionState;

use super::helpers::{format_bytes, format_rate};
use super::types::AlertLevel;
use super::CameraUI;

const SIDE_PANEL_WIDTH: u16 = 34;

fn badge_color(state: ConnectionState, has_error: bool) -> Color {
    match state {
        ConnectionState::Idle if has_error => Color::Red,
        ConnectionState::Idle => Color::DarkGray,
        ConnectionState::Connecting | ConnectionState::Closing => Color::Yellow,
        ConnectionState::Streaming => Color::Green,
    }
}

fn key_hint(key: &'static str, label: &'static str, enabled: bool) -> Vec<Span<'static>> {
    let key_style = if enabled {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let label_style = if enabled {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    vec![
        Span::styled(key, key_style),
        Span::styled(format!(" {} │ ", label), label_style),
    ]
}

impl CameraUI {
    pub(crate) fn ui(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(5),    // Frame + side panel
                Constraint::Length(1), // Alert bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(SIDE_PANEL_WIDTH)])
            .split(chunks[1]);
        self.render_frame(f, body[0]);
        self.render_side_panel(f, body[1]);

        self.render_alert(f, chunks[2]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let state = self.session.state();
        let affordances = state.affordances();
        let color = badge_color(state, self.session.last_error().is_some());

        let mut spans = vec![
            Span::styled(
                format!(" ● {} ", state.label()),
                Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(self.host.clone(), Style::default().fg(Color::Cyan)),
            Span::raw("  │ "),
        ];
        spans.extend(key_hint("s", "start", affordances.start));
        spans.extend(key_hint("x", "stop", affordances.stop));
        spans.extend(key_hint("c", "capture", affordances.capture && !self.capture_pending));
        spans.extend(key_hint("p", "ping", affordances.capture));
        spans.extend(key_hint("q", "quit", true));

        let graphics = self.session.frames().surface().protocol_type();
        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("📷 devcam ({:?})", graphics)),
        );
        f.render_widget(header, area);
    }

    fn render_frame(&mut self, f: &mut Frame, area: Rect) {
        // Render the image directly with no block around it; borders make
        // ratatui clear the area, which flickers with Sixel/Kitty
        if let Some(frame) = self.session.frames_mut().active_mut() {
            f.render_stateful_widget(StatefulImage::default(), area, &mut frame.protocol);
            return;
        }

        let text = match self.session.state() {
            ConnectionState::Idle => match self.session.last_error() {
                Some(err) => format!("Stream ended: {}\n\nPress s to reconnect", err),
                None => "Press s to start streaming".to_string(),
            },
            ConnectionState::Connecting => "Connecting to camera...".to_string(),
            ConnectionState::Streaming => "Waiting for the first frame...".to_string(),
            ConnectionState::Closing => "Closing...".to_string(),
        };
        let placeholder = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Live"));
        f.render_widget(placeholder, area);
    }

    fn render_side_panel(&self, f: &mut Frame, area: Rect) {
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(10), Constraint::Min(6)])
            .split(area);

        let label = Style::default().fg(Color::DarkGray);
        let stats = &self.stats;
        let resolution = self
            .session
            .frames()
            .active()
            .map(|fr| format!("{}×{}", fr.width, fr.height))
            .unwrap_or_else(|| "—".to_string());
        let stat_lines = vec![
            Line::from(vec![Span::styled("FPS        ", label), Span::raw(format!("{:.1}", stats.fps))]),
            Line::from(vec![Span::styled("Frames     ", label), Span::raw(stats.frames_total.to_string())]),
            Line::from(vec![Span::styled("Received   ", label), Span::raw(format_bytes(stats.bytes_total))]),
            Line::from(vec![
                Span::styled("Last frame ", label),
                Span::raw(format_bytes(stats.last_frame_bytes)),
            ]),
            Line::from(vec![Span::styled("Throughput ", label), Span::raw(format_rate(stats.bytes_per_sec))]),
            Line::from(vec![Span::styled("Image      ", label), Span::raw(resolution)]),
            Line::from(vec![
                Span::styled("Dropped    ", label),
                Span::raw(self.session.ingest().decode_failures().to_string()),
            ]),
            Line::from(vec![
                Span::styled("Interval   ", label),
                Span::raw(format!("{} ms", self.session.interval().as_millis())),
            ]),
        ];
        let stats_widget =
            Paragraph::new(stat_lines).block(Block::default().borders(Borders::ALL).title("Stats"));
        f.render_widget(stats_widget, parts[0]);

        let selected = self.panel.selected();
        let mut setting_lines: Vec<Line> = Field::ALL
            .iter()
            .map(|&field| {
                let is_selected = field == selected;
                let style = if is_selected {
                    Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                let range = field.range();
                Line::from(vec![
                    Span::styled(format!("{} {:<11}", if is_selected { "▶" } else { " " }, field.label()), style),
                    Span::styled(format!(" {:>3} ", self.panel.get(field)), style),
                    Span::styled(format!(" [{}..{}]", range.start(), range.end()), label),
                ])
            })
            .collect();
        setting_lines.push(Line::from(""));
        setting_lines.push(Line::from(Span::styled(
            "↑↓ select  ←→ adjust  ⏎ apply  r reload",
            label,
        )));

        let title = if self.settings_busy {
            "Settings (syncing…)"
        } else if self.panel.is_loaded() {
            "Settings"
        } else {
            "Settings (defaults)"
        };
        let settings_widget =
            Paragraph::new(setting_lines).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(settings_widget, parts[1]);
    }

    fn render_alert(&self, f: &mut Frame, area: Rect) {
        let Some(alert) = &self.alert else {
            f.render_widget(Paragraph::new("").style(Style::default().bg(Color::DarkGray)), area);
            return;
        };
        let (icon, bg) = match alert.level {
            AlertLevel::Info => ("ℹ️ ", Color::Blue),
            AlertLevel::Success => ("✅", Color::Green),
            AlertLevel::Error => ("⚠️ ", Color::Red),
        };
        let bar = Paragraph::new(format!(" {} {}", icon, alert.text))
            .style(Style::default().bg(bg).fg(Color::White).add_modifier(Modifier::BOLD));
        f.render_widget(bar, area);
    }
}
