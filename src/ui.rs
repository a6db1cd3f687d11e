//! UI rendering helpers for the terminal user interface.
//!
//! The event loop captures a [`View`] from the controller and only redraws
//! when it changes; everything here renders that snapshot with `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock};

use crate::config::UiSettings;
use crate::controller::SourceController;
use crate::source::{Notice, PlaybackStatus, SourceId, TrackRecord};

static CONTROLS_MAP: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    map.insert("1-4".to_string(), "disc/bluetooth/spotify/file".to_string());
    map.insert("0".to_string(), "no source".to_string());
    map.insert("space/p".to_string(), "play/pause".to_string());
    map.insert("x".to_string(), "stop".to_string());
    map.insert("h/l".to_string(), "prev/next".to_string());
    // H/L is filled dynamically from config.
    map.insert("j/k".to_string(), "up/down".to_string());
    map.insert("enter".to_string(), "play selected".to_string());
    map.insert("s".to_string(), "shuffle".to_string());
    map.insert("r".to_string(), "repeat".to_string());
    map.insert("e".to_string(), "eject".to_string());
    map.insert("c".to_string(), "dismiss".to_string());
    map.insert("q".to_string(), "quit".to_string());
    map
});

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    let order = [
        "1-4", "0", "space/p", "x", "h/l", "H/L", "j/k", "enter", "s", "r", "e", "c", "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] scrub -/+{}s", scrub_seconds))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Everything the screen shows, captured once per loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub sources: Vec<SourceId>,
    pub active: Option<SourceId>,
    pub status: PlaybackStatus,
    pub track: TrackRecord,
    /// Whole seconds, so the view only changes when the clock display does.
    pub position_secs: u64,
    pub shuffle: bool,
    pub repeat: bool,
    pub notice: Notice,
    pub program: Vec<TrackRecord>,
    pub cursor: usize,
}

impl View {
    /// Snapshot `controller`, clamping `cursor` to the program.
    pub fn capture(controller: &SourceController, cursor: usize) -> Self {
        let program = controller.program();
        Self {
            sources: controller.available(),
            active: controller.active_id(),
            status: controller.status(),
            track: controller.track(),
            position_secs: controller.position() / 1_000,
            shuffle: controller.shuffle(),
            repeat: controller.repeat(),
            notice: controller.notice(),
            cursor: cursor.min(program.len().saturating_sub(1)),
            program,
        }
    }
}

/// Key that selects `id`.
pub fn source_key(id: SourceId) -> char {
    match id {
        SourceId::Disc => '1',
        SourceId::Bluetooth => '2',
        SourceId::Spotify => '3',
        SourceId::File => '4',
    }
}

/// Format milliseconds as `MM:SS`.
pub fn format_mmss(ms: u64) -> String {
    let secs = ms / 1_000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// `NN. Artist - Title`, leaving out whatever is unknown.
pub fn track_text(track: &TrackRecord) -> String {
    if track.is_empty() {
        return "-".to_string();
    }
    let mut text = String::new();
    if track.index > 0 {
        text.push_str(&format!("{:02}. ", track.index));
    }
    if !track.artist.is_empty() {
        text.push_str(&track.artist);
        text.push_str(" - ");
    }
    text.push_str(&track.title);
    text
}

/// Codec, sample rate and bitrate, e.g. `PCM 44.1 kHz 1411 kbps`.
pub fn quality_text(track: &TrackRecord) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !track.codec.is_empty() {
        parts.push(track.codec.clone());
    }
    if track.sample_rate_hz > 0 {
        parts.push(format!("{:.1} kHz", f64::from(track.sample_rate_hz) / 1_000.0));
    }
    if track.bitrate_bps > 0 {
        parts.push(format!("{} kbps", track.bitrate_bps / 1_000));
    }
    parts.join(" ")
}

fn left_padding() -> Padding {
    Padding {
        left: 1,
        right: 0,
        top: 0,
        bottom: 0,
    }
}

/// Render the entire UI into `frame` from `view`.
pub fn draw(frame: &mut Frame, view: &View, ui_settings: &UiSettings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header: the source tabs.
    let tabs: Vec<Span> = view
        .sources
        .iter()
        .flat_map(|&id| {
            let label = format!("[{}] {}", source_key(id), id);
            let span = if view.active == Some(id) {
                Span::styled(label, Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
            } else {
                Span::raw(label)
            };
            [span, Span::raw("  ")]
        })
        .collect();
    let header = Paragraph::new(Line::from(tabs))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(ui_settings.header_text.as_str())
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let mut lines: Vec<Line> = Vec::new();
    {
        let mut parts: Vec<String> = Vec::new();
        match view.active {
            Some(id) => parts.push(format!("SOURCE: {id}")),
            None => parts.push("SOURCE: none".to_string()),
        }
        parts.push(view.status.as_str().to_uppercase());
        parts.push(format!("Shuffle: {}", if view.shuffle { "ON" } else { "OFF" }));
        parts.push(format!("Repeat: {}", if view.repeat { "ON" } else { "OFF" }));
        lines.push(Line::from(parts.join(" • ")));
    }
    lines.push(Line::from(track_text(&view.track)));
    if !view.track.is_empty() {
        let position = format_mmss(view.position_secs * 1_000);
        let mut time = if view.track.duration_ms > 0 {
            format!("{} / {}", position, format_mmss(view.track.duration_ms))
        } else {
            position
        };
        if !view.track.album.is_empty() {
            time = format!("{} • {}", view.track.album, time);
        }
        lines.push(Line::from(time));
        lines.push(Line::from(quality_text(&view.track)).dim());
    }
    if view.notice.active {
        lines.push(Line::from(view.notice.text.as_str()).bold().slow_blink());
    }
    let status_par = Paragraph::new(lines)
        .block(Block::bordered().padding(left_padding()).title(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Program list
    {
        let items: Vec<ListItem> = view
            .program
            .iter()
            .map(|t| {
                let playing = t.index > 0 && t.index == view.track.index;
                let marker = if playing { "▶ " } else { "  " };
                let duration = if t.duration_ms > 0 {
                    format_mmss(t.duration_ms)
                } else {
                    "--:--".to_string()
                };
                ListItem::new(format!("{marker}{:>2}. {}  {duration}", t.index, t.title))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(" program "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if !view.program.is_empty() {
            state.select(Some(view.cursor));
        }
        frame.render_stateful_widget(list, chunks[2], &mut state);
    }

    let footer = Paragraph::new(controls_text(ui_settings.scrub_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(left_padding()),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}

#[cfg(test)]
mod tests;
