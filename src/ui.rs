//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style},
    widgets::{Block, Borders, LineGauge, List, ListItem, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use segue::config::{ControlsSettings, TimeField, UiSettings};
use segue::{AutoStopPolicy, PlaybackTime, SessionState};

use crate::app::App;

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    BTreeMap::from([
        ("j/k", "up/down"),
        ("gg/G", "top/bottom"),
        ("enter", "play selected song"),
        ("space/p", "play/pause"),
        ("s", "stop"),
        ("h/l", "prev/next song"),
        // H/L and [/] are filled in from config.
        ("t", "auto-stop"),
        ("q", "quit"),
    ])
});

/// Render the controls help text, incorporating seek seconds and rate step.
fn controls_text(controls: &ControlsSettings) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "j/k", "h/l", "H/L", "enter", "space/p", "s", "[/]", "t", "gg/G", "q",
    ];
    order
        .iter()
        .filter_map(|k| match *k {
            "H/L" => Some(format!("[H/L] seek -/+{}s", controls.seek_seconds)),
            "[/]" => Some(format!("[[/]] rate -/+{:.2}", controls.rate_step)),
            _ => CONTROLS_MAP.get(k).map(|v| format!("[{k}] {v}")),
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(time: &PlaybackTime, ui: &UiSettings) -> Option<String> {
    let elapsed = time.current_duration();
    let total = time.total_duration();

    let parts: Vec<String> = ui
        .now_playing_time_fields
        .iter()
        .filter_map(|f| match f {
            TimeField::Elapsed => Some(format_mmss(elapsed)),
            TimeField::Total => total.map(format_mmss),
            TimeField::Remaining => total.map(|t| format!("-{}", format_mmss(t.saturating_sub(elapsed)))),
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

/// Share of the current track already played; empty until a track has time.
fn progress_ratio(time: Option<&PlaybackTime>) -> f64 {
    time.map_or(0.0, PlaybackTime::fraction)
}

fn state_text(state: SessionState) -> &'static str {
    match state {
        SessionState::Idle => "Idle",
        SessionState::Loading => "Loading",
        SessionState::Ready => "Ready",
        SessionState::Playing => "Playing",
        SessionState::Paused => "Paused",
        SessionState::Stopped => "Stopped",
    }
}

fn auto_stop_text(policy: AutoStopPolicy, remaining: Option<f64>) -> String {
    match policy {
        AutoStopPolicy::Disabled => "AUTO-STOP: Off".to_string(),
        AutoStopPolicy::AfterTrackEnd => "AUTO-STOP: End of track".to_string(),
        AutoStopPolicy::After(total) => {
            let left = remaining.unwrap_or(total).max(0.0);
            format!("AUTO-STOP: {} left", format_mmss(Duration::from_secs_f64(left)))
        }
    }
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(frame: &mut Frame, app: &App, ui_settings: &UiSettings, controls: &ControlsSettings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" segue ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status = {
        let mut parts: Vec<String> = Vec::new();

        if app.follow_playback {
            parts.push(" CURSOR: Follow".to_string());
        } else {
            parts.push(" CURSOR: Free-roam".to_string());
        }

        parts.push(state_text(app.state).to_string());

        if let Some(track) = app.playing_index.and_then(|i| app.tracks.get(i)) {
            let time = app
                .time
                .as_ref()
                .and_then(|t| now_playing_time_text(t, ui_settings));
            match time {
                Some(time) => parts.push(format!("Song: {} [{}]", track.display, time)),
                None => parts.push(format!("Song: {}", track.display)),
            }
        }

        parts.push(format!("RATE: {:.2}x", app.rate));
        parts.push(auto_stop_text(app.auto_stop, app.auto_stop_remaining));

        if let Some(dir) = &app.current_dir {
            parts.push(format!("Dir: {dir}"));
        }
        if let Some(err) = &app.last_error {
            parts.push(format!("ERROR: {err}"));
        }

        parts.join(" • ")
    };

    let status_par = Paragraph::new(status)
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    let progress = LineGauge::default()
        .ratio(progress_ratio(app.time.as_ref()))
        .label("")
        .filled_style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(progress, chunks[2]);

    // Main list
    {
        // Center the selected item when possible by creating a visible window.
        // Only build ListItems for the visible window.
        let total = app.tracks.len();
        let list_height = chunks[3].height as usize;
        let sel_pos = app.selected.min(total.saturating_sub(1));
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = (start..end)
            .map(|i| {
                let marker = if app.playing_index == Some(i) { "♪ " } else { "  " };
                ListItem::new(format!("{marker}{}", app.tracks[i].display))
            })
            .collect();

        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(" tracks "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[3], &mut state);
    }

    let footer = Paragraph::new(controls_text(controls))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[4]);
}
