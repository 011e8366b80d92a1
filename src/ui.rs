//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock};

use crate::app::{App, SecondsField};
use crate::config::UiSettings;
use crate::progress::Snapshot;
use crate::sequencer::Phase;
use crate::timeline::{
    ResolutionState, TotalDuration, Track, format_adjust_db, format_level_db, format_mmss,
};

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("enter", "play from here");
    map.insert("space/p", "play/pause");
    map.insert("o", "cue");
    map.insert("s", "stop");
    map.insert("J/K", "move track");
    map.insert("d", "delete");
    map.insert("c", "clear");
    map.insert("g/l", "edit gap/lead");
    map.insert("-/+", "gap");
    map.insert("[/]", "lead");
    map.insert(",/.", "trim");
    map.insert("H/L", "scrub");
    map.insert("r", "re-probe");
    map.insert("v", "check levels");
    map.insert("A", "auto levels");
    map.insert("q", "quit");
    map
});

/// Render the controls help text in a stable order.
fn controls_text() -> String {
    let order = [
        "j/k", "enter", "space/p", "o", "s", "H/L", "J/K", "d", "c", "r", "v", "A", "g/l", "-/+",
        "[/]", ",/.", "q",
    ];
    order
        .iter()
        .filter_map(|k| CONTROLS_MAP.get(k).map(|v| format!("[{}] {}", k, v)))
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Everything `draw` needs that lives outside `App`.
pub struct View<'a> {
    pub snapshot: Snapshot,
    pub tracks: &'a [Track],
    /// Fill level of each track's bar, index-aligned with `tracks`.
    pub track_progress: Vec<f64>,
    pub gap_seconds: f64,
    pub lead_seconds: f64,
    pub has_engine: bool,
}

/// Track length as `m:ss`, or where its resolution stands.
pub(crate) fn duration_label(track: &Track) -> String {
    match (track.known_duration(), track.resolution) {
        (Some(d), _) => {
            let secs = d.round() as u64;
            format!("{}:{:02}", secs / 60, secs % 60)
        }
        (None, ResolutionState::Unreadable) => "unreadable".to_string(),
        (None, _) => "calculating…".to_string(),
    }
}

/// Measured loudness as `avg … / peak … dB`, empty until a check ran.
pub(crate) fn levels_label(track: &Track) -> String {
    match track.levels {
        Some(l) => format!(
            "avg {} / peak {} dB",
            format_level_db(l.avg_db),
            format_level_db(l.peak_db)
        ),
        None => String::new(),
    }
}

/// `elapsed / total` for the global gauge.
pub(crate) fn progress_label(snapshot: &Snapshot) -> String {
    let total = match snapshot.total {
        TotalDuration::Known(t) => format_mmss(t),
        TotalDuration::Pending => "calculating…".to_string(),
    };
    format!("{} / {}", format_mmss(snapshot.elapsed_seconds), total)
}

/// Text bar of `width` cells filled to `fraction`.
pub(crate) fn bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn status_text(view: &View, app: &App) -> String {
    let snap = &view.snapshot;
    let mut parts: Vec<String> = Vec::new();

    let phase = match snap.phase {
        Phase::Playing if !snap.engine_playing => "Paused",
        other => other.label(),
    };
    parts.push(phase.to_string());

    if let Some(track) = snap.current.and_then(|i| view.tracks.get(i)) {
        parts.push(format!("Track: {}", track.name));
    }
    match (snap.phase, snap.phase_countdown) {
        (Phase::LeadIn, Some(left)) => parts.push(format!("starts in {:.1}s", left)),
        (Phase::Gap, Some(left)) => parts.push(format!("next in {:.1}s", left)),
        _ => {}
    }
    if snap.unreadable_tracks > 0 {
        parts.push(format!("{} unreadable", snap.unreadable_tracks));
    }
    if !view.has_engine {
        parts.push("no audio output".to_string());
    }
    if let Some(msg) = &app.status {
        parts.push(msg.clone());
    }
    parts.join(" • ")
}

fn settings_line<'a>(view: &View, app: &App) -> Line<'a> {
    let field = |field: SecondsField, value: f64| -> Span<'a> {
        match &app.editor {
            Some(ed) if ed.field == field => {
                Span::styled(format!("{}: [{}_]", field.label(), ed.buffer), Style::default().bold())
            }
            _ => Span::raw(format!("{}: {:.1}s", field.label(), value)),
        }
    };
    let levels = if app.auto_levels { "auto" } else { "manual" };
    Line::from(vec![
        field(SecondsField::Lead, view.lead_seconds),
        Span::raw("   "),
        field(SecondsField::Gap, view.gap_seconds),
        Span::raw(format!("   level check: {}", levels)),
    ])
}

fn track_item<'a>(index: usize, track: &Track, progress: f64, current: Option<usize>) -> ListItem<'a> {
    let marker = if current == Some(index) { "▶" } else { " " };
    let trim = if track.adjust_db != 0.0 {
        format!(" {}dB", format_adjust_db(track.adjust_db))
    } else {
        String::new()
    };
    let levels = levels_label(track);
    let levels = if levels.is_empty() {
        levels
    } else {
        format!("  {}", levels)
    };
    let text = format!(
        "{} {:>2}. {}  [{}]  {}{}{}  {}",
        marker,
        index + 1,
        track.name,
        track.format,
        duration_label(track),
        trim,
        levels,
        bar(progress, 10)
    );
    let style = match track.resolution {
        ResolutionState::Unreadable => Style::default().fg(Color::DarkGray),
        _ if track.finished => Style::default().add_modifier(Modifier::DIM),
        _ => Style::default(),
    };
    ListItem::new(text).style(style)
}

/// Render the entire UI into the provided `frame`.
pub fn draw(frame: &mut Frame, view: &View, app: &App, ui_settings: &UiSettings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
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

    let status = Paragraph::new(status_text(view, app))
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
    frame.render_widget(status, chunks[1]);

    let gauge = Gauge::default()
        .block(Block::bordered().title(" timeline "))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(view.snapshot.fraction().unwrap_or(0.0))
        .label(progress_label(&view.snapshot));
    frame.render_widget(gauge, chunks[2]);

    let settings = Paragraph::new(settings_line(view, app)).block(
        Block::bordered()
            .padding(Padding {
                left: 1,
                right: 0,
                top: 0,
                bottom: 0,
            })
            .title(" silence "),
    );
    frame.render_widget(settings, chunks[3]);

    // Center the selected item when possible by only building the visible window.
    let total = view.tracks.len();
    let list_height = chunks[4].height.saturating_sub(2) as usize;
    let (start, end) = if total <= list_height || list_height == 0 {
        (0, total)
    } else {
        let half = list_height / 2;
        let mut start = app.selected.saturating_sub(half);
        if start + list_height > total {
            start = total - list_height;
        }
        (start, start + list_height)
    };

    let items: Vec<ListItem> = (start..end)
        .map(|i| {
            let progress = view.track_progress.get(i).copied().unwrap_or(0.0);
            track_item(i, &view.tracks[i], progress, view.snapshot.current)
        })
        .collect();

    let title = if total == 0 {
        " tracks (pass files or folders on the command line) ".to_string()
    } else {
        format!(" tracks ({}) ", total)
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ratatui::widgets::ListState::default();
    if total > 0 {
        state.select(Some(app.selected.min(total - 1) - start));
    }
    frame.render_stateful_widget(list, chunks[4], &mut state);

    let footer = Paragraph::new(controls_text())
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
    frame.render_widget(footer, chunks[5]);
}
