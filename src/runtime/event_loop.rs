use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, info};

use crate::app::{App, SecondsField};
use crate::config;
use crate::engine::PlaybackEngine;
use crate::error;
use crate::resolver::ResolverWorker;
use crate::sequencer::Sequencer;
use crate::ui;

/// Longest time the loop sleeps in `event::poll`, so engine end-of-track
/// and resolver outcomes are noticed promptly.
const MAX_IDLE: Duration = Duration::from_millis(50);

/// Fraction of the current track jumped by the scrub keys.
const SCRUB_RATIO: f64 = 0.05;

/// Main terminal event loop: handles input, resolver outcomes, timers and
/// drawing. Returns `Ok(())` when shutdown is requested.
pub fn run<E: PlaybackEngine>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    sequencer: &mut Sequencer<E>,
    resolver: &ResolverWorker,
) -> Result<(), Box<dyn std::error::Error>> {
    let redraw_every = Duration::from_millis(settings.ui.poll_ms);
    let mut redraw = true;
    let mut last_draw = Instant::now();

    loop {
        while let Some(outcome) = resolver.try_recv() {
            sequencer.apply_resolution(outcome);
            redraw = true;
        }
        while let Some(outcome) = resolver.try_recv_levels() {
            sequencer.apply_levels(outcome);
            redraw = true;
        }
        if sequencer.poll() {
            redraw = true;
        }
        app.clamp_selection(sequencer.timeline().len());

        if redraw || last_draw.elapsed() >= redraw_every {
            let view = build_view(sequencer);
            terminal.draw(|f| ui::draw(f, &view, app, &settings.ui))?;
            last_draw = Instant::now();
            redraw = false;
        }

        let mut timeout = redraw_every
            .saturating_sub(last_draw.elapsed())
            .min(MAX_IDLE);
        if let Some(deadline) = sequencer.next_deadline() {
            timeout = timeout.min(deadline.saturating_duration_since(Instant::now()));
        }

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, sequencer, resolver) {
                    break;
                }
                redraw = true;
            }
        }
    }

    Ok(())
}

fn build_view<E: PlaybackEngine>(sequencer: &Sequencer<E>) -> ui::View<'_> {
    let timeline = sequencer.timeline();
    ui::View {
        snapshot: sequencer.snapshot(),
        tracks: timeline.tracks(),
        track_progress: (0..timeline.len())
            .map(|i| sequencer.track_progress(i))
            .collect(),
        gap_seconds: timeline.gap_seconds(),
        lead_seconds: timeline.lead_seconds(),
        has_engine: sequencer.has_engine(),
    }
}

/// Show the outcome of a user command in the status line.
fn report(app: &mut App, result: error::Result<()>) {
    match result {
        Ok(()) => app.clear_status(),
        Err(e) => {
            debug!(error = %e, "command rejected");
            app.set_status(e.to_string());
        }
    }
}

/// Queue a level check for every track.
fn check_levels<E: PlaybackEngine>(app: &mut App, sequencer: &Sequencer<E>, resolver: &ResolverWorker) {
    let requests = sequencer.level_requests();
    if requests.is_empty() {
        return;
    }
    app.set_status(format!("checking levels of {} tracks", requests.len()));
    for request in requests {
        resolver.measure(request);
    }
}

fn apply_seconds<E: PlaybackEngine>(sequencer: &mut Sequencer<E>, field: SecondsField, value: f64) -> f64 {
    match field {
        SecondsField::Gap => sequencer.set_gap_seconds(value),
        SecondsField::Lead => sequencer.set_lead_seconds(value),
    }
}

fn handle_edit_key<E: PlaybackEngine>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    sequencer: &mut Sequencer<E>,
) {
    match key.code {
        KeyCode::Enter => {
            if let Some((field, value)) = app.commit_edit(settings.timeline.input_fallback_seconds) {
                let stored = apply_seconds(sequencer, field, value);
                info!(field = field.label(), seconds = stored, "setting changed");
            }
        }
        KeyCode::Esc => {
            if let Some((field, value)) = app.cancel_edit() {
                apply_seconds(sequencer, field, value);
            }
        }
        KeyCode::Backspace => {
            app.pop_edit_char();
            if let Some((field, value)) = app.edit_preview() {
                apply_seconds(sequencer, field, value);
            }
        }
        KeyCode::Char(c) => {
            app.push_edit_char(c);
            if let Some((field, value)) = app.edit_preview() {
                apply_seconds(sequencer, field, value);
            }
        }
        _ => {}
    }
}

/// Handle a single key press. Returns `true` when the app should quit.
fn handle_key_event<E: PlaybackEngine>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    sequencer: &mut Sequencer<E>,
    resolver: &ResolverWorker,
) -> bool {
    if app.is_editing() {
        handle_edit_key(key, settings, app, sequencer);
        return false;
    }

    let len = sequencer.timeline().len();
    let sel = app.selected;
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('j') | KeyCode::Down => app.next(len),
        KeyCode::Char('k') | KeyCode::Up => app.prev(len),
        KeyCode::Enter => report(app, sequencer.select_and_play(sel)),
        KeyCode::Char(' ') | KeyCode::Char('p') => report(app, sequencer.toggle_play_pause()),
        KeyCode::Char('o') => report(app, sequencer.select_only(sel)),
        KeyCode::Char('s') => {
            sequencer.stop();
            app.clear_status();
        }
        KeyCode::Char('d') => {
            let result = sequencer.remove(sel).map(|_| ());
            report(app, result);
            app.clamp_selection(sequencer.timeline().len());
        }
        KeyCode::Char('J') if sel + 1 < len => {
            report(app, sequencer.move_track(sel, sel + 1));
            app.selected = sel + 1;
        }
        KeyCode::Char('K') if sel > 0 && sel < len => {
            report(app, sequencer.move_track(sel, sel - 1));
            app.selected = sel - 1;
        }
        KeyCode::Char('c') => {
            sequencer.clear();
            app.selected = 0;
        }
        KeyCode::Char('r') => {
            let id = sequencer.timeline().get(sel).map(|t| t.id);
            if let Some(request) = id.and_then(|id| sequencer.resolution_request(id)) {
                resolver.resolve(request);
            }
            if app.auto_levels {
                if let Some(request) = id.and_then(|id| sequencer.level_request(id)) {
                    resolver.measure(request);
                }
            }
        }
        KeyCode::Char('v') => check_levels(app, sequencer, resolver),
        KeyCode::Char('A') => {
            let on = app.toggle_auto_levels();
            info!(auto = on, "automatic level check toggled");
            if on {
                check_levels(app, sequencer, resolver);
            } else {
                app.set_status("auto level check off");
            }
        }
        KeyCode::Char('g') => app.begin_edit(SecondsField::Gap, sequencer.timeline().gap_seconds()),
        KeyCode::Char('l') => {
            app.begin_edit(SecondsField::Lead, sequencer.timeline().lead_seconds())
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let gap = sequencer.timeline().gap_seconds() + settings.ui.gap_step_seconds;
            sequencer.set_gap_seconds(gap);
        }
        KeyCode::Char('-') => {
            let gap = sequencer.timeline().gap_seconds() - settings.ui.gap_step_seconds;
            sequencer.set_gap_seconds(gap);
        }
        KeyCode::Char(']') => {
            let lead = sequencer.timeline().lead_seconds() + settings.ui.gap_step_seconds;
            sequencer.set_lead_seconds(lead);
        }
        KeyCode::Char('[') => {
            let lead = sequencer.timeline().lead_seconds() - settings.ui.gap_step_seconds;
            sequencer.set_lead_seconds(lead);
        }
        KeyCode::Char(',') | KeyCode::Char('.') => {
            if let Some(track) = sequencer.timeline().get(sel) {
                let step = if key.code == KeyCode::Char('.') {
                    settings.ui.trim_step_db
                } else {
                    -settings.ui.trim_step_db
                };
                let db = track.adjust_db + step;
                let result = sequencer.set_adjust_db(sel, db).map(|_| ());
                report(app, result);
            }
        }
        KeyCode::Char('H') | KeyCode::Char('L') => {
            if let Some(cur) = sequencer.state().current {
                let delta = if key.code == KeyCode::Char('L') {
                    SCRUB_RATIO
                } else {
                    -SCRUB_RATIO
                };
                let target = sequencer.track_progress(cur) + delta;
                report(app, sequencer.seek_ratio(target));
            }
        }
        _ => {}
    }
    false
}
