use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use segue::config;
use segue::{AutoStopPolicy, PlayerEvent, PlayerSession};

use crate::app::{App, next_auto_stop};
use crate::ui;

const TICK: Duration = Duration::from_secs(1);

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// When the session last got its one-second tick.
    pub last_tick: Instant,
    /// Policies the `t` key cycles through.
    pub auto_stop_cycle: Vec<AutoStopPolicy>,
}

impl EventLoopState {
    pub fn new(settings: &config::Settings) -> Self {
        Self {
            pending_gg: false,
            last_tick: Instant::now(),
            auto_stop_cycle: settings.playback.auto_stop_cycle(),
        }
    }
}

/// Main terminal event loop: drives the session, drains its events, draws the
/// UI and handles input. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    session: &mut PlayerSession,
    events: &Receiver<PlayerEvent>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        // Engine callbacks, cover fetches and MPRIS commands land here.
        session.dispatch();
        if state.last_tick.elapsed() >= TICK {
            state.last_tick = Instant::now();
            session.tick();
        }

        while let Ok(ev) = events.try_recv() {
            app.apply_event(&ev);
        }
        sync_from_session(app, session);

        terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.controls))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, session, state) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn sync_from_session(app: &mut App, session: &PlayerSession) {
    app.state = session.state();
    app.rate = session.playback_rate();
    app.auto_stop = session.auto_stop_policy();
    app.playing_index = session.current_file().map(|_| session.current_index());
}

/// Returns `true` when the user asked to quit.
fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    session: &mut PlayerSession,
    state: &mut EventLoopState,
) -> bool {
    if key.code != KeyCode::Char('g') {
        state.pending_gg = false;
    }

    match key.code {
        KeyCode::Char('q') => {
            session.stop();
            return true;
        }
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.follow_playback_off();
                app.set_selected(0);
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => {
            app.follow_playback_off();
            app.set_selected(app.tracks.len().saturating_sub(1));
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Enter => {
            if app.has_tracks() {
                app.follow_playback_on();
                if app.selected == session.current_index() {
                    session.play();
                } else {
                    session.play_track(app.selected);
                }
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            app.follow_playback_on();
            session.toggle_play_pause();
        }
        KeyCode::Char('s') => session.stop(),
        KeyCode::Char('l') => {
            app.follow_playback_on();
            session.play_next_track();
        }
        KeyCode::Char('h') => {
            app.follow_playback_on();
            session.play_previous_track();
        }
        KeyCode::Char('L') => session.seek_forward(settings.controls.seek_seconds as f64),
        KeyCode::Char('H') => session.seek_backward(settings.controls.seek_seconds as f64),
        KeyCode::Char(']') => {
            session.set_playback_rate(session.playback_rate() + settings.controls.rate_step);
        }
        KeyCode::Char('[') => {
            session.set_playback_rate(session.playback_rate() - settings.controls.rate_step);
        }
        KeyCode::Char('t') => {
            let next = next_auto_stop(&state.auto_stop_cycle, session.auto_stop_policy());
            session.setup_auto_stop(next);
        }
        _ => {}
    }

    false
}
