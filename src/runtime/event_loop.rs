use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::config;
use crate::controller::SourceController;
use crate::source::{Notice, PlaybackStatus, SourceId};
use crate::ui;

/// Longest the loop blocks on input before re-checking the tick deadline.
const INPUT_POLL: Duration = Duration::from_millis(50);

/// What a key press asks the controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Select(SourceId),
    Deselect,
    PlayPause,
    Stop,
    Next,
    Prev,
    ScrubBack,
    ScrubForward,
    ToggleShuffle,
    ToggleRepeat,
    Eject,
    ClearNotice,
    CursorDown,
    CursorUp,
    JumpToCursor,
    Quit,
}

/// Key bindings. `None` for keys the UI ignores.
pub fn action_for(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }
    let action = match key.code {
        KeyCode::Char('1') => Action::Select(SourceId::Disc),
        KeyCode::Char('2') => Action::Select(SourceId::Bluetooth),
        KeyCode::Char('3') => Action::Select(SourceId::Spotify),
        KeyCode::Char('4') => Action::Select(SourceId::File),
        KeyCode::Char('0') => Action::Deselect,
        KeyCode::Char(' ') | KeyCode::Char('p') => Action::PlayPause,
        KeyCode::Char('x') => Action::Stop,
        KeyCode::Char('l') => Action::Next,
        KeyCode::Char('h') => Action::Prev,
        KeyCode::Char('H') => Action::ScrubBack,
        KeyCode::Char('L') => Action::ScrubForward,
        KeyCode::Char('s') => Action::ToggleShuffle,
        KeyCode::Char('r') => Action::ToggleRepeat,
        KeyCode::Char('e') => Action::Eject,
        KeyCode::Char('c') | KeyCode::Esc => Action::ClearNotice,
        KeyCode::Char('j') | KeyCode::Down => Action::CursorDown,
        KeyCode::Char('k') | KeyCode::Up => Action::CursorUp,
        KeyCode::Enter => Action::JumpToCursor,
        KeyCode::Char('q') => Action::Quit,
        _ => return None,
    };
    Some(action)
}

/// Seek target for a relative scrub, clamped to the track.
pub fn scrub_target(position_ms: u64, duration_ms: u64, delta_ms: i64) -> u64 {
    let target = if delta_ms < 0 {
        position_ms.saturating_sub(delta_ms.unsigned_abs())
    } else {
        position_ms.saturating_add(delta_ms.unsigned_abs())
    };
    if duration_ms > 0 {
        target.min(duration_ms)
    } else {
        target
    }
}

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    tick: Duration,
    last_tick: Option<Instant>,
    /// Row selected in the program list.
    pub cursor: usize,
    /// The notice currently on screen and when it first appeared.
    notice_seen: Option<(Notice, Instant)>,
    last_view: Option<ui::View>,
    force_redraw: bool,
}

impl EventLoopState {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            last_tick: None,
            cursor: 0,
            notice_seen: None,
            last_view: None,
            force_redraw: true,
        }
    }

    fn tick_due(&self, now: Instant) -> bool {
        self.last_tick
            .is_none_or(|last| now.saturating_duration_since(last) >= self.tick)
    }

    /// Clear a notice once its advisory timeout has passed. A notice with no
    /// timeout stays until the user dismisses it.
    pub fn expire_notice(&mut self, controller: &mut SourceController, now: Instant) {
        let notice = controller.notice();
        if !notice.active {
            self.notice_seen = None;
            return;
        }
        match &self.notice_seen {
            Some((seen, since)) if *seen == notice => {
                let lifetime = Duration::from_millis(notice.timeout_ms);
                if notice.timeout_ms > 0 && now.saturating_duration_since(*since) >= lifetime {
                    debug!(text = %notice.text, "notice expired");
                    controller.clear_notice();
                    self.notice_seen = None;
                }
            }
            _ => self.notice_seen = Some((notice, now)),
        }
    }

    fn clamp_cursor(&mut self, program_len: usize) {
        self.cursor = self.cursor.min(program_len.saturating_sub(1));
    }
}

/// Apply one action. Returns true when the app should exit.
pub fn apply(
    action: Action,
    settings: &config::Settings,
    controller: &mut SourceController,
    state: &mut EventLoopState,
) -> bool {
    let scrub_ms = i64::try_from(settings.ui.scrub_seconds.saturating_mul(1_000)).unwrap_or(i64::MAX);
    match action {
        Action::Quit => return true,
        Action::Select(id) => {
            controller.select(id);
            state.cursor = 0;
        }
        Action::Deselect => controller.deselect(),
        Action::PlayPause => {
            if controller.status() == PlaybackStatus::Playing {
                controller.pause();
            } else {
                controller.play();
            }
        }
        Action::Stop => controller.stop(),
        Action::Next => controller.next(),
        Action::Prev => controller.prev(),
        Action::ScrubBack | Action::ScrubForward => {
            let delta = if action == Action::ScrubBack { -scrub_ms } else { scrub_ms };
            let target = scrub_target(controller.position(), controller.track().duration_ms, delta);
            controller.seek(target);
        }
        Action::ToggleShuffle => controller.set_shuffle(!controller.shuffle()),
        Action::ToggleRepeat => controller.set_repeat(!controller.repeat()),
        Action::Eject => controller.eject(),
        Action::ClearNotice => {
            controller.clear_notice();
            state.notice_seen = None;
        }
        Action::CursorDown => {
            state.cursor = state.cursor.saturating_add(1);
            state.clamp_cursor(controller.program().len());
        }
        Action::CursorUp => state.cursor = state.cursor.saturating_sub(1),
        Action::JumpToCursor => {
            if state.cursor < controller.program().len() {
                controller.jump(state.cursor);
            }
        }
    }
    state.force_redraw = true;
    false
}

/// Main terminal event loop: polls the active backend every tick, redraws
/// when what is on screen changed and dispatches key presses. Returns
/// `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    controller: &mut SourceController,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let now = Instant::now();
        if state.tick_due(now) {
            if controller.tick() {
                state.force_redraw = true;
            }
            state.last_tick = Some(now);
            state.expire_notice(controller, now);
        }

        let view = ui::View::capture(controller, state.cursor);
        state.cursor = view.cursor;
        if state.force_redraw || state.last_view.as_ref() != Some(&view) {
            terminal.draw(|f| ui::draw(f, &view, &settings.ui))?;
            state.last_view = Some(view);
            state.force_redraw = false;
        }

        if event::poll(INPUT_POLL.min(state.tick))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(action) = action_for(key) {
                    if apply(action, settings, controller, state) {
                        break;
                    }
                }
            } else {
                state.force_redraw = true;
            }
        }
    }

    Ok(())
}
