use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::event_loop::{Action, EventLoopState, action_for, apply, scrub_target};
use crate::config::Settings;
use crate::controller::SourceController;
use crate::source::{PlaybackStatus, SourceId};
use crate::streaming::{SharedEvents, StreamingSource, StreamingState, apply_event};

fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
}

fn streaming_controller() -> (SourceController, SharedEvents) {
    let shared = StreamingState::shared();
    let mut controller = SourceController::new();
    controller.register(Box::new(StreamingSource::with_events(shared.clone())));
    (controller, shared)
}

#[test]
fn number_keys_select_sources() {
    assert_eq!(action_for(key('1')), Some(Action::Select(SourceId::Disc)));
    assert_eq!(action_for(key('2')), Some(Action::Select(SourceId::Bluetooth)));
    assert_eq!(action_for(key('3')), Some(Action::Select(SourceId::Spotify)));
    assert_eq!(action_for(key('4')), Some(Action::Select(SourceId::File)));
    assert_eq!(action_for(key('0')), Some(Action::Deselect));
}

#[test]
fn playback_keys() {
    assert_eq!(action_for(key(' ')), Some(Action::PlayPause));
    assert_eq!(action_for(key('x')), Some(Action::Stop));
    assert_eq!(action_for(key('H')), Some(Action::ScrubBack));
    assert_eq!(action_for(key('L')), Some(Action::ScrubForward));
    assert_eq!(action_for(key('e')), Some(Action::Eject));
    assert_eq!(
        action_for(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
        Some(Action::JumpToCursor)
    );
    assert_eq!(action_for(key('?')), None);
}

#[test]
fn ctrl_c_quits_and_other_chords_are_ignored() {
    assert_eq!(
        action_for(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        Some(Action::Quit)
    );
    assert_eq!(
        action_for(KeyEvent::new(KeyCode::Char('1'), KeyModifiers::CONTROL)),
        None
    );
}

#[test]
fn scrub_is_clamped_to_track() {
    assert_eq!(scrub_target(3_000, 60_000, -5_000), 0);
    assert_eq!(scrub_target(58_000, 60_000, 5_000), 60_000);
    assert_eq!(scrub_target(10_000, 60_000, 5_000), 15_000);
    assert_eq!(scrub_target(10_000, 0, 5_000), 15_000);
}

#[test]
fn quit_is_the_only_exiting_action() {
    let (mut controller, _shared) = streaming_controller();
    let settings = Settings::default();
    let mut state = EventLoopState::new(Duration::from_millis(250));

    assert!(!apply(Action::Select(SourceId::Spotify), &settings, &mut controller, &mut state));
    assert!(!apply(Action::Deselect, &settings, &mut controller, &mut state));
    assert!(apply(Action::Quit, &settings, &mut controller, &mut state));
}

#[test]
fn selecting_and_controlling_streaming_source() {
    let (mut controller, shared) = streaming_controller();
    let settings = Settings::default();
    let mut state = EventLoopState::new(Duration::from_millis(250));

    apply(Action::Select(SourceId::Spotify), &settings, &mut controller, &mut state);
    assert_eq!(controller.active_id(), Some(SourceId::Spotify));
    assert_eq!(controller.notice().text, "DISCONNECTED");

    {
        let mut s = shared.lock().unwrap();
        let data: HashMap<String, String> = [("event", "playing"), ("position_ms", "1000")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        apply_event(&mut s, &data, Instant::now());
    }
    controller.tick();
    assert_eq!(controller.status(), PlaybackStatus::Playing);

    apply(Action::PlayPause, &settings, &mut controller, &mut state);
    assert_eq!(controller.notice().text, "NOT SUPPORTED");

    apply(Action::ClearNotice, &settings, &mut controller, &mut state);
    assert!(!controller.notice().active);
}

#[test]
fn notices_expire_after_their_timeout() {
    let (mut controller, _shared) = streaming_controller();
    let settings = Settings::default();
    let mut state = EventLoopState::new(Duration::from_millis(250));
    apply(Action::Select(SourceId::Spotify), &settings, &mut controller, &mut state);
    apply(Action::Eject, &settings, &mut controller, &mut state);

    let t0 = Instant::now();
    state.expire_notice(&mut controller, t0);
    state.expire_notice(&mut controller, t0 + Duration::from_millis(2_900));
    assert_eq!(controller.notice().text, "NOT SUPPORTED");

    state.expire_notice(&mut controller, t0 + Duration::from_millis(3_000));
    assert!(!controller.notice().active);
}

#[test]
fn cursor_stays_inside_empty_program() {
    let (mut controller, _shared) = streaming_controller();
    let settings = Settings::default();
    let mut state = EventLoopState::new(Duration::from_millis(250));
    apply(Action::Select(SourceId::Spotify), &settings, &mut controller, &mut state);

    apply(Action::CursorDown, &settings, &mut controller, &mut state);
    apply(Action::JumpToCursor, &settings, &mut controller, &mut state);

    assert_eq!(state.cursor, 0);
    assert_eq!(controller.notice().text, "DISCONNECTED");
}
