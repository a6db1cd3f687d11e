use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::*;
use crate::source::{PlaybackStatus, Source, TrackRecord};

fn event(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn deliver(shared: &SharedEvents, pairs: &[(&str, &str)]) -> bool {
    let mut state = shared.lock().unwrap();
    apply_event(&mut state, &event(pairs), Instant::now())
}

fn track_changed(name: &str, duration_ms: &str) -> Vec<(&'static str, String)> {
    vec![
        ("event", "track_changed".to_string()),
        ("name", name.to_string()),
        ("artists", "Band".to_string()),
        ("album", "Record".to_string()),
        ("number", "4".to_string()),
        ("duration_ms", duration_ms.to_string()),
        ("item_type", "Track".to_string()),
    ]
}

fn deliver_owned(shared: &SharedEvents, pairs: Vec<(&'static str, String)>) {
    let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
    assert!(deliver(shared, &borrowed));
}

#[test]
fn track_changed_builds_record() {
    let mut state = StreamingState::disconnected(Instant::now());
    let pairs = track_changed("Song", "210000");
    let data: HashMap<String, String> = pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    assert!(apply_event(&mut state, &data, Instant::now()));

    assert!(state.connected);
    assert_eq!(state.track.title, "Song");
    assert_eq!(state.track.artist, "Band");
    assert_eq!(state.track.album, "Record");
    assert_eq!(state.track.index, 4);
    assert_eq!(state.track.duration_ms, 210_000);
    assert_eq!(state.track.bitrate_bps, 320_000);
    assert_eq!(state.track.sample_rate_hz, 44_100);
    assert_eq!(state.track.codec, "");
}

#[test]
fn episodes_use_show_name_and_drop_album() {
    let mut state = StreamingState::disconnected(Instant::now());
    let data = event(&[
        ("event", "track_changed"),
        ("item_type", "Episode"),
        ("name", "Episode 12"),
        ("show_name", "The Show"),
        ("album", "ignored"),
        ("artists", "ignored"),
        ("number", "12"),
        ("duration_ms", "3600000"),
    ]);

    apply_event(&mut state, &data, Instant::now());

    assert_eq!(state.track.artist, "The Show");
    assert_eq!(state.track.album, "");
    assert_eq!(state.track.index, 0);
    assert_eq!(state.track.title, "Episode 12");
}

#[test]
fn unknown_events_are_ignored() {
    let mut state = StreamingState::disconnected(Instant::now());
    let before = state.clone();

    assert!(!apply_event(&mut state, &event(&[("event", "volume_changed")]), Instant::now()));
    assert!(!apply_event(&mut state, &event(&[("name", "no event key")]), Instant::now()));

    assert_eq!(state, before);
}

#[test]
fn malformed_numbers_default_to_zero() {
    let mut state = StreamingState::disconnected(Instant::now());
    let data = event(&[("event", "paused"), ("position_ms", "soon")]);
    apply_event(&mut state, &data, Instant::now());
    assert_eq!(state.position_ms, 0);
    assert_eq!(state.status, PlaybackStatus::Paused);
}

#[test]
fn position_extrapolates_while_playing() {
    let t0 = Instant::now();
    let mut state = StreamingState::disconnected(t0);
    apply_event(
        &mut state,
        &event(&[("event", "playing"), ("position_ms", "10000")]),
        t0,
    );

    let later = t0 + Duration::from_millis(1_500);
    assert_eq!(state.position_at(later), 11_500);

    apply_event(
        &mut state,
        &event(&[("event", "paused"), ("position_ms", "11600")]),
        later,
    );
    assert_eq!(state.position_at(later + Duration::from_secs(10)), 11_600);
}

#[test]
fn stopped_freezes_extrapolated_position() {
    let t0 = Instant::now();
    let mut state = StreamingState::disconnected(t0);
    apply_event(
        &mut state,
        &event(&[("event", "playing"), ("position_ms", "0")]),
        t0,
    );
    let t1 = t0 + Duration::from_millis(800);
    apply_event(&mut state, &event(&[("event", "stopped")]), t1);

    assert_eq!(state.status, PlaybackStatus::Stopped);
    assert_eq!(state.position_at(t1 + Duration::from_secs(5)), 800);
}

#[test]
fn position_is_capped_by_duration() {
    let t0 = Instant::now();
    let mut state = StreamingState::disconnected(t0);
    let mut data = event(&[("event", "track_changed"), ("name", "Short")]);
    data.insert("duration_ms".to_string(), "1000".to_string());
    apply_event(&mut state, &data, t0);
    apply_event(
        &mut state,
        &event(&[("event", "playing"), ("position_ms", "900")]),
        t0,
    );
    assert_eq!(state.position_at(t0 + Duration::from_secs(3)), 1_000);
}

#[test]
fn load_before_any_event_reports_disconnected() {
    let shared = StreamingState::shared();
    let mut spotify = StreamingSource::with_events(shared);

    spotify.load();

    assert!(spotify.is_loaded());
    assert_eq!(spotify.track(), TrackRecord::EMPTY);
    assert_eq!(spotify.status(), PlaybackStatus::Stopped);
    assert_eq!(spotify.notice().text, "DISCONNECTED");
}

#[test]
fn poll_signals_redraw_when_session_connects() {
    let shared = StreamingState::shared();
    let mut spotify = StreamingSource::with_events(shared.clone());
    spotify.load();
    assert!(!spotify.poll());

    deliver(&shared, &[("event", "session_connected")]);
    assert!(spotify.poll());
    assert_eq!(spotify.notice().text, "CONNECTED");
    assert!(!spotify.poll());

    deliver_owned(&shared, track_changed("Song", "200000"));
    assert!(!spotify.poll());
    assert_eq!(spotify.track().title, "Song");
}

#[test]
fn session_disconnected_resets_within_one_poll() {
    let shared = StreamingState::shared();
    let mut spotify = StreamingSource::with_events(shared.clone());
    spotify.load();

    deliver_owned(&shared, track_changed("Song", "200000"));
    deliver(&shared, &[("event", "shuffle_changed"), ("shuffle", "true")]);
    deliver(&shared, &[("event", "repeat_changed"), ("repeat", "true")]);
    deliver(&shared, &[("event", "playing"), ("position_ms", "5000")]);
    spotify.poll();
    assert_eq!(spotify.status(), PlaybackStatus::Playing);
    assert!(spotify.shuffle());
    assert!(spotify.repeat());
    assert!(spotify.position() >= 5_000);

    deliver(&shared, &[("event", "session_disconnected")]);
    spotify.poll();

    assert_eq!(spotify.status(), PlaybackStatus::Stopped);
    assert_eq!(spotify.track(), TrackRecord::EMPTY);
    assert!(!spotify.shuffle());
    assert!(!spotify.repeat());
    assert_eq!(spotify.position(), 0);
    assert_eq!(spotify.notice().text, "DISCONNECTED");
}

#[test]
fn zero_duration_track_is_no_metadata() {
    let shared = StreamingState::shared();
    let mut spotify = StreamingSource::with_events(shared.clone());
    deliver_owned(&shared, track_changed("Live Stream", "0"));

    spotify.load();

    assert_eq!(spotify.track(), TrackRecord::EMPTY);
    assert_eq!(spotify.notice().text, "CONNECTED");
}

#[test]
fn every_control_is_not_supported() {
    let shared = StreamingState::shared();
    let mut spotify = StreamingSource::with_events(shared);
    spotify.load();

    let controls: [fn(&mut StreamingSource); 10] = [
        |s| s.play(),
        |s| s.stop(),
        |s| s.pause(),
        |s| s.next(),
        |s| s.prev(),
        |s| s.seek(1_000),
        |s| s.jump(0),
        |s| s.set_shuffle(true),
        |s| s.set_repeat(true),
        |s| s.eject(),
    ];
    for control in controls {
        spotify.clear_notice();
        control(&mut spotify);
        let notice = spotify.notice();
        assert!(notice.active);
        assert_eq!(notice.text, "NOT SUPPORTED");
        assert_eq!(notice.timeout_ms, 3_000);
    }
    assert!(!spotify.shuffle());
}

#[test]
fn events_after_unload_are_picked_up_on_reload() {
    let shared = StreamingState::shared();
    let mut spotify = StreamingSource::with_events(shared.clone());
    spotify.load();
    spotify.unload();

    deliver_owned(&shared, track_changed("Queued", "120000"));
    assert!(!spotify.poll());
    assert_eq!(spotify.track(), TrackRecord::EMPTY);

    spotify.load();
    assert_eq!(spotify.track().title, "Queued");
    assert_eq!(spotify.status(), PlaybackStatus::Stopped);
}
