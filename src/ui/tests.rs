use ratatui::{Terminal, backend::TestBackend};

use super::*;

fn record(index: u32, title: &str, duration_ms: u64) -> TrackRecord {
    TrackRecord {
        index,
        artist: "Band".to_string(),
        album: "Record".to_string(),
        title: title.to_string(),
        duration_ms,
        codec: "PCM".to_string(),
        bitrate_bps: 1_411_000,
        ..TrackRecord::EMPTY
    }
}

fn idle_view() -> View {
    View {
        sources: SourceId::ALL.to_vec(),
        active: None,
        status: PlaybackStatus::Idle,
        track: TrackRecord::EMPTY,
        position_secs: 0,
        shuffle: false,
        repeat: false,
        notice: Notice::none(),
        program: Vec::new(),
        cursor: 0,
    }
}

fn render(view: &View) -> String {
    let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
    terminal
        .draw(|f| draw(f, view, &UiSettings::default()))
        .unwrap();
    terminal
        .backend()
        .buffer()
        .content
        .iter()
        .map(|cell| cell.symbol())
        .collect()
}

#[test]
fn mmss_formatting() {
    assert_eq!(format_mmss(0), "00:00");
    assert_eq!(format_mmss(61_999), "01:01");
    assert_eq!(format_mmss(3_600_000), "60:00");
}

#[test]
fn track_text_skips_unknown_parts() {
    assert_eq!(track_text(&TrackRecord::EMPTY), "-");
    assert_eq!(track_text(&record(3, "Song", 1_000)), "03. Band - Song");

    let bare = TrackRecord {
        title: "Only Title".to_string(),
        duration_ms: 1_000,
        ..TrackRecord::EMPTY
    };
    assert_eq!(track_text(&bare), "Only Title");
}

#[test]
fn quality_text_lists_known_fields() {
    assert_eq!(quality_text(&record(1, "Song", 1_000)), "PCM 44.1 kHz 1411 kbps");
    assert_eq!(quality_text(&TrackRecord::EMPTY), "44.1 kHz");
}

#[test]
fn controls_text_includes_scrub_seconds() {
    let text = controls_text(7);
    assert!(text.contains("[H/L] scrub -/+7s"));
    assert!(text.starts_with("[1-4] disc/bluetooth/spotify/file"));
    assert!(text.ends_with("[q] quit"));
}

#[test]
fn source_keys_are_distinct() {
    let keys: Vec<char> = SourceId::ALL.iter().map(|&id| source_key(id)).collect();
    assert_eq!(keys, vec!['1', '2', '3', '4']);
}

#[test]
fn idle_screen_shows_sources_and_no_track() {
    let screen = render(&idle_view());
    assert!(screen.contains("[1] disc"));
    assert!(screen.contains("[3] spotify"));
    assert!(screen.contains("[4] file"));
    assert!(screen.contains("SOURCE: none"));
    assert!(screen.contains("IDLE"));
}

#[test]
fn playing_screen_shows_track_notice_and_program() {
    let view = View {
        active: Some(SourceId::Disc),
        status: PlaybackStatus::Playing,
        track: record(2, "Second", 125_000),
        position_secs: 65,
        notice: Notice::new("EJECTING...", 0),
        program: vec![record(1, "First", 60_000), record(2, "Second", 125_000)],
        cursor: 1,
        ..idle_view()
    };

    let screen = render(&view);

    assert!(screen.contains("SOURCE: disc"));
    assert!(screen.contains("PLAYING"));
    assert!(screen.contains("02. Band - Second"));
    assert!(screen.contains("01:05 / 02:05"));
    assert!(screen.contains("EJECTING..."));
    assert!(screen.contains(" 1. First  01:00"));
    assert!(screen.contains("▶  2. Second  02:05"));
}
