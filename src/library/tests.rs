use std::fs;
use std::path::Path;

use tempfile::{TempDir, tempdir};

use super::scan::{is_audio_file, scan};
use super::*;
use crate::audio::EngineState;
use crate::audio::testing::FakeEngine;
use crate::config::LibrarySettings;
use crate::source::{PlaybackStatus, Source, TrackRecord};

fn settings_for(dir: &Path) -> LibrarySettings {
    LibrarySettings {
        music_dir: dir.to_path_buf(),
        ..LibrarySettings::default()
    }
}

/// One second of 8 kHz mono 16-bit silence.
fn write_wav(path: &Path) {
    let data_len: u32 = 16_000;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&8_000u32.to_le_bytes());
    bytes.extend_from_slice(&16_000u32.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(bytes.len() + data_len as usize, 0);
    fs::write(path, bytes).unwrap();
}

fn library_with(names: &[&str]) -> TempDir {
    let dir = tempdir().unwrap();
    for name in names {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"not real audio").unwrap();
    }
    dir
}

fn file_source(dir: &Path, engine: &FakeEngine) -> FileSource {
    FileSource::new(settings_for(dir), Box::new(engine.clone()))
}

#[test]
fn audio_extensions_match_case_insensitively() {
    let settings = LibrarySettings {
        extensions: vec![".FLAC".to_string(), "mp3".to_string(), " ".to_string()],
        ..LibrarySettings::default()
    };
    assert!(is_audio_file(Path::new("/m/a.flac"), &settings));
    assert!(is_audio_file(Path::new("/m/a.MP3"), &settings));
    assert!(!is_audio_file(Path::new("/m/a.ogg"), &settings));
    assert!(!is_audio_file(Path::new("/m/noext"), &settings));
}

#[test]
fn scan_orders_by_path_and_skips_hidden_and_foreign_files() {
    let dir = library_with(&[
        "B Album/02 second.mp3",
        "B Album/01 first.MP3",
        "a single.ogg",
        ".hidden/secret.mp3",
        ".dot.mp3",
        "cover.jpg",
    ]);

    let tracks = scan(&settings_for(dir.path()));

    let titles: Vec<&str> = tracks.iter().map(|t| t.record.title.as_str()).collect();
    assert_eq!(titles, vec!["a single", "01 first", "02 second"]);
    let indices: Vec<u32> = tracks.iter().map(|t| t.record.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(tracks[0].record.codec, "OGG");
    assert_eq!(tracks[0].record.duration_ms, 0);
}

#[test]
fn scan_can_stay_in_the_top_directory() {
    let dir = library_with(&["top.mp3", "sub/deep.mp3"]);
    let settings = LibrarySettings {
        recursive: false,
        ..settings_for(dir.path())
    };

    let tracks = scan(&settings);

    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].record.title, "top");
}

#[test]
fn scan_of_missing_directory_is_empty() {
    let dir = tempdir().unwrap();
    assert!(scan(&settings_for(&dir.path().join("absent"))).is_empty());
}

#[test]
fn wav_properties_fill_the_record() {
    let dir = tempdir().unwrap();
    write_wav(&dir.path().join("tone.wav"));

    let tracks = scan(&settings_for(dir.path()));

    assert_eq!(tracks.len(), 1);
    let record = &tracks[0].record;
    assert_eq!(record.title, "tone");
    assert_eq!(record.codec, "WAV");
    assert_eq!(record.sample_rate_hz, 8_000);
    assert!(record.duration_ms > 0);
}

#[test]
fn load_hands_the_program_to_the_engine() {
    let dir = library_with(&["a.mp3", "b.mp3"]);
    let engine = FakeEngine::default();
    let mut files = file_source(dir.path(), &engine);

    files.load();

    assert!(files.is_loaded());
    assert_eq!(files.status(), PlaybackStatus::Stopped);
    assert_eq!(files.track().title, "a");
    assert_eq!(files.program().len(), 2);
    let items = engine.items();
    assert_eq!(items.len(), 2);
    assert!(items[1].location.ends_with("b.mp3"));
    assert!(!files.notice().active);
}

#[test]
fn empty_library_loads_with_notice() {
    let dir = tempdir().unwrap();
    let engine = FakeEngine::default();
    let mut files = file_source(dir.path(), &engine);

    files.load();

    assert!(files.is_loaded());
    assert_eq!(files.track(), TrackRecord::EMPTY);
    assert_eq!(files.notice().text, "NO FILES");
    assert!(files.program().is_empty());
}

#[test]
fn reload_picks_up_new_files() {
    let dir = library_with(&["a.mp3"]);
    let engine = FakeEngine::default();
    let mut files = file_source(dir.path(), &engine);
    files.load();

    fs::write(dir.path().join("b.mp3"), b"not real audio").unwrap();
    files.load();

    assert_eq!(files.program().len(), 2);
    assert_eq!(engine.calls().iter().filter(|c| *c == "clear").count(), 1);
}

#[test]
fn poll_follows_the_engine() {
    let dir = library_with(&["a.mp3", "b.mp3"]);
    let engine = FakeEngine::default();
    let mut files = file_source(dir.path(), &engine);
    files.load();

    engine.set_snapshot(EngineState::Playing, Some(1), 2_000);
    assert!(!files.poll());
    assert_eq!(files.status(), PlaybackStatus::Playing);
    assert_eq!(files.track().title, "b");
    assert_eq!(files.position(), 2_000);

    engine.set_snapshot(EngineState::Error, Some(1), 0);
    files.poll();
    assert_eq!(files.status(), PlaybackStatus::Error);
    assert_eq!(files.notice().text, "ERROR");
}

#[test]
fn prev_restarts_a_track_that_has_been_playing_a_while() {
    let dir = library_with(&["a.mp3", "b.mp3"]);
    let engine = FakeEngine::default();
    let mut files = file_source(dir.path(), &engine);
    files.load();

    engine.set_snapshot(EngineState::Playing, Some(1), 12_000);
    files.prev();
    engine.set_snapshot(EngineState::Playing, Some(1), 3_000);
    files.prev();

    let calls = engine.calls();
    assert!(calls.contains(&"position:0.00".to_string()));
    assert_eq!(calls.last().map(String::as_str), Some("previous"));
}

#[test]
fn seek_needs_a_known_length() {
    let dir = library_with(&["unknown.mp3"]);
    write_wav(&dir.path().join("z tone.wav"));
    let engine = FakeEngine::default();
    let mut files = file_source(dir.path(), &engine);
    files.load();

    engine.set_snapshot(EngineState::Playing, Some(0), 0);
    files.seek(500);
    assert!(!engine.calls().iter().any(|c| c.starts_with("position:")));

    engine.set_snapshot(EngineState::Playing, Some(1), 0);
    files.seek(60_000);
    assert!(engine.calls().contains(&"position:1.00".to_string()));
}

#[test]
fn jump_stays_inside_the_program() {
    let dir = library_with(&["a.mp3", "b.mp3"]);
    let engine = FakeEngine::default();
    let mut files = file_source(dir.path(), &engine);
    files.load();

    files.jump(1);
    files.jump(2);

    let calls = engine.calls();
    assert!(calls.contains(&"jump:1".to_string()));
    assert!(!calls.contains(&"jump:2".to_string()));
}

#[test]
fn modes_survive_a_reload_and_eject_is_not_supported() {
    let dir = library_with(&["a.mp3"]);
    let engine = FakeEngine::default();
    let mut files = file_source(dir.path(), &engine);
    files.set_shuffle(true);
    files.set_repeat(true);

    files.load();
    files.eject();

    assert!(files.shuffle());
    assert!(files.repeat());
    assert_eq!(files.notice().text, "NOT SUPPORTED");
    let calls = engine.calls();
    let after_load = &calls[calls.iter().position(|c| c == "set_items").unwrap()..];
    assert!(after_load.contains(&"looping:true".to_string()));
    assert!(after_load.contains(&"shuffle:true".to_string()));
}

#[test]
fn controls_before_load_do_nothing_and_unload_resets() {
    let dir = library_with(&["a.mp3"]);
    let engine = FakeEngine::default();
    let mut files = file_source(dir.path(), &engine);

    files.play();
    files.next();
    files.prev();
    assert!(engine.calls().is_empty());

    files.load();
    files.unload();

    assert!(!files.is_loaded());
    assert_eq!(files.status(), PlaybackStatus::Idle);
    assert_eq!(files.track(), TrackRecord::EMPTY);
    assert_eq!(files.position(), 0);
    assert!(files.program().is_empty());
}
