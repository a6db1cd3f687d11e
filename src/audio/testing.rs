//! In-memory engine for backend tests.

use std::sync::{Arc, Mutex};

use super::{EngineSnapshot, EngineState, MediaEngine, PlayableItem};

#[derive(Default)]
pub struct EngineLog {
    pub items: Vec<PlayableItem>,
    pub calls: Vec<String>,
    pub snapshot: EngineSnapshot,
}

/// Records every call; the snapshot is whatever the test last set.
#[derive(Clone, Default)]
pub struct FakeEngine(pub Arc<Mutex<EngineLog>>);

impl FakeEngine {
    fn call(&self, name: impl Into<String>) {
        self.0.lock().unwrap().calls.push(name.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().calls.clone()
    }

    pub fn items(&self) -> Vec<PlayableItem> {
        self.0.lock().unwrap().items.clone()
    }

    pub fn set_snapshot(&self, state: EngineState, index: Option<usize>, position_ms: u64) {
        self.0.lock().unwrap().snapshot = EngineSnapshot {
            state,
            index,
            position_ms,
        };
    }
}

impl MediaEngine for FakeEngine {
    fn set_items(&mut self, items: Vec<PlayableItem>) {
        self.0.lock().unwrap().items = items;
        self.call("set_items");
    }
    fn clear(&mut self) {
        self.0.lock().unwrap().items.clear();
        self.call("clear");
    }
    fn play(&mut self) {
        self.call("play");
    }
    fn pause(&mut self) {
        self.call("pause");
    }
    fn stop(&mut self) {
        self.call("stop");
    }
    fn next(&mut self) {
        self.call("next");
    }
    fn previous(&mut self) {
        self.call("previous");
    }
    fn jump_to(&mut self, index: usize) {
        self.call(format!("jump:{index}"));
    }
    fn set_position(&mut self, fraction: f64) {
        self.call(format!("position:{fraction:.2}"));
    }
    fn set_looping(&mut self, enabled: bool) {
        self.call(format!("looping:{enabled}"));
    }
    fn set_shuffle(&mut self, enabled: bool) {
        self.call(format!("shuffle:{enabled}"));
    }
    fn snapshot(&self) -> EngineSnapshot {
        self.0.lock().unwrap().snapshot.clone()
    }
}
