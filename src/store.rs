//! Persisted scalar settings for the background music controller.
//!
//! Each field lives under its own string key in origin-scoped storage
//! (browser `localStorage`), stored as plain stringified scalars. Parsing
//! falls back to a per-field default when the stored text is missing or
//! malformed, so a bad value can never fail controller construction. Keys
//! have independent lifecycles; nothing links them transactionally.

use std::cell::RefCell;
use std::collections::HashMap;

// --- Keys & defaults ---------------------------------------------------------

pub const VOLUME_KEY: &str = "cuteTestVolume";
pub const PLAYING_KEY: &str = "cuteTestMusicPlaying";
pub const POSITION_KEY: &str = "cuteTestCurrentTime";

/// Volume applied when nothing usable has been stored yet.
pub const DEFAULT_VOLUME: f64 = 0.3;

// --- Store abstraction -------------------------------------------------------

/// String key-value backend the settings persist in. Writes are best-effort:
/// a backend that cannot store (quota, storage disabled) drops them silently.
pub trait ScalarStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str);
}

impl<S: ScalarStore + ?Sized> ScalarStore for &S {
    fn read(&self, key: &str) -> Option<String> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) {
        (**self).write(key, value)
    }
}

/// In-memory backend for host tests and pages with storage disabled.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl ScalarStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

/// Browser `localStorage` backend. `open()` tolerates storage being disabled
/// or denied; reads then yield defaults and writes are dropped.
pub struct LocalStore {
    storage: Option<web_sys::Storage>,
}

impl LocalStore {
    pub fn open() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        Self { storage }
    }
}

impl ScalarStore for LocalStore {
    fn read(&self, key: &str) -> Option<String> {
        self.storage
            .as_ref()
            .and_then(|s| s.get_item(key).ok().flatten())
    }

    fn write(&self, key: &str, value: &str) {
        if let Some(s) = &self.storage {
            let _ = s.set_item(key, value);
        }
    }
}

// --- Field contracts ---------------------------------------------------------

/// Snapshot of everything the previous page left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPlayback {
    pub volume: f64,
    pub was_playing: bool,
    pub position: Option<f64>,
}

pub fn load_saved<S: ScalarStore>(store: &S) -> SavedPlayback {
    SavedPlayback {
        volume: parse_volume(store.read(VOLUME_KEY)),
        was_playing: parse_flag(store.read(PLAYING_KEY)),
        position: parse_position(store.read(POSITION_KEY)),
    }
}

pub fn save_volume<S: ScalarStore>(store: &S, volume: f64) {
    store.write(VOLUME_KEY, &volume.to_string());
}

/// Written on page teardown: one synchronous best-effort pass, no retry.
pub fn save_checkpoint<S: ScalarStore>(store: &S, playing: bool, position: f64) {
    store.write(PLAYING_KEY, if playing { "true" } else { "false" });
    store.write(POSITION_KEY, &position.to_string());
}

fn parse_volume(raw: Option<String>) -> f64 {
    raw.and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        // The element setter faults outside [0,1]; clamp strays instead of resetting.
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_VOLUME)
}

/// Only the exact string "true" counts as a set flag.
fn parse_flag(raw: Option<String>) -> bool {
    raw.as_deref() == Some("true")
}

fn parse_position(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.parse::<f64>().ok())
        .filter(|p| p.is_finite())
}
