//! Background music that keeps playing across page navigations.
//!
//! The decision logic lives in [`MusicState`], which never touches the DOM:
//! every operation returns the [`AudioAction`]s the caller must apply to the
//! real element, so the whole state machine runs under host `cargo test`.
//! [`BackgroundMusic`] is the wasm glue that owns the `<audio>` element,
//! applies those actions, and feeds DOM events back in.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Document, HtmlAudioElement};

use crate::store::{self, LocalStore, ScalarStore};

/// Id the page-level audio element is looked up by.
pub const AUDIO_ELEMENT_ID: &str = "background-music";

/// Gesture channels a blocked play request listens on.
const POINTER_EVENT: &str = "click";
const TOUCH_EVENT: &str = "touchstart";

// --- Decision core -----------------------------------------------------------

/// Play-request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayPhase {
    /// Constructed or paused; no attempt in flight.
    Idle,
    /// A play request was issued and its outcome is still pending.
    Attempting,
    Playing,
    /// The platform rejected the request; waiting for a user gesture.
    Blocked,
}

/// Something the glue must apply to the audio element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioAction {
    SetVolume(f64),
    Seek(f64),
    RequestPlay,
    Pause,
}

/// Volume / playing / phase state machine, generic over the settings backend.
///
/// `has_audio` mirrors whether the page actually carries the audio element;
/// without it every operation is a silent no-op and nothing is persisted.
pub struct MusicState<S: ScalarStore> {
    store: S,
    volume: f64,
    playing: bool,
    phase: PlayPhase,
    retry_armed: bool,
    has_audio: bool,
}

impl<S: ScalarStore> MusicState<S> {
    /// Load persisted settings and produce the actions that bring the element
    /// in line: apply the remembered volume, seek to the remembered position,
    /// and resume playback iff it was playing when the previous page unloaded.
    pub fn new(store: S, has_audio: bool) -> (Self, Vec<AudioAction>) {
        let saved = store::load_saved(&store);
        let mut actions = Vec::new();
        let mut phase = PlayPhase::Idle;
        if has_audio {
            actions.push(AudioAction::SetVolume(saved.volume));
            if let Some(position) = saved.position {
                actions.push(AudioAction::Seek(position));
            }
            if saved.was_playing {
                actions.push(AudioAction::RequestPlay);
                phase = PlayPhase::Attempting;
            }
        }
        let state = Self {
            store,
            volume: saved.volume,
            playing: false,
            phase,
            retry_armed: false,
            has_audio,
        };
        (state, actions)
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn phase(&self) -> PlayPhase {
        self.phase
    }

    /// Request playback. Completion is asynchronous: the glue reports the
    /// outcome through [`MusicState::play_started`] / [`MusicState::play_blocked`].
    pub fn play(&mut self) -> Option<AudioAction> {
        if !self.has_audio {
            return None;
        }
        self.phase = PlayPhase::Attempting;
        Some(AudioAction::RequestPlay)
    }

    /// Stop playback immediately. Never fails; an armed retry stays armed
    /// (there is no external cancellation).
    pub fn pause(&mut self) -> Option<AudioAction> {
        if !self.has_audio {
            return None;
        }
        self.playing = false;
        self.phase = PlayPhase::Idle;
        Some(AudioAction::Pause)
    }

    /// Clamp `level` into [0, 1] and apply it. NaN carries no usable level
    /// and is ignored.
    pub fn set_volume(&mut self, level: f64) -> Option<AudioAction> {
        if !self.has_audio || level.is_nan() {
            return None;
        }
        let level = level.clamp(0.0, 1.0);
        self.volume = level;
        Some(AudioAction::SetVolume(level))
    }

    /// A play request resolved. Returns true when the retry listener was
    /// armed and must now be removed from both gesture channels.
    pub fn play_started(&mut self) -> bool {
        self.playing = true;
        self.phase = PlayPhase::Playing;
        std::mem::take(&mut self.retry_armed)
    }

    /// A play request was rejected by the platform. Returns true when a retry
    /// listener must be installed; false when one is already waiting.
    pub fn play_blocked(&mut self) -> bool {
        self.phase = PlayPhase::Blocked;
        if self.retry_armed {
            false
        } else {
            self.retry_armed = true;
            true
        }
    }

    /// A qualifying user gesture arrived. Retries the blocked request unless
    /// nothing is armed or an attempt is already in flight.
    pub fn interaction(&mut self) -> Option<AudioAction> {
        if !self.retry_armed || self.phase == PlayPhase::Attempting {
            return None;
        }
        self.phase = PlayPhase::Attempting;
        Some(AudioAction::RequestPlay)
    }

    /// The element reported a volume change; remember and persist it.
    pub fn volume_changed(&mut self, actual: f64) {
        if !self.has_audio {
            return;
        }
        self.volume = actual;
        store::save_volume(&self.store, actual);
    }

    /// Page teardown: persist the playing flag and the playback position.
    pub fn checkpoint(&mut self, position: f64) {
        if !self.has_audio {
            return;
        }
        store::save_checkpoint(&self.store, self.playing, position);
    }
}

// --- DOM glue ----------------------------------------------------------------

struct MusicInner {
    state: RefCell<MusicState<LocalStore>>,
    audio: Option<HtmlAudioElement>,
    /// Armed retry closure; `None` while no retry is registered. Registered
    /// on both gesture channels and dropped only after a retry succeeds.
    retry: RefCell<Option<Closure<dyn FnMut()>>>,
}

/// Page-level background music controller: one per page, owned by whoever
/// called [`crate::enhance_page`].
#[wasm_bindgen]
pub struct BackgroundMusic {
    inner: Rc<MusicInner>,
    _volume_hook: Option<Closure<dyn FnMut()>>,
    _unload_hook: Option<Closure<dyn FnMut()>>,
}

impl BackgroundMusic {
    /// Locate the page audio element and wire the controller to it. A page
    /// without the element still yields a working (inert) controller.
    pub fn attach(document: &Document) -> Result<BackgroundMusic, JsValue> {
        let audio = document
            .get_element_by_id(AUDIO_ELEMENT_ID)
            .and_then(|el| el.dyn_into::<HtmlAudioElement>().ok());
        let (state, actions) = MusicState::new(LocalStore::open(), audio.is_some());
        let inner = Rc::new(MusicInner {
            state: RefCell::new(state),
            audio,
            retry: RefCell::new(None),
        });

        let mut volume_hook = None;
        let mut unload_hook = None;
        if let Some(audio) = &inner.audio {
            // Persist the volume whenever the element reports a change.
            let hook = {
                let inner = inner.clone();
                Closure::wrap(Box::new(move || {
                    if let Some(audio) = &inner.audio {
                        inner.state.borrow_mut().volume_changed(audio.volume());
                    }
                }) as Box<dyn FnMut()>)
            };
            audio.add_event_listener_with_callback("volumechange", hook.as_ref().unchecked_ref())?;
            volume_hook = Some(hook);

            // Final synchronous write just before the page is torn down.
            let hook = {
                let inner = inner.clone();
                Closure::wrap(Box::new(move || {
                    if let Some(audio) = &inner.audio {
                        inner.state.borrow_mut().checkpoint(audio.current_time());
                    }
                }) as Box<dyn FnMut()>)
            };
            window()?
                .add_event_listener_with_callback("beforeunload", hook.as_ref().unchecked_ref())?;
            unload_hook = Some(hook);
        }

        for action in actions {
            apply_action(&inner, action);
        }

        Ok(BackgroundMusic {
            inner,
            _volume_hook: volume_hook,
            _unload_hook: unload_hook,
        })
    }
}

#[wasm_bindgen]
impl BackgroundMusic {
    pub fn play(&self) {
        let action = self.inner.state.borrow_mut().play();
        if let Some(action) = action {
            apply_action(&self.inner, action);
        }
    }

    pub fn pause(&self) {
        let action = self.inner.state.borrow_mut().pause();
        if let Some(action) = action {
            apply_action(&self.inner, action);
        }
    }

    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, level: f64) {
        let action = self.inner.state.borrow_mut().set_volume(level);
        if let Some(action) = action {
            apply_action(&self.inner, action);
        }
    }

    pub fn volume(&self) -> f64 {
        self.inner.state.borrow().volume()
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.inner.state.borrow().is_playing()
    }
}

fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

fn apply_action(inner: &Rc<MusicInner>, action: AudioAction) {
    let Some(audio) = &inner.audio else { return };
    match action {
        AudioAction::SetVolume(level) => audio.set_volume(level),
        AudioAction::Seek(position) => audio.set_current_time(position),
        AudioAction::Pause => {
            let _ = audio.pause();
        }
        AudioAction::RequestPlay => request_play(inner),
    }
}

/// Issue the element play request and route its asynchronous outcome back
/// into the state machine.
fn request_play(inner: &Rc<MusicInner>) {
    let Some(audio) = &inner.audio else { return };
    match audio.play() {
        Ok(promise) => {
            let inner = inner.clone();
            spawn_local(async move {
                match JsFuture::from(promise).await {
                    Ok(_) => on_play_started(&inner),
                    Err(_) => on_play_blocked(&inner),
                }
            });
        }
        // Some engines throw synchronously instead of rejecting the promise.
        Err(_) => on_play_blocked(inner),
    }
}

fn on_play_started(inner: &Rc<MusicInner>) {
    web_sys::console::log_1(&"Background music started playing".into());
    if inner.state.borrow_mut().play_started() {
        disarm_retry(inner);
    }
}

fn on_play_blocked(inner: &Rc<MusicInner>) {
    web_sys::console::log_1(&"Autoplay prevented. User interaction required.".into());
    if inner.state.borrow_mut().play_blocked() {
        arm_retry(inner);
    }
}

/// Register one closure on both gesture channels. The state machine
/// guarantees this runs at most once per blocked period.
fn arm_retry(inner: &Rc<MusicInner>) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let handler = {
        let inner = inner.clone();
        Closure::wrap(Box::new(move || {
            let action = inner.state.borrow_mut().interaction();
            if let Some(action) = action {
                apply_action(&inner, action);
            }
        }) as Box<dyn FnMut()>)
    };
    for event in [POINTER_EVENT, TOUCH_EVENT] {
        let _ = document.add_event_listener_with_callback(event, handler.as_ref().unchecked_ref());
    }
    *inner.retry.borrow_mut() = Some(handler);
}

/// Remove the retry closure from both gesture channels and drop it.
fn disarm_retry(inner: &Rc<MusicInner>) {
    let Some(handler) = inner.retry.borrow_mut().take() else {
        return;
    };
    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
        for event in [POINTER_EVENT, TOUCH_EVENT] {
            let _ =
                document.remove_event_listener_with_callback(event, handler.as_ref().unchecked_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_construct_idle_without_saved_flag() {
        let (state, actions) = MusicState::new(MemoryStore::new(), true);
        assert_eq!(state.phase(), PlayPhase::Idle);
        assert_eq!(actions, vec![AudioAction::SetVolume(0.3)]);
    }

    #[test]
    fn test_blocked_then_gesture_retries_once() {
        let (mut state, _) = MusicState::new(MemoryStore::new(), true);
        assert_eq!(state.play(), Some(AudioAction::RequestPlay));
        assert!(state.play_blocked());
        assert_eq!(state.interaction(), Some(AudioAction::RequestPlay));
        // Attempt in flight: another gesture issues nothing.
        assert_eq!(state.interaction(), None);
        assert!(state.play_started());
        assert_eq!(state.interaction(), None);
    }

    #[test]
    fn test_failed_retry_keeps_listener_armed() {
        let (mut state, _) = MusicState::new(MemoryStore::new(), true);
        state.play();
        assert!(state.play_blocked());
        state.interaction();
        // Second rejection: the existing registration is reused, not doubled.
        assert!(!state.play_blocked());
        assert_eq!(state.interaction(), Some(AudioAction::RequestPlay));
    }
}
