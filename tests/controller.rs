// Integration tests (native) for the background music state machine.
// These avoid wasm-specific functionality and exercise the decision core
// against the in-memory store, so they run under `cargo test` on the host.

use cute_page::music::{AudioAction, MusicState, PlayPhase};
use cute_page::store::MemoryStore;

fn fresh() -> (MusicState<MemoryStore>, Vec<AudioAction>) {
    MusicState::new(MemoryStore::new(), true)
}

#[test]
fn construction_applies_default_volume() {
    let (state, actions) = fresh();
    assert_eq!(state.volume(), 0.3);
    assert_eq!(actions, vec![AudioAction::SetVolume(0.3)]);
    assert_eq!(state.phase(), PlayPhase::Idle);
    assert!(!state.is_playing());
}

#[test]
fn volume_clamp_is_idempotent() {
    let (mut state, _) = fresh();
    assert_eq!(state.set_volume(1.7), Some(AudioAction::SetVolume(1.0)));
    assert_eq!(state.volume(), 1.0);
    // Applying the already-clamped value is the same operation again.
    assert_eq!(state.set_volume(1.0), Some(AudioAction::SetVolume(1.0)));
    assert_eq!(state.volume(), 1.0);

    assert_eq!(state.set_volume(-0.2), Some(AudioAction::SetVolume(0.0)));
    assert_eq!(state.volume(), 0.0);

    // NaN carries no level to clamp to and is dropped.
    assert_eq!(state.set_volume(f64::NAN), None);
    assert_eq!(state.volume(), 0.0);
}

#[test]
fn play_then_pause_flags() {
    let (mut state, _) = fresh();
    assert_eq!(state.play(), Some(AudioAction::RequestPlay));
    assert_eq!(state.phase(), PlayPhase::Attempting);
    assert!(!state.is_playing());

    state.play_started();
    assert!(state.is_playing());
    assert_eq!(state.phase(), PlayPhase::Playing);

    assert_eq!(state.pause(), Some(AudioAction::Pause));
    assert!(!state.is_playing());
    assert_eq!(state.phase(), PlayPhase::Idle);
}

#[test]
fn persisted_volume_survives_navigation() {
    let store = MemoryStore::new();
    {
        let (mut state, _) = MusicState::new(&store, true);
        state.set_volume(0.42);
        // The element echoes the applied volume back as a change event.
        state.volume_changed(0.42);
    }
    // Fresh controller on the next page.
    let (state, actions) = MusicState::new(&store, true);
    assert_eq!(state.volume(), 0.42);
    assert!(actions.contains(&AudioAction::SetVolume(0.42)));
}

#[test]
fn checkpoint_roundtrip_resumes_iff_playing() {
    let store = MemoryStore::new();
    {
        let (mut state, _) = MusicState::new(&store, true);
        state.play();
        state.play_started();
        state.checkpoint(12.5);
    }
    let (state, actions) = MusicState::new(&store, true);
    assert_eq!(state.phase(), PlayPhase::Attempting);
    assert_eq!(
        actions,
        vec![
            AudioAction::SetVolume(0.3),
            AudioAction::Seek(12.5),
            AudioAction::RequestPlay,
        ]
    );

    // Paused before the checkpoint: the next page seeks but does not resume.
    {
        let (mut state, _) = MusicState::new(&store, true);
        state.play();
        state.play_started();
        state.pause();
        state.checkpoint(30.0);
    }
    let (state, actions) = MusicState::new(&store, true);
    assert_eq!(state.phase(), PlayPhase::Idle);
    assert!(!actions.contains(&AudioAction::RequestPlay));
    assert!(actions.contains(&AudioAction::Seek(30.0)));
}

#[test]
fn blocked_playback_retries_on_gesture_then_disarms() {
    let (mut state, _) = fresh();
    state.play();

    // First rejection installs the retry listener.
    assert!(state.play_blocked());
    assert_eq!(state.phase(), PlayPhase::Blocked);
    assert!(!state.is_playing());

    // A gesture retries the request; success removes the listener.
    assert_eq!(state.interaction(), Some(AudioAction::RequestPlay));
    assert!(state.play_started());
    assert!(state.is_playing());

    // A second gesture after success retries nothing.
    assert_eq!(state.interaction(), None);
}

#[test]
fn failed_retry_stays_armed_without_duplicate_registration() {
    let (mut state, _) = fresh();
    state.play();
    assert!(state.play_blocked());

    assert_eq!(state.interaction(), Some(AudioAction::RequestPlay));
    // The retry was rejected too: keep the existing registration.
    assert!(!state.play_blocked());

    // The next gesture still works.
    assert_eq!(state.interaction(), Some(AudioAction::RequestPlay));
    assert!(state.play_started());
}

#[test]
fn gesture_during_pending_attempt_is_dropped() {
    let (mut state, _) = fresh();
    state.play();
    assert!(state.play_blocked());

    assert_eq!(state.interaction(), Some(AudioAction::RequestPlay));
    // Outcome still pending: a rapid second gesture issues no second request.
    assert_eq!(state.interaction(), None);
}

#[test]
fn missing_audio_is_inert() {
    let store = MemoryStore::new();
    let (mut state, actions) = MusicState::new(&store, false);
    assert!(actions.is_empty());

    assert_eq!(state.play(), None);
    assert_eq!(state.pause(), None);
    assert_eq!(state.set_volume(0.9), None);
    state.volume_changed(0.9);
    state.checkpoint(5.0);

    // Settings still read their defaults and nothing was written.
    assert_eq!(state.volume(), 0.3);
    assert!(store.is_empty());
}
