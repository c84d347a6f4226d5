//! Playback state holder for HapticPlayer
//!
//! The holder is shared between the player screen and its playback manager.
//! It performs no transition checks: any state may follow any other, and
//! callers own the correctness of the sequence.

use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Playback state of a player screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackState {
    /// The video is playing
    Playing,

    /// Paused by the system (screen backgrounded); resumes on its own
    Paused,

    /// Paused by the user; only the user resumes it
    ManuallyPaused,

    /// Playback completed
    PostPlayback,
}

/// Shared holder of the current [`PlaybackState`]
///
/// Serializable so a host can save and restore it across screen instances.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StateHolder {
    state: Cell<Option<PlaybackState>>,
}

impl StateHolder {
    /// Create a holder with no state set yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the current state
    pub fn set(&self, state: PlaybackState) {
        debug!("Playback state: {:?} -> {:?}", self.state.get(), state);
        self.state.set(Some(state));
    }

    /// Current state, `None` before the first `set`
    pub fn get(&self) -> Option<PlaybackState> {
        self.state.get()
    }

    /// Whether the current state equals `state`
    pub fn is(&self, state: PlaybackState) -> bool {
        self.state.get() == Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_state() -> impl Strategy<Value = PlaybackState> {
        prop_oneof![
            Just(PlaybackState::Playing),
            Just(PlaybackState::Paused),
            Just(PlaybackState::ManuallyPaused),
            Just(PlaybackState::PostPlayback),
        ]
    }

    #[test]
    fn test_unset_holder() {
        let holder = StateHolder::new();
        assert_eq!(holder.get(), None);
        assert!(!holder.is(PlaybackState::Playing));
    }

    #[test]
    fn test_any_transition_is_accepted() {
        let holder = StateHolder::new();
        holder.set(PlaybackState::PostPlayback);
        holder.set(PlaybackState::Playing);
        assert!(holder.is(PlaybackState::Playing));
    }

    #[test]
    fn test_saved_state_round_trip() {
        let holder = StateHolder::new();
        holder.set(PlaybackState::ManuallyPaused);

        let saved = serde_json::to_string(&holder).unwrap();
        assert!(saved.contains("MANUALLY_PAUSED"));

        let restored: StateHolder = serde_json::from_str(&saved).unwrap();
        assert_eq!(restored.get(), Some(PlaybackState::ManuallyPaused));
    }

    proptest! {
        #[test]
        fn prop_get_returns_last_set(states in prop::collection::vec(any_state(), 1..64)) {
            let holder = StateHolder::new();
            for state in &states {
                holder.set(*state);
                prop_assert_eq!(holder.get(), Some(*state));
            }
            prop_assert_eq!(holder.get(), states.last().copied());
        }
    }
}
