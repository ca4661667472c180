use crate::config::ConfigError;
use std::collections::{BTreeSet, HashSet};
use winit::keyboard::KeyCode;

const FOUR_KEYS: [KeyCode; 4] = [KeyCode::KeyD, KeyCode::KeyF, KeyCode::KeyJ, KeyCode::KeyK];
const SIX_KEYS: [KeyCode; 6] = [
    KeyCode::KeyS,
    KeyCode::KeyD,
    KeyCode::KeyF,
    KeyCode::KeyJ,
    KeyCode::KeyK,
    KeyCode::KeyL,
];
const EIGHT_KEYS: [KeyCode; 8] = [
    KeyCode::KeyA,
    KeyCode::KeyS,
    KeyCode::KeyD,
    KeyCode::KeyF,
    KeyCode::KeyJ,
    KeyCode::KeyK,
    KeyCode::KeyL,
    KeyCode::Semicolon,
];

/// Ordered mapping from physical key to its 1-based track index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyset {
    keys: Vec<(KeyCode, usize)>,
}

impl Keyset {
    pub fn for_size(size: usize) -> Result<Self, ConfigError> {
        let keys: &[KeyCode] = match size {
            4 => &FOUR_KEYS,
            6 => &SIX_KEYS,
            8 => &EIGHT_KEYS,
            other => return Err(ConfigError::UnsupportedKeyset(other)),
        };
        Self::from_keys(keys)
    }

    /// Builds a keyset where `keys[i]` drives track `i + 1`.
    pub fn from_keys(keys: &[KeyCode]) -> Result<Self, ConfigError> {
        let unique: HashSet<KeyCode> = keys.iter().copied().collect();
        if keys.is_empty() || unique.len() != keys.len() {
            return Err(ConfigError::MalformedKeyset(keys.len()));
        }
        Ok(Self {
            keys: keys.iter().copied().zip(1..).collect(),
        })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn track_index(&self, key: KeyCode) -> Option<usize> {
        self.keys.iter().find(|(k, _)| *k == key).map(|(_, index)| *index)
    }

    pub fn key_for_track(&self, index: usize) -> Option<KeyCode> {
        self.keys.iter().find(|(_, i)| *i == index).map(|(k, _)| *k)
    }

    /// Track indices this keyset can play; generated patterns are filtered to these.
    pub fn track_indices(&self) -> BTreeSet<usize> {
        self.keys.iter().map(|(_, index)| *index).collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = (KeyCode, usize)> + '_ {
        self.keys.iter().copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputEdge {
    pub key: KeyCode,
    pub pressed: bool,
}

/// Held state of every lane, used for key lighting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    held: Vec<bool>,
}

impl InputState {
    pub fn new(lanes: usize) -> Self {
        Self { held: vec![false; lanes] }
    }

    pub fn apply(&mut self, edge: InputEdge, keyset: &Keyset) {
        if let Some(slot) = keyset
            .track_index(edge.key)
            .and_then(|index| self.held.get_mut(index - 1))
        {
            *slot = edge.pressed;
        }
    }

    pub fn is_held(&self, index: usize) -> bool {
        index >= 1 && self.held.get(index - 1).copied().unwrap_or(false)
    }

    pub fn held(&self) -> &[bool] {
        &self.held
    }
}

/// Everything the input collaborator reports for one frame.
#[derive(Clone, Debug, Default)]
pub struct FrameInput {
    pub presses: Vec<KeyCode>,
    pub edges: Vec<InputEdge>,
    pub quit: bool,
}

impl FrameInput {
    pub fn from_edges(edges: Vec<InputEdge>) -> Self {
        let presses = edges.iter().filter(|e| e.pressed).map(|e| e.key).collect();
        Self { presses, edges, quit: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_keysets_map_in_order() {
        let six = Keyset::for_size(6).unwrap();
        assert_eq!(six.len(), 6);
        assert_eq!(six.track_index(KeyCode::KeyS), Some(1));
        assert_eq!(six.track_index(KeyCode::KeyL), Some(6));
        assert_eq!(six.track_index(KeyCode::KeyA), None);

        let eight = Keyset::for_size(8).unwrap();
        assert_eq!(eight.track_index(KeyCode::Semicolon), Some(8));
        assert_eq!(eight.key_for_track(1), Some(KeyCode::KeyA));

        let four = Keyset::for_size(4).unwrap();
        assert_eq!(four.track_indices(), BTreeSet::from([1, 2, 3, 4]));
    }

    #[test]
    fn unknown_size_is_rejected() {
        assert_eq!(Keyset::for_size(5), Err(ConfigError::UnsupportedKeyset(5)));
        assert_eq!(Keyset::for_size(0), Err(ConfigError::UnsupportedKeyset(0)));
    }

    #[test]
    fn custom_keyset_rejects_duplicates() {
        assert!(Keyset::from_keys(&[KeyCode::KeyQ, KeyCode::KeyW]).is_ok());
        assert_eq!(
            Keyset::from_keys(&[KeyCode::KeyQ, KeyCode::KeyQ]),
            Err(ConfigError::MalformedKeyset(2))
        );
        assert!(Keyset::from_keys(&[]).is_err());
    }

    #[test]
    fn input_state_tracks_held_lanes() {
        let keyset = Keyset::for_size(4).unwrap();
        let mut state = InputState::new(keyset.len());
        state.apply(InputEdge { key: KeyCode::KeyF, pressed: true }, &keyset);
        state.apply(InputEdge { key: KeyCode::KeyZ, pressed: true }, &keyset);
        assert!(state.is_held(2));
        assert!(!state.is_held(1));
        assert!(!state.is_held(0));
        state.apply(InputEdge { key: KeyCode::KeyF, pressed: false }, &keyset);
        assert_eq!(state.held(), &[false, false, false, false]);
    }

    #[test]
    fn frame_input_keeps_only_key_downs_as_presses() {
        let input = FrameInput::from_edges(vec![
            InputEdge { key: KeyCode::KeyD, pressed: true },
            InputEdge { key: KeyCode::KeyF, pressed: false },
        ]);
        assert_eq!(input.presses, vec![KeyCode::KeyD]);
        assert_eq!(input.edges.len(), 2);
    }
}
