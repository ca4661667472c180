use crate::core::input::Keyset;
use crate::game::patterns::{NoteGroup, PatternPool};
use log::{debug, warn};
use rand::Rng;
use rand::seq::{SliceRandom, index};
use std::collections::BTreeSet;
use thiserror::Error;

/// Sequences drawn from the pool and merged into the shuffled default sequence.
pub const DEFAULT_SEQ_NUM: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("empty pattern sequence")]
    EmptySequence,
    #[error("pattern pool holds {available} patterns but {requested} are needed")]
    PoolTooSmall { requested: usize, available: usize },
}

/// One pattern category: a fixed list of note groups read cyclically from
/// a random starting offset chosen at construction.
#[derive(Clone, Debug)]
pub struct Sequence {
    sequence: Vec<NoteGroup>,
    initial: usize,
    index: usize,
}

impl Sequence {
    pub fn new<R: Rng + ?Sized>(mut sequence: Vec<NoteGroup>, shuffle: bool, rng: &mut R) -> Result<Self, PatternError> {
        if sequence.is_empty() {
            return Err(PatternError::EmptySequence);
        }
        let initial = rng.random_range(0..sequence.len());
        if shuffle {
            sequence.shuffle(rng);
        }
        Ok(Self { sequence, initial, index: initial })
    }

    /// Returns the group under the cursor and advances it.
    pub fn get_element(&mut self) -> &NoteGroup {
        let element = &self.sequence[self.index % self.sequence.len()];
        self.index += 1;
        element
    }

    pub fn reset_index(&mut self) {
        self.index = self.initial;
    }

    pub fn initial(&self) -> usize {
        self.initial
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn groups(&self) -> &[NoteGroup] {
        &self.sequence
    }
}

/// Keeps only the tracks the keyset can play. Groups with no playable
/// track become empty rather than being dropped, so beats stay aligned.
pub fn transfer_filter(group: &NoteGroup, accepted: &BTreeSet<usize>) -> NoteGroup {
    group.intersection(accepted).copied().collect()
}

pub fn transfer_sequence(sequence: &[NoteGroup], accepted: &BTreeSet<usize>) -> Vec<NoteGroup> {
    sequence.iter().map(|g| transfer_filter(g, accepted)).collect()
}

/// Maps pattern categories to sequences. Category 0 is the shuffled
/// default sequence; categories `1..=pattern_num` each own one pattern.
#[derive(Clone, Debug)]
pub struct PatternLibrary {
    sequences: Vec<Sequence>,
    current_pattern: usize,
}

impl PatternLibrary {
    pub fn new<R: Rng + ?Sized>(
        pattern_num: usize,
        keyset: &Keyset,
        pool: &PatternPool,
        rng: &mut R,
    ) -> Result<Self, PatternError> {
        let requested = pattern_num + DEFAULT_SEQ_NUM;
        if pool.len() < requested {
            return Err(PatternError::PoolTooSmall {
                requested,
                available: pool.len(),
            });
        }
        if keyset.len() > pool.key_count() {
            warn!(
                "Pattern pool covers {} keys but keyset has {}; upper tracks stay silent.",
                pool.key_count(),
                keyset.len()
            );
        }

        let accepted = keyset.track_indices();
        let mut drawn: Vec<Vec<NoteGroup>> = index::sample(rng, pool.len(), requested)
            .into_iter()
            .map(|i| transfer_sequence(&pool.patterns()[i], &accepted))
            .collect();

        let default_groups: Vec<NoteGroup> = drawn.split_off(pattern_num).into_iter().flatten().collect();
        let mut sequences = Vec::with_capacity(pattern_num + 1);
        sequences.push(Sequence::new(default_groups, true, rng)?);
        for pattern in drawn {
            sequences.push(Sequence::new(pattern, false, rng)?);
        }

        debug!(
            "Pattern library ready: {} categories for {} keys.",
            pattern_num,
            keyset.len()
        );
        Ok(Self { sequences, current_pattern: 0 })
    }

    pub fn pattern_num(&self) -> usize {
        self.sequences.len() - 1
    }

    pub fn current_pattern(&self) -> usize {
        self.current_pattern
    }

    pub fn sequence(&self, pattern: usize) -> Option<&Sequence> {
        self.sequences.get(pattern)
    }

    /// Next group of tracks for `pattern`. Leaving a category rewinds it to
    /// its starting offset, so returning to it replays the same phrase.
    /// Unknown categories fall back to the default sequence.
    pub fn get_track_index(&mut self, pattern: usize) -> &NoteGroup {
        let pattern = if pattern < self.sequences.len() { pattern } else { 0 };
        if pattern != self.current_pattern {
            self.sequences[self.current_pattern].reset_index();
            self.current_pattern = pattern;
        }
        self.sequences[self.current_pattern].get_element()
    }
}
