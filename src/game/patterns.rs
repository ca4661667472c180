use crate::config::PatternConfig;
use log::debug;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::index;
use std::collections::BTreeSet;

/// Track indices (1-based) that receive a circle on the same beat.
pub type NoteGroup = BTreeSet<usize>;

/// Weight removed from `Spontaneous` and `Combine` for the two halves of a combine.
pub const WEIGHT_DECAY: f64 = 0.04;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Strategy {
    LeftSweep,
    RightSweep,
    Repetition,
    Rest,
    Spontaneous,
    Combine,
}

const STRATEGIES: [Strategy; 6] = [
    Strategy::LeftSweep,
    Strategy::RightSweep,
    Strategy::Repetition,
    Strategy::Rest,
    Strategy::Spontaneous,
    Strategy::Combine,
];
const BASE_WEIGHTS: [f64; 6] = [0.25, 0.25, 0.15, 0.1, 0.08, 0.17];

/// Rotates `keys` by a random offset (optionally reversed) and emits one
/// singleton group per position.
fn sweep<R: Rng + ?Sized>(keys: Vec<usize>, len: usize, rng: &mut R) -> Vec<NoteGroup> {
    let mut keys = keys;
    if rng.random_bool(0.5) {
        keys.reverse();
    }
    if keys.is_empty() {
        return vec![NoteGroup::new(); len];
    }
    let offset = rng.random_range(0..keys.len());
    keys.iter()
        .cycle()
        .skip(offset)
        .take(len)
        .map(|&k| NoteGroup::from([k]))
        .collect()
}

pub fn left_sweep<R: Rng + ?Sized>(len: usize, key_count: usize, rng: &mut R) -> Vec<NoteGroup> {
    sweep((1..=key_count / 2).collect(), len, rng)
}

pub fn right_sweep<R: Rng + ?Sized>(len: usize, key_count: usize, rng: &mut R) -> Vec<NoteGroup> {
    sweep((key_count / 2 + 1..=key_count).collect(), len, rng)
}

pub fn repetition(group: NoteGroup, len: usize) -> Vec<NoteGroup> {
    vec![group; len]
}

pub fn random_repetition<R: Rng + ?Sized>(len: usize, key_count: usize, rng: &mut R) -> Vec<NoteGroup> {
    let key = rng.random_range(1..=key_count);
    repetition(NoteGroup::from([key]), len)
}

pub fn rest(len: usize) -> Vec<NoteGroup> {
    vec![NoteGroup::new(); len]
}

/// A chord of `circle_count` distinct keys drawn from `1..=key_count`.
pub fn random_spontaneous<R: Rng + ?Sized>(circle_count: usize, key_count: usize, rng: &mut R) -> NoteGroup {
    index::sample(rng, key_count, circle_count.min(key_count))
        .into_iter()
        .map(|i| i + 1)
        .collect()
}

/// Position-wise union of two equally long sequences.
pub fn combine_sequence(left: &[NoteGroup], right: &[NoteGroup]) -> Vec<NoteGroup> {
    left.iter().zip(right).map(|(l, r)| l | r).collect()
}

/// Weights for the two halves of a combine: spontaneous chords and combine
/// itself lose `WEIGHT_DECAY`, floored at zero.
fn decay_weights(mut weights: [f64; 6]) -> [f64; 6] {
    for w in &mut weights[4..] {
        *w = (*w - WEIGHT_DECAY).max(0.0);
    }
    weights
}

fn generate_chunk<R: Rng + ?Sized>(
    size: usize,
    weights: [f64; 6],
    key_count: usize,
    rng: &mut R,
) -> Vec<NoteGroup> {
    // The first four weights never decay, so the distribution is always valid.
    let Ok(dist) = WeightedIndex::new(weights) else {
        return rest(size);
    };
    match STRATEGIES[dist.sample(rng)] {
        Strategy::LeftSweep => left_sweep(size, key_count, rng),
        Strategy::RightSweep => right_sweep(size, key_count, rng),
        Strategy::Repetition => random_repetition(size, key_count, rng),
        Strategy::Rest => rest(size),
        Strategy::Spontaneous => {
            let max = (key_count / 2 + 2).min(key_count);
            let min = 2.min(max);
            (0..size)
                .map(|_| {
                    let count = rng.random_range(min..=max);
                    random_spontaneous(count, key_count, rng)
                })
                .collect()
        }
        Strategy::Combine => {
            let decayed = decay_weights(weights);
            let left = generate_chunk(size, decayed, key_count, rng);
            let right = generate_chunk(size, decayed, key_count, rng);
            combine_sequence(&left, &right)
        }
    }
}

/// Generates `size` note groups over keys `1..=key_count`, built from
/// randomly sized chunks of the six strategies.
pub fn generate_patterns<R: Rng + ?Sized>(size: usize, key_count: usize, rng: &mut R) -> Vec<NoteGroup> {
    if key_count == 0 {
        return rest(size);
    }
    let max_step = (key_count / 2).max(1);
    let mut pattern = Vec::with_capacity(size);
    let mut remaining = size;
    while remaining > 0 {
        let step = rng.random_range(1..=max_step).min(remaining);
        remaining -= step;
        pattern.extend(generate_chunk(step, BASE_WEIGHTS, key_count, rng));
    }
    pattern
}

/// Pre-generated patterns that pattern libraries sample from.
#[derive(Clone, Debug)]
pub struct PatternPool {
    patterns: Vec<Vec<NoteGroup>>,
    key_count: usize,
}

impl PatternPool {
    pub fn generate<R: Rng + ?Sized>(config: &PatternConfig, rng: &mut R) -> Self {
        let patterns = (0..config.pool_size)
            .map(|_| generate_patterns(config.pattern_length, config.generated_keys, rng))
            .collect::<Vec<_>>();
        debug!(
            "Generated pattern pool: {} patterns x {} groups over {} keys.",
            patterns.len(),
            config.pattern_length,
            config.generated_keys
        );
        Self {
            patterns,
            key_count: config.generated_keys,
        }
    }

    pub fn from_patterns(patterns: Vec<Vec<NoteGroup>>, key_count: usize) -> Self {
        Self { patterns, key_count }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn key_count(&self) -> usize {
        self.key_count
    }

    pub fn patterns(&self) -> &[Vec<NoteGroup>] {
        &self.patterns
    }
}
