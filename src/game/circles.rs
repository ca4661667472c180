use crate::core::analysis::{AnalysisError, MusicAnalysis, MusicAnalyzer};
use crate::core::audio::PlaybackClock;
use crate::core::input::Keyset;
use crate::game::pattern_library::{PatternError, PatternLibrary};
use crate::game::patterns::PatternPool;
use crate::game::track::Track;
use log::{debug, info};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Beat times with their pattern labels, consumed front to back through a
/// cursor. The underlying lists never change, so a schedule can be rewound.
#[derive(Clone, Debug)]
pub struct BeatSchedule {
    beats_ms: Vec<f64>,
    labels: Vec<usize>,
    cursor: usize,
}

impl BeatSchedule {
    pub fn new(analysis: MusicAnalysis) -> Self {
        let (beats_ms, labels) = analysis.into_beats();
        Self { beats_ms, labels, cursor: 0 }
    }

    pub fn next_beat_ms(&self) -> Option<f64> {
        self.beats_ms.get(self.cursor).copied()
    }

    /// Consumes the front beat if it is due at `threshold_ms` and returns
    /// its pattern label.
    pub fn pop_due(&mut self, threshold_ms: f64) -> Option<usize> {
        let beat = self.next_beat_ms()?;
        if beat > threshold_ms {
            return None;
        }
        let label = self.labels.get(self.cursor).copied().unwrap_or(0);
        self.cursor += 1;
        Some(label)
    }

    pub fn remaining(&self) -> usize {
        self.beats_ms.len() - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.beats_ms.len()
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

/// Turns the beat schedule into circles. Each beat spawns one circle on
/// every track of the note group its pattern category yields.
#[derive(Clone, Debug)]
pub struct CircleHandler {
    schedule: BeatSchedule,
    pattern_library: PatternLibrary,
    time_delay: f64,
    spawned: usize,
}

impl CircleHandler {
    /// Analyses `music` and prepares a pattern library with one category per
    /// repeated segment. `time_delay` is how many seconds a circle needs to
    /// travel from spawn to key.
    pub fn new<R: Rng + ?Sized>(
        music: &str,
        analyzer: &dyn MusicAnalyzer,
        keyset: &Keyset,
        time_delay: f64,
        pool: &PatternPool,
        rng: &mut R,
    ) -> Result<Self, ScheduleError> {
        let analysis = analyzer.analyze(music)?.without_lead_in(time_delay);
        Self::from_analysis(analysis, keyset, time_delay, pool, rng)
    }

    pub fn from_analysis<R: Rng + ?Sized>(
        analysis: MusicAnalysis,
        keyset: &Keyset,
        time_delay: f64,
        pool: &PatternPool,
        rng: &mut R,
    ) -> Result<Self, ScheduleError> {
        let pattern_library = PatternLibrary::new(analysis.pattern_count(), keyset, pool, rng)?;
        info!(
            "Scheduled {} beats across {} pattern categories ({:.2}s lead).",
            analysis.beats_ms().len(),
            pattern_library.pattern_num(),
            time_delay
        );
        Ok(Self {
            schedule: BeatSchedule::new(analysis),
            pattern_library,
            time_delay,
            spawned: 0,
        })
    }

    /// Spawns circles for every beat due at the current playback position,
    /// then moves all circles. Spawning first means a new circle travels on
    /// the same frame it appears.
    pub fn update_circles(&mut self, velocity: f32, tracks: &mut [Track], clock: &dyn PlaybackClock) {
        self.generate_circles(tracks, clock.get_position_ms());
        for track in tracks.iter_mut() {
            track.update_circles(velocity);
        }
    }

    /// Returns the number of beats that fired.
    pub fn generate_circles(&mut self, tracks: &mut [Track], position_ms: i64) -> usize {
        let threshold_ms = position_ms as f64 + self.time_delay * 1000.0;
        let mut fired = 0;
        while let Some(label) = self.schedule.pop_due(threshold_ms) {
            for &index in self.pattern_library.get_track_index(label) {
                if let Some(track) = index.checked_sub(1).and_then(|i| tracks.get_mut(i)) {
                    if track.add_circle() {
                        self.spawned += 1;
                    }
                }
            }
            fired += 1;
        }
        if fired > 1 {
            debug!("Drained {} beats in one frame at {} ms.", fired, position_ms);
        }
        fired
    }

    pub fn schedule(&self) -> &BeatSchedule {
        &self.schedule
    }

    pub fn pattern_library(&self) -> &PatternLibrary {
        &self.pattern_library
    }

    pub fn time_delay(&self) -> f64 {
        self.time_delay
    }

    /// Circles placed on a track so far; dropped overflow is not counted.
    pub fn circles_spawned(&self) -> usize {
        self.spawned
    }
}
