use crate::config::{ConfigError, GameConfig};
use crate::core::analysis::{MusicAnalysis, MusicAnalyzer};
use crate::core::audio::PlaybackClock;
use crate::core::input::{FrameInput, InputState, Keyset};
use crate::game::circles::{CircleHandler, ScheduleError};
use crate::game::judgment::Judge;
use crate::game::patterns::PatternPool;
use crate::game::track::{Perform, Track};
use crate::utils::fps::FrameTimer;
use log::info;
use rand::Rng;
use std::collections::HashMap;
use thiserror::Error;
use winit::keyboard::KeyCode;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Lane geometry derived from the screen size and key count.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Layout {
    pub track_width: f32,
    pub track_height: f32,
}

impl Layout {
    pub fn new(screen: (u32, u32), keys: usize) -> Self {
        let track_width = (screen.0 / (keys as u32 + 1)) as f32;
        let track_height = screen.1 as f32 - (0.5 * track_width).ceil();
        Self { track_width, track_height }
    }

    /// Tracks 1..=keys, spawning one track-width above the top edge.
    pub fn build_tracks(&self, keys: usize, capacity: usize) -> Vec<Track> {
        (1..=keys)
            .map(|index| {
                let x = (self.track_width * (index as f32 - 0.5)).ceil();
                Track::new(self.track_width, self.track_height, (x, -self.track_width), capacity)
            })
            .collect()
    }

    /// Seconds a circle needs to fall from spawn to key.
    pub fn time_delay(&self, velocity: f32, frame_rate: f32) -> f64 {
        (self.track_height / velocity / frame_rate) as f64
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LaneView {
    pub index: usize,
    pub key_position: (f32, f32),
    pub circles: Vec<(f32, f32)>,
    pub perform: Perform,
    pub held: bool,
}

/// Snapshot handed to the renderer each frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameView {
    pub lanes: Vec<LaneView>,
    pub score: i32,
    pub combo: u32,
    pub elapsed_sec: u32,
    pub frame: u32,
}

pub trait FrameRenderer {
    fn render(&mut self, view: &FrameView);
}

/// Renders nothing; logs a heartbeat once per second of game time.
#[derive(Debug, Default)]
pub struct LogRenderer {
    last_logged_sec: Option<u32>,
}

impl FrameRenderer for LogRenderer {
    fn render(&mut self, view: &FrameView) {
        if self.last_logged_sec == Some(view.elapsed_sec) {
            return;
        }
        self.last_logged_sec = Some(view.elapsed_sec);
        let active: usize = view.lanes.iter().map(|l| l.circles.len()).sum();
        info!(
            "Time: {}s, Score: {}, Combo: {}, Active Circles: {}",
            view.elapsed_sec, view.score, view.combo, active
        );
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Quit,
    MusicEnded,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Finished(FinishReason),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub score: i32,
    pub max_combo: u32,
    pub judgment_counts: HashMap<Perform, u32>,
    pub circles_spawned: usize,
    pub beats_remaining: usize,
}

impl SessionSummary {
    pub fn count(&self, grade: Perform) -> u32 {
        self.judgment_counts.get(&grade).copied().unwrap_or(0)
    }
}

/// One play-through of one song. Owns every piece of mutable game state.
pub struct Session {
    keyset: Keyset,
    tracks: Vec<Track>,
    circle_handler: CircleHandler,
    judge: Judge,
    input: InputState,
    timer: FrameTimer,
    velocity: f32,
    music_length: f64,
    score: i32,
    combo: u32,
    max_combo: u32,
    judgment_counts: HashMap<Perform, u32>,
}

impl Session {
    pub fn new<R: Rng + ?Sized>(
        config: &GameConfig,
        keyset: Keyset,
        music: &str,
        analyzer: &dyn MusicAnalyzer,
        pool: &PatternPool,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let analysis = analyzer.analyze(music).map_err(ScheduleError::from)?;
        Self::from_analysis(config, keyset, analysis, pool, rng)
    }

    pub fn from_analysis<R: Rng + ?Sized>(
        config: &GameConfig,
        keyset: Keyset,
        analysis: MusicAnalysis,
        pool: &PatternPool,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let velocity = config.velocity.pixels_per_frame();
        let layout = Layout::new(config.screen_size.dimensions(), keyset.len());
        let time_delay = layout.time_delay(velocity, config.frame_rate);
        let music_length = analysis.duration_sec();
        let analysis = analysis.without_lead_in(time_delay);
        let circle_handler = CircleHandler::from_analysis(analysis, &keyset, time_delay, pool, rng)?;
        Self::assemble(config, keyset, layout, circle_handler, music_length)
    }

    fn assemble(
        config: &GameConfig,
        keyset: Keyset,
        layout: Layout,
        circle_handler: CircleHandler,
        music_length: f64,
    ) -> Result<Self, SessionError> {
        let velocity = config.velocity.pixels_per_frame();
        let judge = Judge::new(config.judgment, config.frame_rate, velocity, config.perform_frames())?;
        let tracks = layout.build_tracks(keyset.len(), config.track_capacity);
        info!(
            "Session ready: {} tracks ({}x{} px), velocity {} px/frame at {} fps.",
            tracks.len(),
            layout.track_width,
            layout.track_height,
            velocity,
            config.frame_rate
        );
        Ok(Self {
            input: InputState::new(keyset.len()),
            keyset,
            tracks,
            circle_handler,
            judge,
            timer: FrameTimer::new(config.frame_rate),
            velocity,
            music_length,
            score: 0,
            combo: 0,
            max_combo: 0,
            judgment_counts: HashMap::new(),
        })
    }

    /// Runs one frame: key presses, circle spawning and movement, rendering,
    /// then miss detection.
    ///
    /// The length check counts whole elapsed seconds, so a session may run
    /// up to one second past the analysed music length unless the clock
    /// stops first.
    pub fn step(
        &mut self,
        input: &FrameInput,
        clock: &dyn PlaybackClock,
        renderer: &mut dyn FrameRenderer,
    ) -> FrameOutcome {
        if input.quit {
            return FrameOutcome::Finished(FinishReason::Quit);
        }

        for edge in &input.edges {
            self.input.apply(*edge, &self.keyset);
        }
        for &key in &input.presses {
            if let Some(judgment) = self.judge.judge_press(key, &mut self.tracks, &self.keyset) {
                self.score += judgment.score;
                self.combo += 1;
                self.max_combo = self.max_combo.max(self.combo);
                *self.judgment_counts.entry(judgment.grade).or_insert(0) += 1;
            }
        }

        self.circle_handler
            .update_circles(self.velocity, &mut self.tracks, clock);

        renderer.render(&self.view());

        let missed = self.judge.judge_misses(&mut self.tracks);
        if !missed.is_empty() {
            self.combo = 0;
            self.score += missed.len() as i32 * self.judge.config().miss_score;
            *self.judgment_counts.entry(Perform::Miss).or_insert(0) += missed.len() as u32;
        }

        self.timer.update_time();
        if self.timer.seconds() as f64 > self.music_length || !clock.is_playing() {
            info!("Music ended after {}s.", self.timer.seconds());
            return FrameOutcome::Finished(FinishReason::MusicEnded);
        }
        FrameOutcome::Continue
    }

    pub fn view(&self) -> FrameView {
        FrameView {
            lanes: self
                .tracks
                .iter()
                .enumerate()
                .map(|(i, track)| LaneView {
                    index: i + 1,
                    key_position: track.get_key_position(),
                    circles: track.get_circles(),
                    perform: track.perform(),
                    held: self.input.is_held(i + 1),
                })
                .collect(),
            score: self.score,
            combo: self.combo,
            elapsed_sec: self.timer.seconds(),
            frame: self.timer.frame(),
        }
    }

    /// Keys a perfect player would press this frame: every lane whose front
    /// circle is within half a frame of its key.
    pub fn autoplay_presses(&self) -> Vec<KeyCode> {
        let half_frame = 0.5 / self.timer.frame_rate();
        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| {
                self.judge
                    .accuracy(track)
                    .is_some_and(|a| a <= half_frame && a > -half_frame * 3.0)
            })
            .filter_map(|(i, _)| self.keyset.key_for_track(i + 1))
            .collect()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            score: self.score,
            max_combo: self.max_combo,
            judgment_counts: self.judgment_counts.clone(),
            circles_spawned: self.circle_handler.circles_spawned(),
            beats_remaining: self.circle_handler.schedule().remaining(),
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn keyset(&self) -> &Keyset {
        &self.keyset
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    /// Song length in seconds, as reported by the analysis.
    pub fn music_length(&self) -> f64 {
        self.music_length
    }

    pub fn circle_handler(&self) -> &CircleHandler {
        &self.circle_handler
    }
}
