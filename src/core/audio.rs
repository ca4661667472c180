use log::info;
use std::path::{Path, PathBuf};

/// The music player as seen by the game loop. The position is polled once
/// per frame and must never move backwards while playing.
pub trait PlaybackClock {
    fn load(&mut self, path: &Path);
    fn play(&mut self);
    fn pause(&mut self);
    fn get_position_ms(&self) -> i64;
    fn is_playing(&self) -> bool;
}

/// A playback clock with no audio behind it. Time only moves when the
/// owner calls [`VirtualPlayback::advance`], which keeps runs reproducible.
#[derive(Clone, Debug)]
pub struct VirtualPlayback {
    path: Option<PathBuf>,
    length_ms: i64,
    position_ms: f64,
    playing: bool,
}

impl VirtualPlayback {
    pub fn new(length_sec: f64) -> Self {
        Self {
            path: None,
            length_ms: (length_sec * 1000.0).round() as i64,
            position_ms: 0.0,
            playing: false,
        }
    }

    /// Moves the clock forward while playing; reaching the end stops it.
    pub fn advance(&mut self, delta_ms: f64) {
        if !self.playing || delta_ms <= 0.0 {
            return;
        }
        self.position_ms += delta_ms;
        if self.position_ms >= self.length_ms as f64 {
            self.position_ms = self.length_ms as f64;
            self.playing = false;
            info!("Music finished at {} ms.", self.length_ms);
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn length_ms(&self) -> i64 {
        self.length_ms
    }
}

impl PlaybackClock for VirtualPlayback {
    fn load(&mut self, path: &Path) {
        self.path = Some(path.to_path_buf());
        self.position_ms = 0.0;
        self.playing = false;
    }

    fn play(&mut self) {
        if self.position_ms < self.length_ms as f64 {
            self.playing = true;
        }
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn get_position_ms(&self) -> i64 {
        self.position_ms.floor() as i64
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}
