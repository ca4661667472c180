use configparser::ini::Ini;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;

// Files
pub const CONFIG_INI_PATH: &str = "beatlane.ini";
pub const MUSIC_FOLDER: &str = "./res/music/";

// Gameplay
pub const FRAME_RATE: f32 = 30.0;
pub const DEFAULT_KEYS: usize = 6;
pub const MAX_CIRCLE_NUM: usize = 10;
pub const PERFORM_DURATION: f32 = 0.3; // seconds a perform flag stays visible

// Judgment windows in seconds until the front circle reaches the key
pub const PERFECT_WINDOW: f32 = 0.08;
pub const GOOD_WINDOW: f32 = 0.15;
pub const BAD_WINDOW: f32 = 0.25;
pub const MISS_WINDOW: f32 = -0.25;
pub const PERFECT_SCORE: i32 = 8;
pub const GOOD_SCORE: i32 = 3;
pub const BAD_SCORE: i32 = 1;
pub const MISS_SCORE: i32 = -20;

// Pattern generation
pub const PATTERN_POOL_SIZE: usize = 40;
pub const PATTERN_LENGTH: usize = 60;
pub const GENERATED_KEYS: usize = 8;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid frame rate {0}: must be greater than zero")]
    InvalidFrameRate(f32),
    #[error("invalid velocity {0}: must be greater than zero")]
    InvalidVelocity(f32),
    #[error("unsupported keyset size {0} (expected 4, 6 or 8)")]
    UnsupportedKeyset(usize),
    #[error("keyset track indices must cover 1..={0} exactly once")]
    MalformedKeyset(usize),
    #[error("judgment windows must satisfy 0 < perfect < good < bad, got {perfect}/{good}/{bad}")]
    UnorderedWindows { perfect: f32, good: f32, bad: f32 },
    #[error("miss window {0} must be negative")]
    InvalidMissWindow(f32),
    #[error("track capacity must be at least 1")]
    ZeroCapacity,
}

/// Note speed in pixels per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Velocity {
    Slow,
    Medium,
    Fast,
    Custom(f32),
}

impl Default for Velocity {
    fn default() -> Self {
        Velocity::Medium
    }
}

impl Velocity {
    pub fn pixels_per_frame(self) -> f32 {
        match self {
            Velocity::Slow => 16.0,
            Velocity::Medium => 20.0,
            Velocity::Fast => 25.0,
            Velocity::Custom(px) => px,
        }
    }
}

impl fmt::Display for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Velocity::Slow => write!(f, "Slow"),
            Velocity::Medium => write!(f, "Medium"),
            Velocity::Fast => write!(f, "Fast"),
            Velocity::Custom(px) => {
                if (*px - px.round()).abs() < f32::EPSILON {
                    write!(f, "{}", px.round() as i32)
                } else {
                    write!(f, "{:.2}", px)
                }
            }
        }
    }
}

impl FromStr for Velocity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Velocity value is empty".to_string());
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "slow" => return Ok(Velocity::Slow),
            "medium" => return Ok(Velocity::Medium),
            "fast" => return Ok(Velocity::Fast),
            _ => {}
        }
        let value: f32 = trimmed
            .parse()
            .map_err(|_| format!("Velocity '{}' is neither a preset nor a number", trimmed))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(format!("Velocity '{}' must be greater than zero", trimmed));
        }
        Ok(Velocity::Custom(value))
    }
}

/// Playfield size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenSize {
    Small,
    Medium,
    Large,
    Custom(u32, u32),
}

impl Default for ScreenSize {
    fn default() -> Self {
        ScreenSize::Small
    }
}

impl ScreenSize {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ScreenSize::Small => (1250, 1050),
            ScreenSize::Medium => (1800, 1400),
            ScreenSize::Large => (2500, 2000),
            ScreenSize::Custom(w, h) => (w, h),
        }
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenSize::Small => write!(f, "Small"),
            ScreenSize::Medium => write!(f, "Medium"),
            ScreenSize::Large => write!(f, "Large"),
            ScreenSize::Custom(w, h) => write!(f, "{}x{}", w, h),
        }
    }
}

impl FromStr for ScreenSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "small" => return Ok(ScreenSize::Small),
            "medium" => return Ok(ScreenSize::Medium),
            "large" => return Ok(ScreenSize::Large),
            _ => {}
        }
        let Some((w, h)) = trimmed.split_once(['x', 'X']) else {
            return Err(format!("ScreenSize '{}' must be a preset or WIDTHxHEIGHT", trimmed));
        };
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| format!("ScreenSize '{}' has an invalid width", trimmed))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| format!("ScreenSize '{}' has an invalid height", trimmed))?;
        if width == 0 || height == 0 {
            return Err(format!("ScreenSize '{}' must be non-zero", trimmed));
        }
        Ok(ScreenSize::Custom(width, height))
    }
}

/// Tuned judgment thresholds and the points each tier is worth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgmentConfig {
    pub perfect_window: f32,
    pub good_window: f32,
    pub bad_window: f32,
    pub miss_window: f32,
    pub perfect_score: i32,
    pub good_score: i32,
    pub bad_score: i32,
    pub miss_score: i32,
}

impl Default for JudgmentConfig {
    fn default() -> Self {
        Self {
            perfect_window: PERFECT_WINDOW,
            good_window: GOOD_WINDOW,
            bad_window: BAD_WINDOW,
            miss_window: MISS_WINDOW,
            perfect_score: PERFECT_SCORE,
            good_score: GOOD_SCORE,
            bad_score: BAD_SCORE,
            miss_score: MISS_SCORE,
        }
    }
}

impl JudgmentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.perfect_window > 0.0
            && self.perfect_window < self.good_window
            && self.good_window < self.bad_window;
        if !ordered {
            return Err(ConfigError::UnorderedWindows {
                perfect: self.perfect_window,
                good: self.good_window,
                bad: self.bad_window,
            });
        }
        if self.miss_window >= 0.0 {
            return Err(ConfigError::InvalidMissWindow(self.miss_window));
        }
        Ok(())
    }
}

/// Size of the generated pattern pool the libraries draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternConfig {
    pub pool_size: usize,
    pub pattern_length: usize,
    pub generated_keys: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            pool_size: PATTERN_POOL_SIZE,
            pattern_length: PATTERN_LENGTH,
            generated_keys: GENERATED_KEYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub frame_rate: f32,
    pub velocity: Velocity,
    pub keys: usize,
    pub screen_size: ScreenSize,
    pub track_capacity: usize,
    pub perform_duration: f32,
    pub judgment: JudgmentConfig,
    pub patterns: PatternConfig,
    pub music_folder: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            frame_rate: FRAME_RATE,
            velocity: Velocity::default(),
            keys: DEFAULT_KEYS,
            screen_size: ScreenSize::default(),
            track_capacity: MAX_CIRCLE_NUM,
            perform_duration: PERFORM_DURATION,
            judgment: JudgmentConfig::default(),
            patterns: PatternConfig::default(),
            music_folder: MUSIC_FOLDER.to_string(),
        }
    }
}

impl GameConfig {
    /// Rejects values the frame loop cannot run with. These are fatal; the
    /// caller reports them and exits before any session state exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.frame_rate > 0.0) {
            return Err(ConfigError::InvalidFrameRate(self.frame_rate));
        }
        let px = self.velocity.pixels_per_frame();
        if !(px > 0.0) {
            return Err(ConfigError::InvalidVelocity(px));
        }
        if !matches!(self.keys, 4 | 6 | 8) {
            return Err(ConfigError::UnsupportedKeyset(self.keys));
        }
        if self.track_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        self.judgment.validate()
    }

    /// Number of frames a perform flag stays up.
    pub fn perform_frames(&self) -> f32 {
        self.perform_duration * self.frame_rate
    }
}

static CONFIG: Lazy<Mutex<GameConfig>> = Lazy::new(|| Mutex::new(GameConfig::default()));

fn create_default_file(path: &Path) -> Result<(), std::io::Error> {
    info!("Config file not found, creating defaults in '{}'.", path.display());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let defaults = GameConfig::default();
    let mut conf = Ini::new_cs();
    conf.set("Gameplay", "FrameRate", Some(defaults.frame_rate.to_string()));
    conf.set("Gameplay", "Velocity", Some(defaults.velocity.to_string()));
    conf.set("Gameplay", "Keys", Some(defaults.keys.to_string()));
    conf.set("Gameplay", "ScreenSize", Some(defaults.screen_size.to_string()));
    conf.set("Gameplay", "TrackCapacity", Some(defaults.track_capacity.to_string()));
    conf.set("Gameplay", "PerformDuration", Some(defaults.perform_duration.to_string()));
    let j = defaults.judgment;
    conf.set("Judgment", "Perfect", Some(j.perfect_window.to_string()));
    conf.set("Judgment", "Good", Some(j.good_window.to_string()));
    conf.set("Judgment", "Bad", Some(j.bad_window.to_string()));
    conf.set("Judgment", "Miss", Some(j.miss_window.to_string()));
    conf.set("Judgment", "PerfectScore", Some(j.perfect_score.to_string()));
    conf.set("Judgment", "GoodScore", Some(j.good_score.to_string()));
    conf.set("Judgment", "BadScore", Some(j.bad_score.to_string()));
    conf.set("Judgment", "MissScore", Some(j.miss_score.to_string()));
    let p = defaults.patterns;
    conf.set("Patterns", "PoolSize", Some(p.pool_size.to_string()));
    conf.set("Patterns", "PatternLength", Some(p.pattern_length.to_string()));
    conf.set("Patterns", "GeneratedKeys", Some(p.generated_keys.to_string()));
    conf.set("Paths", "MusicFolder", Some(defaults.music_folder));
    conf.write(path)
}

fn read<T: FromStr>(conf: &Ini, section: &str, key: &str, fallback: T) -> T
where
    T::Err: fmt::Display,
{
    match conf.get(section, key) {
        Some(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(e) => {
                warn!("Invalid [{}] {} = '{}' ({}), using default.", section, key, raw, e);
                fallback
            }
        },
        None => fallback,
    }
}

/// Parses an INI document, falling back to defaults key by key.
pub fn parse(conf: &Ini) -> GameConfig {
    let d = GameConfig::default();
    let judgment = JudgmentConfig {
        perfect_window: read(conf, "Judgment", "Perfect", d.judgment.perfect_window),
        good_window: read(conf, "Judgment", "Good", d.judgment.good_window),
        bad_window: read(conf, "Judgment", "Bad", d.judgment.bad_window),
        miss_window: read(conf, "Judgment", "Miss", d.judgment.miss_window),
        perfect_score: read(conf, "Judgment", "PerfectScore", d.judgment.perfect_score),
        good_score: read(conf, "Judgment", "GoodScore", d.judgment.good_score),
        bad_score: read(conf, "Judgment", "BadScore", d.judgment.bad_score),
        miss_score: read(conf, "Judgment", "MissScore", d.judgment.miss_score),
    };
    let patterns = PatternConfig {
        pool_size: read(conf, "Patterns", "PoolSize", d.patterns.pool_size),
        pattern_length: read(conf, "Patterns", "PatternLength", d.patterns.pattern_length),
        generated_keys: read(conf, "Patterns", "GeneratedKeys", d.patterns.generated_keys),
    };
    GameConfig {
        frame_rate: read(conf, "Gameplay", "FrameRate", d.frame_rate),
        velocity: read(conf, "Gameplay", "Velocity", d.velocity),
        keys: read(conf, "Gameplay", "Keys", d.keys),
        screen_size: read(conf, "Gameplay", "ScreenSize", d.screen_size),
        track_capacity: read(conf, "Gameplay", "TrackCapacity", d.track_capacity),
        perform_duration: read(conf, "Gameplay", "PerformDuration", d.perform_duration),
        judgment,
        patterns,
        music_folder: conf.get("Paths", "MusicFolder").unwrap_or(d.music_folder),
    }
}

/// Loads the config file into the global slot, creating it with defaults
/// when missing. Unreadable files leave the defaults in place.
pub fn load(path: &Path) {
    if !path.exists() {
        if let Err(e) = create_default_file(path) {
            warn!("Failed to create default config file: {}", e);
            return;
        }
    }

    let mut conf = Ini::new_cs();
    match conf.load(path) {
        Ok(_) => {
            let parsed = parse(&conf);
            info!(
                "Loaded config: {} keys, {} fps, velocity {}, screen {}.",
                parsed.keys, parsed.frame_rate, parsed.velocity, parsed.screen_size
            );
            *CONFIG.lock().unwrap() = parsed;
        }
        Err(e) => warn!("Failed to load '{}' ({}), using defaults.", path.display(), e),
    }
}

/// Returns a copy of the currently loaded config.
pub fn get() -> GameConfig {
    CONFIG.lock().unwrap().clone()
}
