use crate::config::GameConfig;
use crate::core::analysis::MusicAnalyzer;
use crate::core::audio::{PlaybackClock, VirtualPlayback};
use crate::core::input::{FrameInput, Keyset};
use crate::game::patterns::PatternPool;
use crate::game::session::{FrameOutcome, FrameRenderer, LogRenderer, Session, SessionError, SessionSummary};
use crate::utils::fps::{FPSCounter, FramePacer};
use log::{LevelFilter, debug, info};
use rand::Rng;
use std::path::Path;

/// Default levels: per-hit judgments traced at debug, scheduler chatter
/// limited to warnings.
pub fn log_filters(builder: &mut env_logger::Builder) -> &mut env_logger::Builder {
    builder
        .filter_level(LevelFilter::Info)
        .filter_module("beatlane::game::judgment", LevelFilter::Debug)
        .filter_module("beatlane::game::circles", LevelFilter::Warn)
}

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub autoplay: bool,
    pub realtime: bool,
}

/// Headless driver: a virtual clock advanced one frame at a time, with
/// presses either scripted by autoplay or absent.
pub struct App {
    session: Session,
    clock: VirtualPlayback,
    renderer: Box<dyn FrameRenderer>,
    options: RunOptions,
    frame_ms: f64,
    frame_rate: f32,
}

impl App {
    pub fn new<R: Rng + ?Sized>(
        config: &GameConfig,
        music: &str,
        analyzer: &dyn MusicAnalyzer,
        pool: &PatternPool,
        rng: &mut R,
        options: RunOptions,
    ) -> Result<Self, SessionError> {
        let keyset = Keyset::for_size(config.keys)?;
        let session = Session::new(config, keyset, music, analyzer, pool, rng)?;
        let mut clock = VirtualPlayback::new(session.music_length());
        clock.load(&Path::new(&config.music_folder).join(music));
        Ok(Self {
            session,
            clock,
            renderer: Box::new(LogRenderer::default()),
            options,
            frame_ms: 1000.0 / config.frame_rate as f64,
            frame_rate: config.frame_rate,
        })
    }

    pub fn with_renderer(mut self, renderer: Box<dyn FrameRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn run(mut self) -> SessionSummary {
        info!(
            "Playing '{}' ({:.1}s){}.",
            self.clock.path().map(|p| p.display().to_string()).unwrap_or_default(),
            self.session.music_length(),
            if self.options.autoplay { " on autoplay" } else { "" }
        );
        let mut pacer = self.options.realtime.then(|| FramePacer::new(self.frame_rate));
        let mut fps = FPSCounter::new();
        self.clock.play();

        loop {
            let input = if self.options.autoplay {
                FrameInput {
                    presses: self.session.autoplay_presses(),
                    ..FrameInput::default()
                }
            } else {
                FrameInput::default()
            };
            if let FrameOutcome::Finished(reason) = self.session.step(&input, &self.clock, self.renderer.as_mut()) {
                info!("Session finished: {:?}.", reason);
                break;
            }
            self.clock.advance(self.frame_ms);
            if let Some(pacer) = pacer.as_mut() {
                pacer.wait();
                if let Some(value) = fps.update() {
                    debug!("FPS: {}", value);
                }
            }
        }
        self.clock.pause();
        self.session.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log, Metadata};

    fn enabled(logger: &env_logger::Logger, target: &str, level: Level) -> bool {
        logger.enabled(&Metadata::builder().target(target).level(level).build())
    }

    #[test]
    fn module_filters_change_levels() {
        let logger = log_filters(&mut env_logger::Builder::new()).build();
        assert!(enabled(&logger, "beatlane::game::judgment", Level::Debug));
        assert!(!enabled(&logger, "beatlane::game::circles", Level::Info));
        assert!(enabled(&logger, "beatlane::game::circles", Level::Warn));
        assert!(enabled(&logger, "beatlane::game::session", Level::Info));
        assert!(!enabled(&logger, "beatlane::game::session", Level::Debug));
    }
}
