use beatlane::app::{App, RunOptions, log_filters};
use beatlane::config::{self, Velocity};
use beatlane::core::analysis::JsonAnalyzer;
use beatlane::game::patterns::PatternPool;
use beatlane::game::track::Perform;
use clap::Parser;
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "beatlane", about = "Falling-circle rhythm game engine")]
struct Args {
    /// Music file name inside the music folder.
    music: String,

    #[arg(long, default_value = config::CONFIG_INI_PATH)]
    config: PathBuf,

    /// Keyset size (4, 6 or 8).
    #[arg(long)]
    keys: Option<usize>,

    /// Slow, Medium, Fast or pixels per frame.
    #[arg(long)]
    velocity: Option<Velocity>,

    /// Seed for pattern generation; random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Press every circle at the perfect moment.
    #[arg(long)]
    autoplay: bool,

    /// Pace frames to wall-clock time instead of running flat out.
    #[arg(long)]
    realtime: bool,
}

fn main() -> ExitCode {
    log_filters(&mut env_logger::Builder::from_default_env()).init();

    let args = Args::parse();
    info!("beatlane starting...");

    config::load(&args.config);
    let mut cfg = config::get();
    if let Some(keys) = args.keys {
        cfg.keys = keys;
    }
    if let Some(velocity) = args.velocity {
        cfg.velocity = velocity;
    }
    if let Err(e) = cfg.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let pool = PatternPool::generate(&cfg.patterns, &mut rng);
    let analyzer = JsonAnalyzer::new(&cfg.music_folder);
    let options = RunOptions { autoplay: args.autoplay, realtime: args.realtime };

    let app = match App::new(&cfg, &args.music, &analyzer, &pool, &mut rng, options) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start session: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let summary = app.run();
    info!(
        "Final score: {} (max combo {}). Perfect {}, Good {}, Bad {}, Miss {}.",
        summary.score,
        summary.max_combo,
        summary.count(Perform::Perfect),
        summary.count(Perform::Good),
        summary.count(Perform::Bad),
        summary.count(Perform::Miss)
    );
    ExitCode::SUCCESS
}
