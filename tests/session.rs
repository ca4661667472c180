use beatlane::app::{App, RunOptions};
use beatlane::config::{GameConfig, MISS_SCORE, PERFECT_SCORE};
use beatlane::core::analysis::JsonAnalyzer;
use beatlane::game::patterns::PatternPool;
use beatlane::game::track::Perform;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;

const SIDECAR: &str = r#"{
    "duration": 8.0,
    "beats": [2.5, 3.0, 3.5, 4.0, 4.5, 5.0, 5.5, 6.0],
    "segment_length": 2.0,
    "segments": [0, 1, 2, 1]
}"#;

fn play(autoplay: bool, seed: u64) -> beatlane::game::session::SessionSummary {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("demo.json"), SIDECAR).unwrap();
    let config = GameConfig {
        music_folder: dir.path().to_string_lossy().into_owned(),
        ..GameConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let pool = PatternPool::generate(&config.patterns, &mut rng);
    let analyzer = JsonAnalyzer::new(dir.path());
    let options = RunOptions { autoplay, realtime: false };
    App::new(&config, "demo.mp3", &analyzer, &pool, &mut rng, options)
        .unwrap()
        .run()
}

#[test]
fn autoplay_never_misses() {
    for seed in 0..5 {
        let summary = play(true, seed);
        let perfect = summary.count(Perform::Perfect);
        assert_eq!(summary.count(Perform::Miss), 0, "seed {}", seed);
        assert_eq!(summary.count(Perform::Good) + summary.count(Perform::Bad), 0, "seed {}", seed);
        assert_eq!(summary.score, perfect as i32 * PERFECT_SCORE, "seed {}", seed);
        assert!(summary.circles_spawned > 0, "seed {}", seed);
        assert_eq!(perfect as usize, summary.circles_spawned, "seed {}", seed);
        assert_eq!(summary.beats_remaining, 0);
    }
}

#[test]
fn idle_player_misses_everything() {
    let summary = play(false, 7);
    let misses = summary.count(Perform::Miss);
    assert!(misses > 0);
    assert_eq!(misses as usize, summary.circles_spawned);
    assert_eq!(summary.score, misses as i32 * MISS_SCORE);
    assert_eq!(summary.max_combo, 0);
}

#[test]
fn missing_sidecar_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = GameConfig::default();
    let mut rng = StdRng::seed_from_u64(0);
    let pool = PatternPool::generate(&config.patterns, &mut rng);
    let analyzer = JsonAnalyzer::new(dir.path());
    assert!(App::new(&config, "absent.mp3", &analyzer, &pool, &mut rng, RunOptions::default()).is_err());
}
