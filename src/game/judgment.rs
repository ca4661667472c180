use crate::config::{ConfigError, JudgmentConfig};
use crate::core::input::Keyset;
use crate::game::track::{Perform, Track};
use log::debug;
use winit::keyboard::KeyCode;

/// Seconds until the front circle of `track` reaches the key; negative once
/// it has passed. `None` when the track is empty.
pub fn calculate_accuracy(track: &Track, frame_rate: f32, velocity: f32) -> Option<f32> {
    let front = track.get_front_circle()?;
    let displacement = track.height - front;
    Some(displacement / velocity / frame_rate)
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Judgment {
    pub grade: Perform,
    pub score: i32,
    pub track: usize,
    pub accuracy: f32,
}

/// Scores key presses and detects circles that slipped past the key.
/// Frame rate and velocity are checked once here, so judging a frame never fails.
#[derive(Clone, Debug)]
pub struct Judge {
    config: JudgmentConfig,
    frame_rate: f32,
    velocity: f32,
    perform_frames: f32,
}

impl Judge {
    pub fn new(
        config: JudgmentConfig,
        frame_rate: f32,
        velocity: f32,
        perform_frames: f32,
    ) -> Result<Self, ConfigError> {
        if !(frame_rate > 0.0) {
            return Err(ConfigError::InvalidFrameRate(frame_rate));
        }
        if !(velocity > 0.0) {
            return Err(ConfigError::InvalidVelocity(velocity));
        }
        config.validate()?;
        Ok(Self {
            config,
            frame_rate,
            velocity,
            perform_frames,
        })
    }

    pub fn config(&self) -> &JudgmentConfig {
        &self.config
    }

    pub fn accuracy(&self, track: &Track) -> Option<f32> {
        calculate_accuracy(track, self.frame_rate, self.velocity)
    }

    /// Tier for an absolute timing error, if it lands inside any window.
    pub fn grade(&self, abs_accuracy: f32) -> Option<(Perform, i32)> {
        let c = &self.config;
        if abs_accuracy < c.perfect_window {
            Some((Perform::Perfect, c.perfect_score))
        } else if abs_accuracy < c.good_window {
            Some((Perform::Good, c.good_score))
        } else if abs_accuracy < c.bad_window {
            Some((Perform::Bad, c.bad_score))
        } else {
            None
        }
    }

    /// Judges a key-down. Unmapped keys, empty tracks and presses outside
    /// every window change nothing.
    pub fn judge_press(&self, key: KeyCode, tracks: &mut [Track], keyset: &Keyset) -> Option<Judgment> {
        let index = keyset.track_index(key)?;
        let track = tracks.get_mut(index.checked_sub(1)?)?;
        let accuracy = self.accuracy(track)?;
        let (grade, score) = self.grade(accuracy.abs())?;
        track.set_perform(grade);
        track.remove_circle();
        debug!("Track {}: {:?} ({:+.3}s, {:+})", index, grade, accuracy, score);
        Some(Judgment { grade, score, track: index, accuracy })
    }

    /// Score change for a key-down; 0 when nothing was judged.
    pub fn score_press(&self, key: KeyCode, tracks: &mut [Track], keyset: &Keyset) -> i32 {
        self.judge_press(key, tracks, keyset).map_or(0, |j| j.score)
    }

    /// Ages every perform flag, then removes each track's front circle if
    /// it is past the miss window. Returns the 1-based tracks that missed.
    pub fn judge_misses(&self, tracks: &mut [Track]) -> Vec<usize> {
        let mut missed = Vec::new();
        for (i, track) in tracks.iter_mut().enumerate() {
            track.update_perform(self.perform_frames);
            let Some(accuracy) = self.accuracy(track) else { continue };
            if accuracy < self.config.miss_window {
                track.set_miss();
                track.remove_circle();
                debug!("Track {}: Miss ({:+.3}s)", i + 1, accuracy);
                missed.push(i + 1);
            }
        }
        missed
    }

    /// Score change from this frame's misses; zero or negative.
    pub fn score_miss(&self, tracks: &mut [Track]) -> i32 {
        self.judge_misses(tracks).len() as i32 * self.config.miss_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_CIRCLE_NUM, MISS_SCORE};
    use crate::game::track::tests::{add_update_circle, track};

    fn track_set(n: usize, height: f32) -> Vec<Track> {
        (1..=n)
            .map(|i| Track::new(0.0, height, (5.0 * (i - 1) as f32, 0.0), MAX_CIRCLE_NUM))
            .collect()
    }

    fn judge(frame_rate: f32, velocity: f32) -> Judge {
        Judge::new(JudgmentConfig::default(), frame_rate, velocity, 0.3 * frame_rate).unwrap()
    }

    #[test]
    fn accuracy_before_key() {
        let mut t = track(1000.0);
        add_update_circle(&mut t, 800.0);
        assert_eq!(calculate_accuracy(&t, 1.0, 1.0), Some(200.0));
    }

    #[test]
    fn accuracy_past_key() {
        let mut t = track(1000.0);
        add_update_circle(&mut t, 1200.0);
        assert_eq!(calculate_accuracy(&t, 1.0, 1.0), Some(-200.0));
    }

    #[test]
    fn accuracy_of_empty_track() {
        assert_eq!(calculate_accuracy(&track(1000.0), 30.0, 20.0), None);
    }

    #[test]
    fn rejects_non_positive_motion() {
        let c = JudgmentConfig::default();
        assert_eq!(Judge::new(c, 0.0, 20.0, 9.0).unwrap_err(), ConfigError::InvalidFrameRate(0.0));
        assert_eq!(Judge::new(c, 30.0, -1.0, 9.0).unwrap_err(), ConfigError::InvalidVelocity(-1.0));
    }

    #[test]
    fn miss_is_scored_once_and_removed() {
        let mut tracks = track_set(6, 1000.0);
        add_update_circle(&mut tracks[1], 1200.0);
        let j = judge(1.0, 1.0);
        assert_eq!(j.score_miss(&mut tracks), MISS_SCORE);
        assert_eq!(tracks[1].get_circles().len(), 0);
        assert_eq!(tracks[1].perform(), Perform::Miss);
        assert_eq!(j.score_miss(&mut tracks), 0);
    }

    #[test]
    fn no_miss_before_key() {
        let mut tracks = track_set(6, 1000.0);
        add_update_circle(&mut tracks[1], 800.0);
        assert_eq!(judge(1.0, 1.0).score_miss(&mut tracks), 0);
        assert_eq!(tracks[1].circle_count(), 1);
    }

    #[test]
    fn unadvanced_circle_is_not_a_miss() {
        let mut tracks = track_set(6, 1000.0);
        tracks[3].add_circle();
        assert_eq!(judge(30.0, 20.0).score_miss(&mut tracks), 0);
    }

    #[test]
    fn misses_accumulate_across_tracks() {
        let mut tracks = track_set(4, 100.0);
        add_update_circle(&mut tracks[0], 200.0);
        add_update_circle(&mut tracks[2], 200.0);
        let j = judge(1.0, 1.0);
        assert_eq!(j.judge_misses(&mut tracks), vec![1, 3]);
    }

    #[test]
    fn miss_flag_expires() {
        let mut tracks = track_set(1, 100.0);
        add_update_circle(&mut tracks[0], 200.0);
        // 0.3 s at 10 fps keeps the flag for three frames.
        let j = judge(10.0, 1.0);
        j.score_miss(&mut tracks);
        for _ in 0..3 {
            j.score_miss(&mut tracks);
            assert_eq!(tracks[0].perform(), Perform::Miss);
        }
        j.score_miss(&mut tracks);
        assert_eq!(tracks[0].perform(), Perform::None);
    }

    /// Places a single circle `seconds` before the key at 30 fps, 20 px/frame.
    fn tracks_with_offset(seconds: f32) -> Vec<Track> {
        let mut tracks = track_set(4, 1000.0);
        add_update_circle(&mut tracks[1], 1000.0 - seconds * 30.0 * 20.0);
        tracks
    }

    #[test]
    fn press_tiers() {
        let keyset = Keyset::for_size(4).unwrap();
        let j = judge(30.0, 20.0);
        let cases = [
            (0.0, Some(Perform::Perfect), 8),
            (-0.05, Some(Perform::Perfect), 8),
            (0.1, Some(Perform::Good), 3),
            (-0.2, Some(Perform::Bad), 1),
            (0.4, None, 0),
        ];
        for (offset, grade, score) in cases {
            let mut tracks = tracks_with_offset(offset);
            assert_eq!(j.score_press(KeyCode::KeyF, &mut tracks, &keyset), score, "offset {}", offset);
            match grade {
                Some(g) => {
                    assert_eq!(tracks[1].perform(), g);
                    assert_eq!(tracks[1].circle_count(), 0);
                }
                None => {
                    assert_eq!(tracks[1].perform(), Perform::None);
                    assert_eq!(tracks[1].circle_count(), 1);
                }
            }
        }
    }

    #[test]
    fn press_on_unmapped_key_or_empty_track() {
        let keyset = Keyset::for_size(4).unwrap();
        let j = judge(30.0, 20.0);
        let mut tracks = tracks_with_offset(0.0);
        assert_eq!(j.score_press(KeyCode::KeyQ, &mut tracks, &keyset), 0);
        assert_eq!(j.score_press(KeyCode::KeyD, &mut tracks, &keyset), 0);
        assert_eq!(tracks[1].circle_count(), 1);
    }

    #[test]
    fn press_judges_only_the_front_circle() {
        let keyset = Keyset::for_size(4).unwrap();
        let j = judge(30.0, 20.0);
        let mut tracks = track_set(4, 1000.0);
        add_update_circle(&mut tracks[0], 400.0);
        add_update_circle(&mut tracks[0], 600.0);
        let judged = j.judge_press(KeyCode::KeyD, &mut tracks, &keyset).unwrap();
        assert_eq!(judged.grade, Perform::Perfect);
        assert_eq!(judged.track, 1);
        assert_eq!(tracks[0].get_front_circle(), Some(600.0));
    }
}
