use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read analysis '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed analysis '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("beat {index} has a non-finite time")]
    NonFiniteBeat { index: usize },
    #[error("beat times must be strictly ascending (beat {index} at {time_ms} ms)")]
    UnorderedBeats { index: usize, time_ms: f64 },
    #[error("{beats} beats but {labels} pattern labels")]
    LabelMismatch { beats: usize, labels: usize },
    #[error("segment length must be positive, got {0}")]
    InvalidSegmentLength(f64),
}

/// What the game needs from a song: its length, the beat onsets and the
/// repeated-pattern category of every beat (0 = no repetition detected).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MusicAnalysis {
    duration_sec: f64,
    beats_ms: Vec<f64>,
    labels: Vec<usize>,
}

impl MusicAnalysis {
    pub fn new(duration_sec: f64, beats_ms: Vec<f64>, labels: Vec<usize>) -> Result<Self, AnalysisError> {
        if beats_ms.len() != labels.len() {
            return Err(AnalysisError::LabelMismatch {
                beats: beats_ms.len(),
                labels: labels.len(),
            });
        }
        if let Some(index) = beats_ms.iter().position(|t| !t.is_finite()) {
            return Err(AnalysisError::NonFiniteBeat { index });
        }
        if let Some(index) = beats_ms.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(AnalysisError::UnorderedBeats {
                index: index + 1,
                time_ms: beats_ms[index + 1],
            });
        }
        Ok(Self { duration_sec, beats_ms, labels })
    }

    pub fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    pub fn beats_ms(&self) -> &[f64] {
        &self.beats_ms
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Splits into the aligned beat and label lists.
    pub fn into_beats(self) -> (Vec<f64>, Vec<usize>) {
        (self.beats_ms, self.labels)
    }

    /// Highest category label; the pattern library needs that many sequences.
    pub fn pattern_count(&self) -> usize {
        self.labels.iter().copied().max().unwrap_or(0)
    }

    /// Drops beats that fall inside the lead-in, where a circle could not
    /// travel the whole track before reaching the key.
    pub fn without_lead_in(mut self, time_delay_sec: f64) -> Self {
        let cutoff_ms = time_delay_sec * 1000.0;
        let keep_from = self.beats_ms.partition_point(|&t| t <= cutoff_ms);
        if keep_from > 0 {
            info!("Skipping {} beats inside the {:.2}s lead-in.", keep_from, time_delay_sec);
        }
        self.beats_ms.drain(..keep_from);
        self.labels.drain(..keep_from);
        self
    }
}

/// Source of beat and pattern information for a music file.
pub trait MusicAnalyzer {
    fn analyze(&self, music: &str) -> Result<MusicAnalysis, AnalysisError>;
}

#[derive(Debug, Deserialize)]
struct Sidecar {
    duration: f64,
    /// Onset times in seconds.
    beats: Vec<f64>,
    #[serde(default)]
    labels: Option<Vec<usize>>,
    #[serde(default)]
    segment_length: Option<f64>,
    #[serde(default)]
    segments: Option<Vec<usize>>,
}

/// Labels each beat with the category of the segment it falls in.
pub fn label_beats(beats_sec: &[f64], segments: &[usize], segment_length: f64) -> Vec<usize> {
    beats_sec
        .iter()
        .map(|&t| {
            let index = (t / segment_length).floor();
            if index < 0.0 {
                0
            } else {
                segments.get(index as usize).copied().unwrap_or(0)
            }
        })
        .collect()
}

/// Reads analysis precomputed offline and stored beside the music as
/// `<music stem>.json`.
#[derive(Clone, Debug)]
pub struct JsonAnalyzer {
    music_folder: PathBuf,
}

impl JsonAnalyzer {
    pub fn new(music_folder: impl Into<PathBuf>) -> Self {
        Self { music_folder: music_folder.into() }
    }

    pub fn sidecar_path(&self, music: &str) -> PathBuf {
        self.music_folder.join(Path::new(music).with_extension("json"))
    }

    pub fn parse(text: &str, path: &Path) -> Result<MusicAnalysis, AnalysisError> {
        let sidecar: Sidecar = serde_json::from_str(text).map_err(|source| AnalysisError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let labels = match (sidecar.labels, sidecar.segments, sidecar.segment_length) {
            (Some(labels), _, _) => labels,
            (None, Some(segments), Some(len)) => {
                if !(len > 0.0) {
                    return Err(AnalysisError::InvalidSegmentLength(len));
                }
                label_beats(&sidecar.beats, &segments, len)
            }
            _ => {
                warn!("No pattern labels in '{}'; every beat uses the default pattern.", path.display());
                vec![0; sidecar.beats.len()]
            }
        };
        let beats_ms = sidecar.beats.iter().map(|t| t * 1000.0).collect();
        MusicAnalysis::new(sidecar.duration, beats_ms, labels)
    }
}

impl MusicAnalyzer for JsonAnalyzer {
    fn analyze(&self, music: &str) -> Result<MusicAnalysis, AnalysisError> {
        let path = self.sidecar_path(music);
        let text = fs::read_to_string(&path).map_err(|source| AnalysisError::Io {
            path: path.clone(),
            source,
        })?;
        let analysis = Self::parse(&text, &path)?;
        info!(
            "Loaded analysis for '{}': {:.1}s, {} beats, {} patterns.",
            music,
            analysis.duration_sec(),
            analysis.beats_ms().len(),
            analysis.pattern_count()
        );
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unordered_beats() {
        let err = MusicAnalysis::new(10.0, vec![100.0, 300.0, 300.0], vec![0, 0, 0]).unwrap_err();
        assert!(matches!(err, AnalysisError::UnorderedBeats { index: 2, .. }));
    }

    #[test]
    fn rejects_non_finite_beats() {
        let err = MusicAnalysis::new(10.0, vec![100.0, f64::NAN, 50.0], vec![0, 0, 0]).unwrap_err();
        assert!(matches!(err, AnalysisError::NonFiniteBeat { index: 1 }));
        let err = MusicAnalysis::new(10.0, vec![f64::INFINITY], vec![0]).unwrap_err();
        assert!(matches!(err, AnalysisError::NonFiniteBeat { index: 0 }));
    }

    #[test]
    fn rejects_misaligned_labels() {
        let err = MusicAnalysis::new(10.0, vec![100.0, 200.0], vec![0]).unwrap_err();
        assert!(matches!(err, AnalysisError::LabelMismatch { beats: 2, labels: 1 }));
    }

    #[test]
    fn pattern_count_is_max_label() {
        let a = MusicAnalysis::new(4.0, vec![1.0, 2.0, 3.0], vec![0, 3, 1]).unwrap();
        assert_eq!(a.pattern_count(), 3);
        assert_eq!(MusicAnalysis::default().pattern_count(), 0);
    }

    #[test]
    fn lead_in_beats_are_dropped() {
        let a = MusicAnalysis::new(4.0, vec![500.0, 1000.0, 1500.0, 2000.0], vec![1, 2, 3, 4])
            .unwrap()
            .without_lead_in(1.0);
        assert_eq!(a.beats_ms(), &[1500.0, 2000.0]);
        assert_eq!(a.labels(), &[3, 4]);
    }

    #[test]
    fn segment_labels_map_onto_beats() {
        let labels = label_beats(&[0.1, 1.4, 2.0, 9.0], &[0, 1, 2], 1.0);
        assert_eq!(labels, vec![0, 1, 2, 0]);
    }

    #[test]
    fn parses_sidecar_with_segments() {
        let json = r#"{"duration": 3.0, "beats": [0.5, 1.5, 2.5], "segment_length": 1.0, "segments": [0, 2, 1]}"#;
        let a = JsonAnalyzer::parse(json, Path::new("song.json")).unwrap();
        assert_eq!(a.beats_ms(), &[500.0, 1500.0, 2500.0]);
        assert_eq!(a.labels(), &[0, 2, 1]);
        assert_eq!(a.duration_sec(), 3.0);
    }

    #[test]
    fn parses_sidecar_without_labels() {
        let json = r#"{"duration": 2.0, "beats": [0.25, 0.75]}"#;
        let a = JsonAnalyzer::parse(json, Path::new("song.json")).unwrap();
        assert_eq!(a.labels(), &[0, 0]);
    }

    #[test]
    fn analyzer_reads_sidecar_from_music_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("track01.json"),
            r#"{"duration": 1.0, "beats": [0.2, 0.4], "labels": [1, 1]}"#,
        )
        .unwrap();
        let analyzer = JsonAnalyzer::new(dir.path());
        let a = analyzer.analyze("track01.mp3").unwrap();
        assert_eq!(a.labels(), &[1, 1]);
        assert!(matches!(analyzer.analyze("missing.mp3"), Err(AnalysisError::Io { .. })));
    }
}
