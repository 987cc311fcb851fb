// Analysis policy for the transcription path.
//
// The thresholds below are policy, not derived values: they were tuned by
// ear against real recordings. Each lives as a named constant so tests can
// aim at exact boundaries, and `AnalysisConfig` mirrors them in a
// serde-loadable struct so a host can retune without recompiling. A JSON file
// may list only the fields it changes; the rest fall back to the defaults.
//
// Consumed by pitch.rs (voicing gate, trim) and segment.rs (windowing,
// silence gate, stability and vibrato tolerance, emission).

use crate::error::NotesError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Samples per analysis window.
pub const WINDOW_SIZE: usize = 2048;
/// Samples between window starts (50% overlap).
pub const HOP_SIZE: usize = 1024;
/// Window RMS below which the segmenter treats the window as silence.
pub const SILENCE_RMS: f32 = 0.02;
/// Frame RMS below which the pitch tracker reports unvoiced.
pub const VOICING_RMS: f32 = 0.01;
/// Edge samples at or above this amplitude are trimmed before autocorrelation.
pub const TRIM_AMPLITUDE: f32 = 0.2;
/// A note must accrue strictly more than this many frames to be emitted.
pub const MIN_NOTE_FRAMES: u32 = 4;
/// Largest pitch change, in semitones, still treated as the same note.
pub const PITCH_TOLERANCE: u8 = 1;
/// Floor on emitted note length, in seconds.
pub const MIN_NOTE_DURATION: f64 = 0.1;
/// Velocity assigned to every detected note.
pub const DETECTED_VELOCITY: f32 = 0.7;
/// Confidence of a note closed by silence.
pub const SILENCE_CLOSE_CONFIDENCE: f32 = 0.8;
/// Confidence of a note closed by a pitch jump or the end of the buffer.
pub const PITCH_CLOSE_CONFIDENCE: f32 = 0.85;
/// Longest stretch of audio analyzed in one call.
pub const MAX_SEGMENT_SECONDS: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub window_size: usize,
    pub hop_size: usize,
    pub silence_rms: f32,
    pub voicing_rms: f32,
    pub trim_amplitude: f32,
    pub min_note_frames: u32,
    pub pitch_tolerance: u8,
    pub min_note_duration: f64,
    pub velocity: f32,
    pub silence_close_confidence: f32,
    pub pitch_close_confidence: f32,
    pub max_segment_seconds: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            window_size: WINDOW_SIZE,
            hop_size: HOP_SIZE,
            silence_rms: SILENCE_RMS,
            voicing_rms: VOICING_RMS,
            trim_amplitude: TRIM_AMPLITUDE,
            min_note_frames: MIN_NOTE_FRAMES,
            pitch_tolerance: PITCH_TOLERANCE,
            min_note_duration: MIN_NOTE_DURATION,
            velocity: DETECTED_VELOCITY,
            silence_close_confidence: SILENCE_CLOSE_CONFIDENCE,
            pitch_close_confidence: PITCH_CLOSE_CONFIDENCE,
            max_segment_seconds: MAX_SEGMENT_SECONDS,
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, NotesError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Parse a config from JSON text. Missing fields keep their defaults.
    pub fn from_json(data: &str) -> Result<Self, NotesError> {
        let config: AnalysisConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the sweep cannot run with.
    pub fn validate(&self) -> Result<(), NotesError> {
        if self.window_size < 2 {
            return Err(NotesError::InvalidConfig(format!(
                "window_size must be at least 2, got {}",
                self.window_size
            )));
        }
        if self.hop_size == 0 {
            return Err(NotesError::InvalidConfig(
                "hop_size must be positive".to_string(),
            ));
        }
        if self.min_note_duration.is_nan() || self.min_note_duration <= 0.0 {
            return Err(NotesError::InvalidConfig(format!(
                "min_note_duration must be positive, got {}",
                self.min_note_duration
            )));
        }
        if !self.max_segment_seconds.is_finite() || self.max_segment_seconds <= 0.0 {
            return Err(NotesError::InvalidConfig(format!(
                "max_segment_seconds must be positive and finite, got {}",
                self.max_segment_seconds
            )));
        }
        for (name, value) in [
            ("silence_rms", self.silence_rms),
            ("voicing_rms", self.voicing_rms),
            ("trim_amplitude", self.trim_amplitude),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(NotesError::InvalidConfig(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_constants() {
        let config = AnalysisConfig::default();
        assert_eq!(config.window_size, 2048);
        assert_eq!(config.hop_size, 1024);
        assert_eq!(config.silence_rms, 0.02);
        assert_eq!(config.voicing_rms, 0.01);
        assert_eq!(config.trim_amplitude, 0.2);
        assert_eq!(config.min_note_frames, 4);
        assert_eq!(config.pitch_tolerance, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json(r#"{ "silence_rms": 0.05 }"#).unwrap();
        assert_eq!(config.silence_rms, 0.05);
        assert_eq!(config.window_size, WINDOW_SIZE);
        assert_eq!(config.min_note_frames, MIN_NOTE_FRAMES);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AnalysisConfig {
            hop_size: 512,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(AnalysisConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_zero_hop() {
        let err = AnalysisConfig::from_json(r#"{ "hop_size": 0 }"#).unwrap_err();
        assert!(matches!(err, NotesError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_bad_limits_and_thresholds() {
        for json in [
            r#"{ "max_segment_seconds": 0.0 }"#,
            r#"{ "max_segment_seconds": -5.0 }"#,
            r#"{ "silence_rms": -1.0 }"#,
            r#"{ "voicing_rms": -0.01 }"#,
            r#"{ "trim_amplitude": -0.2 }"#,
        ] {
            let err = AnalysisConfig::from_json(json).unwrap_err();
            assert!(matches!(err, NotesError::InvalidConfig(_)), "{json}");
        }
        // Large caps are allowed; the sweep clamps to the buffer.
        assert!(AnalysisConfig::from_json(r#"{ "max_segment_seconds": 1e300 }"#).is_ok());
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = AnalysisConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, NotesError::Json(_)));
    }
}
