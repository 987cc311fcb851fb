// Frame-to-note segmentation for the transcription path.
//
// Sweeps a mono PCM buffer in overlapping windows (2048 samples, hop 1024).
// Each window is classified as silence (RMS gate), unvoiced (pitch tracker
// found no period) or a MIDI pitch, and fed to a small state machine that
// holds at most one open note:
//
// - silence closes the open note (confidence 0.8) and clears it;
// - unvoiced is a gap: the open note survives a dropped frame untouched;
// - a pitch within +/-1 semitone of the held pitch extends the note
//   (vibrato tolerance), a larger jump closes it (confidence 0.85) and opens
//   a new one;
// - the end of the sweep closes whatever is still open (confidence 0.85).
//
// A note is only emitted if it accrued more than `min_note_frames` frames;
// shorter blips are discarded. The open-note state is a plain value passed
// in and returned from `advance`, so the sweep carries no hidden state.
//
// Output is sorted by construction: windows are visited in time order and
// each closes at most one note. See pitch.rs for the estimator and config.rs
// for every threshold used here.

use crate::config::AnalysisConfig;
use crate::note::{NoteEvent, hz_to_midi};
use crate::pitch::{estimate_with, rms};

/// A note whose onset has been seen but whose end has not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenNote {
    /// Sample offset (within the analyzed slice) of the first window.
    pub start_sample: usize,
    pub held_pitch: u8,
    /// Voiced windows accrued so far.
    pub frames: u32,
}

/// The sweep's only mutable state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmenterState {
    pub open: Option<OpenNote>,
}

/// What one window looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Silence,
    Unvoiced,
    Pitch(u8),
}

/// A note that has ended and passed the stability check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedNote {
    pub start_sample: usize,
    pub end_sample: usize,
    pub pitch: u8,
    pub confidence: f32,
}

/// Classify one window.
pub fn observe(
    frame: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Observation {
    if rms(frame) < config.silence_rms {
        return Observation::Silence;
    }
    match estimate_with(frame, sample_rate, config) {
        Some(freq) => Observation::Pitch(hz_to_midi(freq)),
        None => Observation::Unvoiced,
    }
}

/// Feed one observation at `position` (window start, in samples) to the
/// state machine. Returns the new state and the note it closed, if any.
pub fn advance(
    state: SegmenterState,
    position: usize,
    observation: Observation,
    config: &AnalysisConfig,
) -> (SegmenterState, Option<ClosedNote>) {
    match observation {
        Observation::Silence => {
            let closed = state
                .open
                .and_then(|note| close(note, position, config.silence_close_confidence, config));
            (SegmenterState { open: None }, closed)
        }
        Observation::Unvoiced => (state, None),
        Observation::Pitch(pitch) => match state.open {
            None => (SegmenterState { open: Some(open_at(position, pitch)) }, None),
            Some(note) if note.held_pitch.abs_diff(pitch) > config.pitch_tolerance => {
                let closed = close(note, position, config.pitch_close_confidence, config);
                (SegmenterState { open: Some(open_at(position, pitch)) }, closed)
            }
            Some(note) => {
                let extended = OpenNote {
                    frames: note.frames + 1,
                    ..note
                };
                (SegmenterState { open: Some(extended) }, None)
            }
        },
    }
}

/// Close whatever is still open when the sweep ends at `end_sample`.
pub fn finish(
    state: SegmenterState,
    end_sample: usize,
    config: &AnalysisConfig,
) -> Option<ClosedNote> {
    state
        .open
        .and_then(|note| close(note, end_sample, config.pitch_close_confidence, config))
}

fn open_at(position: usize, pitch: u8) -> OpenNote {
    OpenNote {
        start_sample: position,
        held_pitch: pitch,
        frames: 1,
    }
}

fn close(
    note: OpenNote,
    end_sample: usize,
    confidence: f32,
    config: &AnalysisConfig,
) -> Option<ClosedNote> {
    (note.frames > config.min_note_frames).then_some(ClosedNote {
        start_sample: note.start_sample,
        end_sample,
        pitch: note.held_pitch,
        confidence,
    })
}

/// Detect notes in `buffer[offset .. offset + duration)` with the default
/// analysis policy.
pub fn segment(
    buffer: &[f32],
    sample_rate: u32,
    offset: f64,
    duration: f64,
) -> Vec<NoteEvent> {
    segment_with(buffer, sample_rate, offset, duration, &AnalysisConfig::default())
}

/// Detect notes with thresholds from `config`.
///
/// Degrades to an empty result for an empty or too-short slice, a zero
/// sample rate, a non-finite or non-positive duration, or an offset past the
/// end of the buffer.
pub fn segment_with(
    buffer: &[f32],
    sample_rate: u32,
    offset: f64,
    duration: f64,
    config: &AnalysisConfig,
) -> Vec<NoteEvent> {
    if sample_rate == 0 || config.hop_size == 0 || !offset.is_finite() || !duration.is_finite()
    {
        return Vec::new();
    }
    if duration <= 0.0 {
        return Vec::new();
    }
    // A window reaching before the buffer only covers its non-negative part.
    let (offset, duration) = if offset < 0.0 {
        (0.0, duration + offset)
    } else {
        (offset, duration)
    };
    if duration <= 0.0 {
        return Vec::new();
    }
    let duration = if duration > config.max_segment_seconds {
        log::debug!(
            "segment: requested {duration:.1}s, analyzing first {:.1}s",
            config.max_segment_seconds
        );
        config.max_segment_seconds
    } else {
        duration
    };

    let rate = sample_rate as f64;
    let first = (offset * rate).floor() as usize;
    if first >= buffer.len() {
        return Vec::new();
    }
    let last = buffer
        .len()
        .min(first.saturating_add((duration * rate).floor() as usize));
    let slice = &buffer[first..last];
    if slice.len() < config.window_size {
        return Vec::new();
    }

    let mut state = SegmenterState::default();
    let mut closed = Vec::new();
    let mut sweep_end = 0;
    let mut windows = 0usize;
    for position in (0..=slice.len() - config.window_size).step_by(config.hop_size) {
        let frame = &slice[position..position + config.window_size];
        let observation = observe(frame, sample_rate, config);
        let (next, note) = advance(state, position, observation, config);
        state = next;
        closed.extend(note);
        sweep_end = (position + config.hop_size).min(slice.len());
        windows += 1;
    }
    closed.extend(finish(state, sweep_end, config));

    let events: Vec<NoteEvent> = closed
        .iter()
        .enumerate()
        .map(|(ordinal, note)| to_event(note, ordinal, offset, rate, config))
        .collect();
    log::debug!(
        "segment: {windows} windows from {offset:.3}s, {} notes",
        events.len()
    );
    events
}

fn to_event(
    note: &ClosedNote,
    ordinal: usize,
    offset: f64,
    rate: f64,
    config: &AnalysisConfig,
) -> NoteEvent {
    let start_time = offset + note.start_sample as f64 / rate;
    let span = note.end_sample.saturating_sub(note.start_sample) as f64 / rate;
    NoteEvent {
        id: format!("det-{}-{}", (start_time * 1000.0).round() as u64, ordinal),
        start_time,
        duration: span.max(config.min_note_duration),
        midi_pitch: note.pitch,
        velocity: config.velocity,
        confidence: note.confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOP: usize = 1024;

    fn run(observations: &[Observation]) -> Vec<ClosedNote> {
        let config = AnalysisConfig::default();
        let mut state = SegmenterState::default();
        let mut out = Vec::new();
        for (i, &obs) in observations.iter().enumerate() {
            let (next, closed) = advance(state, i * HOP, obs, &config);
            state = next;
            out.extend(closed);
        }
        out.extend(finish(state, observations.len() * HOP, &config));
        out
    }

    fn held(pitch: u8, n: usize) -> Vec<Observation> {
        vec![Observation::Pitch(pitch); n]
    }

    #[test]
    fn test_four_frames_is_too_short() {
        assert!(run(&held(60, 4)).is_empty());
        let notes = run(&held(60, 5));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].start_sample, 0);
        assert_eq!(notes[0].end_sample, 5 * 1024);
        assert_eq!(notes[0].confidence, 0.85);
    }

    #[test]
    fn test_silence_closes_with_lower_confidence() {
        let mut obs = held(64, 6);
        obs.push(Observation::Silence);
        obs.extend(held(64, 6));
        let notes = run(&obs);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].confidence, 0.8);
        assert_eq!(notes[0].end_sample, 6 * 1024);
        assert_eq!(notes[1].start_sample, 7 * 1024);
        assert_eq!(notes[1].confidence, 0.85);
    }

    #[test]
    fn test_vibrato_within_one_semitone_extends() {
        let obs: Vec<Observation> = [69, 70, 69, 68, 69, 70, 69]
            .iter()
            .map(|&p| Observation::Pitch(p))
            .collect();
        let notes = run(&obs);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitch, 69);
    }

    #[test]
    fn test_pitch_jump_splits() {
        let mut obs = held(60, 5);
        obs.extend(held(62, 5));
        let notes = run(&obs);
        assert_eq!(notes.len(), 2);
        assert_eq!((notes[0].pitch, notes[1].pitch), (60, 62));
        assert_eq!(notes[0].end_sample, notes[1].start_sample);
        assert_eq!(notes[0].confidence, 0.85);
    }

    #[test]
    fn test_jump_discards_short_note() {
        let mut obs = held(60, 3);
        obs.extend(held(67, 5));
        let notes = run(&obs);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitch, 67);
        assert_eq!(notes[0].start_sample, 3 * 1024);
    }

    #[test]
    fn test_unvoiced_gap_keeps_note_open() {
        let mut obs = held(57, 3);
        obs.push(Observation::Unvoiced);
        obs.extend(held(57, 2));
        let notes = run(&obs);
        // Unvoiced frames do not count, but the note survives them.
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].start_sample, 0);

        let mut obs = held(57, 3);
        obs.push(Observation::Unvoiced);
        obs.push(Observation::Pitch(57));
        assert!(run(&obs).is_empty(), "only four voiced frames accrued");
    }

    #[test]
    fn test_unvoiced_without_open_note_is_noop() {
        let config = AnalysisConfig::default();
        let (state, closed) = advance(SegmenterState::default(), 0, Observation::Unvoiced, &config);
        assert_eq!(state, SegmenterState::default());
        assert!(closed.is_none());
    }

    #[test]
    fn test_segment_rejects_bad_ranges() {
        let buffer = vec![0.3f32; 44_100];
        assert!(segment(&buffer, 44_100, 0.0, 0.0).is_empty());
        assert!(segment(&buffer, 44_100, 0.0, -1.0).is_empty());
        assert!(segment(&buffer, 44_100, 0.0, f64::NAN).is_empty());
        assert!(segment(&buffer, 44_100, 5.0, 1.0).is_empty());
        assert!(segment(&buffer, 0, 0.0, 1.0).is_empty());
        assert!(segment(&[], 44_100, 0.0, 1.0).is_empty());
        assert!(segment(&buffer[..1000], 44_100, 0.0, 1.0).is_empty());
        assert!(segment(&buffer, 44_100, -2.0, 1.5).is_empty());
    }

    #[test]
    fn test_negative_offset_shortens_window() {
        // Tone in the first second, silence after.
        let mut buffer: Vec<f32> = (0..44_100)
            .map(|i| (0.5 * (std::f64::consts::TAU * 440.0 * i as f64 / 44_100.0).sin()) as f32)
            .collect();
        buffer.extend(vec![0.0f32; 44_100]);
        let clipped = segment(&buffer, 44_100, -1.0, 1.5);
        let direct = segment(&buffer, 44_100, 0.0, 0.5);
        assert_eq!(clipped, direct);
        assert_eq!(clipped.len(), 1);
        assert!(clipped[0].end_time() <= 0.5 + 1e-9);
    }

    #[test]
    fn test_huge_segment_cap_does_not_overflow() {
        let config = AnalysisConfig {
            max_segment_seconds: f64::MAX,
            ..AnalysisConfig::default()
        };
        let buffer: Vec<f32> = (0..44_100)
            .map(|i| (0.5 * (std::f64::consts::TAU * 440.0 * i as f64 / 44_100.0).sin()) as f32)
            .collect();
        let notes = segment_with(&buffer, 44_100, 0.5, 1e20, &config);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].midi_pitch, 69);
    }

    #[test]
    fn test_event_fields() {
        let config = AnalysisConfig::default();
        let note = ClosedNote {
            start_sample: 4410,
            end_sample: 6615,
            pitch: 69,
            confidence: 0.8,
        };
        let event = to_event(&note, 3, 2.0, 44_100.0, &config);
        assert_eq!(event.id, "det-2100-3");
        assert!((event.start_time - 2.1).abs() < 1e-9);
        // 2205 samples = 0.05s, floored to the minimum duration.
        assert_eq!(event.duration, 0.1);
        assert_eq!(event.velocity, 0.7);
        assert_eq!(event.confidence, 0.8);
    }
}
