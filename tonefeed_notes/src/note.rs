// The note event: the single output type of both producers.
//
// The analytical path (segment.rs) and the procedural path (compose.rs) both
// emit `Vec<NoteEvent>`, sorted by start time, for the same downstream
// notation/playback consumer. Field names are the JSON interchange names.
//
// Also holds the small pitch helpers both paths share: Hz <-> MIDI conversion
// and note naming for logs and the CLI.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A discrete note on the media time axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Unique within one producer call. Repeated calls may reuse ids; the
    /// caller de-duplicates (see timeline.rs).
    pub id: String,
    /// Onset in seconds from the start of the media, >= 0.
    pub start_time: f64,
    /// Length in seconds, > 0.
    pub duration: f64,
    /// MIDI note number, 0-127.
    pub midi_pitch: u8,
    /// Perceptual loudness, 0.0-1.0.
    pub velocity: f32,
    /// How sure the producer is about this note, 0.0-1.0.
    pub confidence: f32,
}

impl NoteEvent {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Sort events by start time. Stable, so events sharing an onset keep their
/// emission order.
pub fn sort_events(events: &mut [NoteEvent]) {
    events.sort_by(|a, b| {
        a.start_time
            .partial_cmp(&b.start_time)
            .unwrap_or(Ordering::Equal)
    });
}

/// Nearest MIDI note for a frequency: `round(69 + 12 * log2(f / 440))`,
/// clamped to 0-127. Non-positive or non-finite input maps to 0.
pub fn hz_to_midi(freq: f64) -> u8 {
    if !freq.is_finite() || freq <= 0.0 {
        return 0;
    }
    let midi = (69.0 + 12.0 * (freq / 440.0).log2()).round();
    midi.clamp(0.0, 127.0) as u8
}

/// Equal-tempered frequency of a MIDI note (A4 = 69 = 440 Hz).
pub fn midi_to_hz(pitch: u8) -> f64 {
    440.0 * 2f64.powf((pitch as f64 - 69.0) / 12.0)
}

/// Scientific pitch name, middle C (60) = "C4".
pub fn pitch_name(pitch: u8) -> String {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
    ];
    let octave = pitch as i32 / 12 - 1;
    format!("{}{}", NAMES[(pitch % 12) as usize], octave)
}
