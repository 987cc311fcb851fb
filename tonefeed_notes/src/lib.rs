// Tonefeed note producers
//
// Turns a media time axis into discrete note events for a notation/playback
// UI, from one of two sources:
// - recorded audio, transcribed as a single monophonic line by
//   autocorrelation pitch tracking and a frame-to-note state machine;
// - an opaque identifier (e.g. a video id with no accessible waveform), from
//   which a three-layer part is composed deterministically.
// Both produce the same `NoteEvent` list, sorted by onset.
//
// Architecture:
// - note.rs: NoteEvent, the shared output type, plus Hz/MIDI helpers
// - config.rs: Analysis thresholds as named constants and a JSON-loadable config
// - pitch.rs: Fundamental-frequency estimation for one frame (autocorrelation)
// - segment.rs: Windowed sweep + open-note state machine -> NoteEvents
// - scale.rs: Major/minor scales, degree-to-pitch mapping, chord progressions
// - compose.rs: Seeded bass/harmony/melody generator, bar-deterministic
// - timeline.rs: Caller-side merge/de-duplication of repeated producer output
// - midi.rs: Standard MIDI File export of a NoteEvent list
// - wav.rs: WAV decoding to a mono f32 buffer (CLI input)
// - error.rs: Error type for the I/O adapters
//
// The producers are pure functions of their arguments: no global state, no
// I/O, no failure mode beyond an empty result. The seed cursor lives in the
// `tonefeed_prng` crate.

pub mod compose;
pub mod config;
pub mod error;
pub mod midi;
pub mod note;
pub mod pitch;
pub mod scale;
pub mod segment;
pub mod timeline;
pub mod wav;

pub use note::NoteEvent;

/// Transcribe `buffer[start_offset .. start_offset + duration)` (mono samples
/// at `sample_rate`) into notes.
pub fn detect_notes(
    buffer: &[f32],
    sample_rate: u32,
    start_offset: f64,
    duration: f64,
) -> Vec<NoteEvent> {
    segment::segment(buffer, sample_rate, start_offset, duration)
}

/// Compose the notes starting in `[start, end)` for the identifier `seed`.
pub fn compose_notes(seed: &str, start: f64, end: f64) -> Vec<NoteEvent> {
    compose::compose(seed, start, end)
}
