// Seeded procedural composition: a stand-in part for media with no samples.
//
// Given an opaque identifier (typically a video id) and a time window, fabricate
// a plausible three-layer part (bass, harmony, melody) that is the same every
// time it is asked for. The pipeline:
//
// 1. `GeneratorContext::from_seed` derives the song-level parameters from the
//    seed cursor in a fixed draw order: tempo (80-129 BPM), swing (40%),
//    major/minor, root (MIDI 58-69), and one of four progressions.
// 2. Each bar draws from its own cursor, `seed.derive(bar)`, so a bar's
//    content is a function of (seed, bar index) only.
// 3. The melody's voice-leading state (the last sounded degree) carries from
//    bar to bar within a four-bar phrase and resets on the tonic at each
//    phrase start. Rendering always begins at the phrase start, so any window
//    reproduces exactly the notes a longer window would have at the same bars.
// 4. Notes are filtered to [start, end) and sorted by onset.
//
// Layers per bar (beats counted from 0, four beats to the bar):
// - bass: chord root two octaves down on beat 0; 60% of bars add the fifth or
//   the octave on beat 2.
// - harmony: when the bar's intensity draw exceeds 0.3, a root-position triad
//   one octave down on beat 1, rolled 30 ms per voice.
// - melody: a stepwise random walk in eighth, quarter and half slots, pulled
//   toward chord tones on strong beats and cadencing on the fifth (even bars,
//   "question") or the root (odd bars, "answer"); kept within C4-C6.
//
// Scale and progression tables live in scale.rs; the cursor in tonefeed_prng.

use crate::note::{NoteEvent, sort_events};
use crate::scale::{Key, PROGRESSIONS, Progression, SCALE_LEN, Scale, nearest_degree};
use tonefeed_prng::SeedState;

pub const BEATS_PER_BAR: f64 = 4.0;
/// Bars per phrase: one pass through the progression.
pub const PHRASE_BARS: u64 = 4;
/// Longest window rendered in one call.
pub const MAX_COMPOSE_BARS: u64 = 4096;

/// Melody pitch range, inclusive.
const MELODY_LOW: u8 = 60;
const MELODY_HIGH: u8 = 84;

/// Fraction of a melody slot that sounds; the rest is an articulation gap.
const ARTICULATION: f64 = 0.9;
/// Off-beat eighths land on the last third of the beat when swung.
const SWING_DELAY_BEATS: f64 = 1.0 / 6.0;
/// Delay between successive voices of a harmony chord, in seconds.
const HARMONY_ROLL_SECONDS: f64 = 0.03;

/// Song-level parameters, derived once from the seed.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorContext {
    /// Cursor seeded from the identifier; every bar forks from it.
    pub seed: SeedState,
    pub bpm: u32,
    pub swing: bool,
    pub key: Key,
    pub progression: Progression,
}

impl GeneratorContext {
    pub fn from_seed(seed: &str) -> Self {
        let base = SeedState::from_text(seed);
        let mut rng = base;
        let bpm = rng.range_u32(80, 130);
        let swing = rng.draw() > 0.6;
        let scale = if rng.draw() > 0.5 {
            Scale::Minor
        } else {
            Scale::Major
        };
        let root = rng.range_u32(58, 70) as u8;
        let progression = *rng.pick(&PROGRESSIONS);
        GeneratorContext {
            seed: base,
            bpm,
            swing,
            key: Key::new(scale, root),
            progression,
        }
    }

    pub fn beat_duration(&self) -> f64 {
        60.0 / self.bpm as f64
    }

    pub fn bar_duration(&self) -> f64 {
        self.beat_duration() * BEATS_PER_BAR
    }

    /// Root degree of the chord under `bar`.
    pub fn chord_degree(&self, bar: u64) -> i32 {
        self.progression[(bar % PHRASE_BARS) as usize]
    }
}

/// Compose the notes starting in `[start, end)` for `seed`.
pub fn compose(seed: &str, start: f64, end: f64) -> Vec<NoteEvent> {
    compose_with(&GeneratorContext::from_seed(seed), start, end)
}

/// Compose the notes starting in `[start, end)` from an existing context.
///
/// Returns an empty result for non-finite bounds or `end <= start`.
pub fn compose_with(ctx: &GeneratorContext, start: f64, end: f64) -> Vec<NoteEvent> {
    if !start.is_finite() || !end.is_finite() {
        return Vec::new();
    }
    let start = start.max(0.0);
    if end <= start {
        return Vec::new();
    }

    let bar_duration = ctx.bar_duration();
    let first_bar = (start / bar_duration).floor() as u64;
    let mut end_bar = ((end / bar_duration).ceil() as u64).max(first_bar.saturating_add(1));
    if end_bar - first_bar > MAX_COMPOSE_BARS {
        log::warn!(
            "compose: window of {} bars truncated to {MAX_COMPOSE_BARS}",
            end_bar - first_bar
        );
        end_bar = first_bar.saturating_add(MAX_COMPOSE_BARS);
    }

    let mut notes = Vec::new();
    let phrase_start = first_bar - first_bar % PHRASE_BARS;
    for phrase in (phrase_start..end_bar).step_by(PHRASE_BARS as usize) {
        let mut last_degree = ctx.chord_degree(phrase);
        for bar in phrase..phrase.saturating_add(PHRASE_BARS).min(end_bar) {
            render_bar(ctx, bar, &mut last_degree, &mut notes);
        }
    }

    notes.retain(|n| n.start_time >= start && n.start_time < end);
    sort_events(&mut notes);
    log::debug!(
        "compose: bars {first_bar}..{end_bar} at {} BPM, {} notes",
        ctx.bpm,
        notes.len()
    );
    notes
}

/// Render all three layers of one bar. `last_degree` is the melody's
/// voice-leading state, read and updated.
fn render_bar(ctx: &GeneratorContext, bar: u64, last_degree: &mut i32, out: &mut Vec<NoteEvent>) {
    let mut rng = ctx.seed.derive(bar);
    let beat = ctx.beat_duration();
    let bar_start = bar as f64 * ctx.bar_duration();
    let chord = ctx.chord_degree(bar);
    let key = ctx.key;

    // Bass
    out.push(NoteEvent {
        id: format!("b{bar}-bass-0"),
        start_time: bar_start,
        duration: 1.2 * beat,
        midi_pitch: key.pitch(chord, -2),
        velocity: 0.85,
        confidence: 0.98,
    });
    if rng.chance(0.6) {
        let degree = if rng.chance(0.5) { chord + 4 } else { chord + SCALE_LEN };
        out.push(NoteEvent {
            id: format!("b{bar}-bass-1"),
            start_time: bar_start + 2.0 * beat,
            duration: 1.2 * beat,
            midi_pitch: key.pitch(degree, -2),
            velocity: 0.75,
            confidence: 0.90,
        });
    }

    // Harmony
    let intensity = rng.draw();
    if intensity > 0.3 {
        for (i, third) in [0, 2, 4].into_iter().enumerate() {
            out.push(NoteEvent {
                id: format!("b{bar}-harm-{i}"),
                start_time: bar_start + beat + HARMONY_ROLL_SECONDS * i as f64,
                duration: 2.0 * beat,
                midi_pitch: key.pitch(chord + third, -1),
                velocity: (0.4 + 0.2 * intensity) as f32,
                confidence: 0.85,
            });
        }
    }

    // Melody
    let mut pos: f64 = 0.0;
    let mut index = 0;
    while pos < BEATS_PER_BAR {
        let roll = rng.draw();
        let step: f64 = if roll < 0.3 {
            0.5
        } else if roll < 0.6 {
            2.0
        } else {
            1.0
        };
        let sounds = pos == 0.0 || rng.chance(0.7);
        if sounds {
            let strong = pos % 2.0 == 0.0;
            let mut degree = *last_degree + if rng.chance(0.5) { 1 } else { -1 };

            if strong {
                let tone = chord + if rng.chance(0.5) { 0 } else { 2 };
                let target = nearest_degree(degree, tone);
                degree += (target - degree).signum();
            }
            if pos >= BEATS_PER_BAR - 1.0 && step >= 1.0 {
                let cadence = if bar % 2 == 0 { chord + 4 } else { chord };
                degree = nearest_degree(degree, cadence);
            }
            degree = clamp_melody(&key, degree);

            let mut onset = pos;
            let mut slot = step.min(BEATS_PER_BAR - pos);
            if ctx.swing && pos.fract() == 0.5 {
                onset += SWING_DELAY_BEATS;
                slot -= SWING_DELAY_BEATS;
            }
            out.push(NoteEvent {
                id: format!("b{bar}-mel-{index}"),
                start_time: bar_start + onset * beat,
                duration: slot * beat * ARTICULATION,
                midi_pitch: key.pitch(degree, 0),
                velocity: if strong { 0.9 } else { 0.7 },
                confidence: 0.95,
            });
            index += 1;
            *last_degree = degree;
        }
        pos += step;
    }
}

/// Shift `degree` by whole octaves until its pitch sits in the melody range.
fn clamp_melody(key: &Key, mut degree: i32) -> i32 {
    while key.pitch(degree, 0) < MELODY_LOW {
        degree += SCALE_LEN;
    }
    while key.pitch(degree, 0) > MELODY_HIGH {
        degree -= SCALE_LEN;
    }
    degree
}
