// Scale and progression tables for the procedural generator.
//
// The generator works in scale degrees, not semitones: degree 0 is the
// tonic, degree 7 the tonic an octave up, negative degrees go below. A `Key`
// (scale + root MIDI pitch) turns a degree plus an octave offset into a MIDI
// pitch. Chords are built by stacking degrees in thirds from a chord root
// (root, +2, +4), so they stay diatonic in either scale.
//
// The four progressions all open on I so every phrase starts at home; bar
// `b` plays chord `progression[b % 4]`.
//
// Used by compose.rs.

use serde::{Deserialize, Serialize};

/// Number of degrees per octave in both supported scales.
pub const SCALE_LEN: i32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    /// Ionian: W W H W W W H.
    Major,
    /// Aeolian (natural minor): W H W W H W W.
    Minor,
}

impl Scale {
    /// Semitone offsets from the root for degrees 0-6.
    pub fn intervals(self) -> [u8; 7] {
        match self {
            Scale::Major => [0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => [0, 2, 3, 5, 7, 8, 10],
        }
    }
}

/// Chord roots as scale degrees (I = 0, IV = 3, V = 4, vi = 5).
pub type Progression = [i32; 4];

/// I-V-vi-IV, I-IV-V-IV, I-vi-IV-V, I-IV-vi-V.
pub const PROGRESSIONS: [Progression; 4] = [[0, 4, 5, 3], [0, 3, 4, 3], [0, 5, 3, 4], [0, 3, 5, 4]];

/// A scale anchored on a root MIDI pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub scale: Scale,
    pub root: u8,
}

impl Key {
    pub fn new(scale: Scale, root: u8) -> Self {
        Key { scale, root }
    }

    /// MIDI pitch of `degree` shifted by `octave` octaves:
    /// `root + octave*12 + floor(degree/7)*12 + intervals[degree mod 7]`,
    /// clamped to 0-127.
    pub fn pitch(&self, degree: i32, octave: i32) -> u8 {
        let octave_of_degree = degree.div_euclid(SCALE_LEN);
        let step = degree.rem_euclid(SCALE_LEN) as usize;
        let midi = self.root as i32
            + octave * 12
            + octave_of_degree * 12
            + self.scale.intervals()[step] as i32;
        midi.clamp(0, 127) as u8
    }
}

/// The degree congruent to `target` (mod 7) closest to `from`. Ties go
/// downward.
pub fn nearest_degree(from: i32, target: i32) -> i32 {
    let class = target.rem_euclid(SCALE_LEN);
    let below = from - (from - class).rem_euclid(SCALE_LEN);
    let above = below + SCALE_LEN;
    if from - below <= above - from {
        below
    } else {
        above
    }
}
