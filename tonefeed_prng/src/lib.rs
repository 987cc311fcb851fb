// Reproducible seed cursor for the procedural note generator.
//
// Implements the 32-bit Mulberry32 mixer over a plain integer cursor. Unlike
// a conventional PRNG, the state is not re-derived from the output: each draw
// mixes the current cursor into a value, and the cursor then advances by
// exactly one. Hosts that replay the same cursor sequence (for instance a web
// player computing the same part from the same video id) get bit-identical
// values.
//
// The cursor is a `Copy` value. `SeedState::next` is the pure primitive that
// returns the value together with the advanced cursor; the `&mut self`
// helpers (`draw`, `chance`, `range_u32`, `pick`) are thin wrappers so call
// sites can thread one local cursor without global or hidden state.
//
// `derive` forks an independent cursor from a key. The composition generator
// uses it to give every bar its own stream, so a bar's content depends only on
// the seed and the bar index.
//
// **Critical constraint: determinism.** Every operation here is integer
// arithmetic with explicit wrapping. The only float step is the final
// division by 2^32, which is exact in `f64`.

use serde::{Deserialize, Serialize};

/// Multiplier used by `derive` to spread small keys across the cursor space
/// (2^32 divided by the golden ratio).
const DERIVE_MULTIPLIER: u32 = 0x9E37_79B9;

/// A 32-bit seed cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeedState(pub u32);

impl SeedState {
    pub fn new(state: u32) -> Self {
        SeedState(state)
    }

    /// Seed from an opaque text identifier: the wrapping sum of its UTF-16
    /// code units. The empty string seeds cursor 0.
    pub fn from_text(text: &str) -> Self {
        SeedState(
            text.encode_utf16()
                .fold(0u32, |acc, unit| acc.wrapping_add(unit as u32)),
        )
    }

    /// Mix the cursor into a value in [0, 1) and return it with the cursor
    /// advanced by one.
    pub fn next(self) -> (f64, SeedState) {
        let value = mix(self.0) as f64 / 4_294_967_296.0;
        (value, SeedState(self.0.wrapping_add(1)))
    }

    /// Draw a value in [0, 1), advancing this cursor in place.
    pub fn draw(&mut self) -> f64 {
        let (value, next) = self.next();
        *self = next;
        value
    }

    /// Return `true` with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.draw() < p
    }

    /// Uniform integer in `[low, high)`, computed as `low + floor(draw * span)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_u32(&mut self, low: u32, high: u32) -> u32 {
        assert!(low < high, "range_u32: low must be less than high");
        let span = (high - low) as f64;
        // draw < 1.0, so the product is strictly below span.
        low + (self.draw() * span) as u32
    }

    /// Pick one element of a non-empty slice.
    ///
    /// Panics if `items` is empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "pick: empty slice");
        let index = self.range_u32(0, items.len() as u32) as usize;
        &items[index]
    }

    /// Fork an independent cursor keyed by `key`. Does not advance `self`.
    ///
    /// Two different keys on the same cursor, or the same key on two
    /// different cursors, land on unrelated streams. Keys below 2^32 fork
    /// with a single mix; the high half of larger keys is folded in by a
    /// second one.
    pub fn derive(self, key: u64) -> SeedState {
        let low = key as u32;
        let high = (key >> 32) as u32;
        let forked = mix(self.0 ^ low.wrapping_mul(DERIVE_MULTIPLIER));
        if high == 0 {
            SeedState(forked)
        } else {
            SeedState(mix(forked ^ high.wrapping_mul(DERIVE_MULTIPLIER)))
        }
    }
}

/// Mulberry32 output function.
fn mix(state: u32) -> u32 {
    let mut t = state.wrapping_add(0x6D2B_79F5);
    t = (t ^ (t >> 15)).wrapping_mul(t | 1);
    t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
    t ^ (t >> 14)
}
