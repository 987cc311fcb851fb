// MIDI export of a note event list.
//
// Writes a Standard MIDI File (format 0, one track) so detected or composed
// parts can be auditioned in any MIDI player. Event times are seconds; they
// are converted to ticks at a fixed tempo, which only needs to match the
// tempo meta event written at the head of the track. Overlapping notes of the
// same pitch are written as-is.
//
// Uses the `midly` crate for encoding.

use crate::error::NotesError;
use crate::note::NoteEvent;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Largest value a 28-bit delta can hold.
const MAX_TICK: u32 = 0x0FFF_FFFF;

/// Convert `events` to MIDI at `tempo_bpm` and write to a file.
pub fn write_midi(events: &[NoteEvent], tempo_bpm: u32, path: &Path) -> Result<(), NotesError> {
    let smf = events_to_smf(events, tempo_bpm);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

fn seconds_to_ticks(seconds: f64, tempo_bpm: u32) -> u32 {
    let ticks = seconds * tempo_bpm as f64 / 60.0 * TICKS_PER_QUARTER as f64;
    ticks.round().clamp(0.0, MAX_TICK as f64) as u32
}

/// Convert note events to an in-memory SMF.
pub(crate) fn events_to_smf(events: &[NoteEvent], tempo_bpm: u32) -> Smf<'static> {
    let tempo_bpm = tempo_bpm.max(1);
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // (tick, is_on, pitch, velocity); offs sort before ons at the same tick.
    let mut timed: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(events.len() * 2);
    for e in events {
        let on = seconds_to_ticks(e.start_time, tempo_bpm);
        let off = seconds_to_ticks(e.end_time(), tempo_bpm).max(on.saturating_add(1));
        let pitch = e.midi_pitch.min(127);
        let vel = (e.velocity.clamp(0.0, 1.0) * 127.0).round().max(1.0) as u8;
        timed.push((on, true, pitch, vel));
        timed.push((off, false, pitch, 0));
    }
    timed.sort_by_key(|&(tick, is_on, pitch, _)| (tick, is_on, pitch));

    let channel = u4::new(0);
    let mut track: Track<'static> = Vec::new();
    let tempo_microseconds = 60_000_000 / tempo_bpm;
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds.min(0xFF_FFFF)))),
    });

    let mut last_tick = 0;
    for (tick, is_on, pitch, vel) in timed {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(pitch),
                vel: u7::new(vel),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(pitch),
                vel: u7::new(0),
            }
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);
    smf
}
