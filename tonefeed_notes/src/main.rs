// Tonefeed CLI entry point.
//
// Runs either producer from the shell and prints the resulting note events as
// JSON on stdout. Optionally writes the same notes to a MIDI file.
//
// Usage:
//   cargo run -p tonefeed_notes -- detect <input.wav> [--offset S] [--duration S]
//     [--config analysis.json] [--midi out.mid]
//   cargo run -p tonefeed_notes -- compose <seed> [--start S] [--end S] [--midi out.mid]
//
// Set RUST_LOG=debug for sweep/composition diagnostics on stderr.

use std::path::Path;
use tonefeed_notes::compose::{GeneratorContext, compose_with};
use tonefeed_notes::config::AnalysisConfig;
use tonefeed_notes::error::NotesError;
use tonefeed_notes::midi::write_midi;
use tonefeed_notes::note::{NoteEvent, pitch_name};
use tonefeed_notes::segment::segment_with;
use tonefeed_notes::wav::read_wav;

/// Tempo used for MIDI export of transcribed audio, which has no tempo of its own.
const DETECT_MIDI_TEMPO: u32 = 120;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let result = match (args.get(1).map(String::as_str), args.get(2)) {
        (Some("detect"), Some(input)) => run_detect(Path::new(input), &args),
        (Some("compose"), Some(seed)) => run_compose(seed, &args),
        _ => {
            eprintln!("usage: tonefeed detect <input.wav> [--offset S] [--duration S] [--config FILE] [--midi FILE]");
            eprintln!("       tonefeed compose <seed> [--start S] [--end S] [--midi FILE]");
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run_detect(input: &Path, args: &[String]) -> Result<(), NotesError> {
    let config = match parse_flag::<String>(args, "--config") {
        Some(path) => AnalysisConfig::load(Path::new(&path))?,
        None => AnalysisConfig::default(),
    };
    let audio = read_wav(input)?;
    let offset = parse_flag(args, "--offset").unwrap_or(0.0);
    let duration = parse_flag(args, "--duration").unwrap_or(audio.duration() - offset);

    let events = segment_with(&audio.samples, audio.sample_rate, offset, duration, &config);
    log::info!(
        "detected {} notes in {:.2}s of {}",
        events.len(),
        duration.max(0.0),
        input.display()
    );
    emit(&events, args, DETECT_MIDI_TEMPO)
}

fn run_compose(seed: &str, args: &[String]) -> Result<(), NotesError> {
    let ctx = GeneratorContext::from_seed(seed);
    let start = parse_flag(args, "--start").unwrap_or(0.0);
    let end = parse_flag(args, "--end").unwrap_or(start + 8.0 * ctx.bar_duration());

    log::info!(
        "seed {:?}: {} BPM, {:?} on {}, progression {:?}, swing {}",
        seed,
        ctx.bpm,
        ctx.key.scale,
        pitch_name(ctx.key.root),
        ctx.progression,
        ctx.swing
    );
    let events = compose_with(&ctx, start, end);
    emit(&events, args, ctx.bpm)
}

fn emit(events: &[NoteEvent], args: &[String], tempo_bpm: u32) -> Result<(), NotesError> {
    if let Some(path) = parse_flag::<String>(args, "--midi") {
        write_midi(events, tempo_bpm, Path::new(&path))?;
        log::info!("wrote {} notes to {}", events.len(), path);
    }
    println!("{}", serde_json::to_string_pretty(events)?);
    Ok(())
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
