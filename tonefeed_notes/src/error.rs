// Errors from the I/O edges: config files, WAV input, MIDI output.
//
// The producers themselves never fail; they degrade to empty output. Only
// the adapters that touch the filesystem or foreign formats return
// `NotesError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotesError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),
}
