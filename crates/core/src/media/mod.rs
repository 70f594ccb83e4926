pub mod extract;
pub mod model;
pub mod transcribe;

pub use extract::{AudioExtractor, FfmpegExtractor};
pub use model::ensure_model;
pub use transcribe::{SpeechToText, WhisperTranscriber, silence_native_logs};
