//! # MathShorts Voice
//!
//! Turns one problem into per-language narration: a localized script,
//! an SSML document, and synthesized audio from the TTS provider.
//! Everything here is fails-soft per language — a bad language run is a
//! `NarrationResult` with `succeeded = false`, never an error.

pub mod script;
pub mod ssml;
pub mod tts;

pub use script::{VoiceScript, build_script};
pub use tts::{TtsNarrationSource, voice_for};
