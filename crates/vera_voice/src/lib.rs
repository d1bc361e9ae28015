//! Voice module for Vera
//!
//! The audio side of the avatar, seen only at its boundary: start a clip,
//! poll its loudness, and report start/end to the controller as events.
//! Decoding and the actual output device belong to the host.

mod player;
mod speaker;
mod spectrum;

pub use player::{AudioPlayer, ClipInfo, SyntheticPlayer};
pub use speaker::{SpeakOutcome, Speaker};
pub use spectrum::{mean_bin_amplitude, SyllableEnvelope};
