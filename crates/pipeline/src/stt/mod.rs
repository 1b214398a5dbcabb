//! Speech-to-Text adapters
//!
//! All adapters take a complete recording and return a [`Transcript`]
//! with word timings whenever the provider reports them.
//!
//! [`Transcript`]: coach_core::Transcript

mod deepgram;
mod google;
mod whisper;

pub use deepgram::{DeepgramConfig, DeepgramStt};
pub use google::{GoogleCloudConfig, GoogleCloudStt};
pub use whisper::{WhisperConfig, WhisperSidecarStt};
