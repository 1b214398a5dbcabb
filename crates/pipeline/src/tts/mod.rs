//! Text-to-Speech adapters
//!
//! - [`ElevenLabsTts`]: hosted voices, MP3 output
//! - [`SidecarTts`]: Edge TTS or a local engine behind `POST /synthesize`
//! - [`GttsTts`]: Google Translate's TTS endpoint, chunked per request

mod elevenlabs;
mod gtts;
mod sidecar;

pub use elevenlabs::{ElevenLabsConfig, ElevenLabsTts};
pub use gtts::{chunk_text, GttsConfig, GttsTts, GTTS_MAX_CHARS};
pub use sidecar::{rate_percent, SidecarConfig, SidecarTts};

use crate::PipelineError;

/// Reject input that would produce an empty clip
pub(crate) fn require_text(text: &str) -> Result<&str, PipelineError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PipelineError::InvalidInput(
            "nothing to synthesize".to_string(),
        ));
    }
    Ok(text)
}
